//! Property tests for the iris-only calibration scale

mod test_helpers;

use proptest::prelude::*;
use pupillary_distance::{
    calibration::{AdjustmentFactors, CalibrationResolver, ScaleSource},
    constants::IRIS_DIAMETER_MM,
    measurement::MeasurementSample,
};
use test_helpers::{FaceBuilder, FRAME_PX};

proptest! {
    #[test]
    fn prop_iris_only_scale_is_iris_ratio(
        iris_px in 5.0f64..60.0,
        gap_px in 80.0f64..200.0,
        shift_px in -100.0f64..100.0,
        tilt_px in -10.0f64..10.0,
    ) {
        let face = FaceBuilder::default()
            .iris(iris_px)
            .pupil_gap(gap_px)
            .shift(shift_px)
            .tilt(tilt_px)
            .build()
            .unwrap()
            .to_geometry(FRAME_PX, FRAME_PX);

        let calibration = CalibrationResolver::default()
            .resolve(&face, None, &AdjustmentFactors::IDENTITY)
            .unwrap();

        let expected = IRIS_DIAMETER_MM / face.average_iris_diameter();
        prop_assert_eq!(calibration.mm_per_pixel, expected);
        prop_assert_eq!(calibration.contributions.len(), 1);
        prop_assert_eq!(calibration.contribution(ScaleSource::Iris), Some(expected));
        prop_assert!(calibration.alignment_box.is_none());
        prop_assert!((calibration.mm_per_pixel - IRIS_DIAMETER_MM / iris_px).abs() < 1e-6);

        let sample = MeasurementSample::from_face(&face, &calibration);
        prop_assert!((sample.total_pd - face.pupil_distance() * expected).abs() < 1e-9);
    }
}
