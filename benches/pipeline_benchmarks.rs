//! Benchmarks for the per-frame measurement pipeline

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pupillary_distance::{
    calibration::{AdjustmentFactors, CalibrationResolver, FusionPolicy, ReferenceFrame},
    config::Config,
    constants::NUM_FACIAL_LANDMARKS,
    geometry::Point,
    landmarks::{indices, LandmarkSet},
    measurement::MeasurementSample,
    session::MeasurementSession,
};

/// Frontal face in normalized coordinates with slight per-frame jitter
fn face(jitter: f64) -> LandmarkSet {
    let mut points = vec![Point::new(0.5, 0.5); NUM_FACIAL_LANDMARKS];
    let mut set = |index: usize, x: f64, y: f64| points[index] = Point::new(x / 640.0, y / 480.0);

    set(indices::LEFT_PUPIL, 285.0 + jitter, 200.0);
    set(indices::RIGHT_PUPIL, 355.0 - jitter, 200.0);
    set(indices::LEFT_IRIS_OUTER, 279.0, 200.0);
    set(indices::LEFT_IRIS_INNER, 291.0, 200.0);
    set(indices::RIGHT_IRIS_INNER, 349.0, 200.0);
    set(indices::RIGHT_IRIS_OUTER, 361.0, 200.0);
    set(indices::LEFT_CHEEK, 210.0, 230.0);
    set(indices::RIGHT_CHEEK, 430.0, 230.0);
    set(indices::LEFT_EYE_INNER, 305.0, 203.0);
    set(indices::RIGHT_EYE_INNER, 335.0, 203.0);
    set(indices::NOSE_BRIDGE, 320.0, 203.0);
    set(indices::NOSE_TIP, 320.0, 270.0);

    LandmarkSet::new(points).unwrap()
}

fn benchmark_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration");
    let geometry = face(0.0).to_geometry(640.0, 480.0);
    let reference = ReferenceFrame::new(140.0, Some(16.0), Some(42.0)).unwrap();
    let adjustment = AdjustmentFactors::IDENTITY;

    for (name, policy) in [
        ("equal_weight", FusionPolicy::EqualWeight),
        ("iris_weighted", FusionPolicy::iris_weighted()),
    ] {
        let resolver = CalibrationResolver::new(policy);
        group.bench_function(format!("iris_only/{name}"), |b| {
            b.iter(|| black_box(resolver.resolve(black_box(&geometry), None, &adjustment)));
        });
        group.bench_function(format!("full_reference/{name}"), |b| {
            b.iter(|| black_box(resolver.resolve(black_box(&geometry), Some(&reference), &adjustment)));
        });
    }

    group.finish();
}

fn benchmark_frame(c: &mut Criterion) {
    let landmarks = face(0.0);

    c.bench_function("extract_geometry", |b| {
        b.iter(|| black_box(black_box(&landmarks).to_geometry(640.0, 480.0)));
    });

    let geometry = landmarks.to_geometry(640.0, 480.0);
    let calibration = CalibrationResolver::default()
        .resolve(&geometry, None, &AdjustmentFactors::IDENTITY)
        .unwrap();
    c.bench_function("measure_sample", |b| {
        b.iter(|| black_box(MeasurementSample::from_face(black_box(&geometry), &calibration)));
    });
}

fn benchmark_session(c: &mut Criterion) {
    let frames: Vec<Vec<LandmarkSet>> = (0..30).map(|i| vec![face(f64::from(i % 5) * 0.2)]).collect();
    let mut session = MeasurementSession::new(&Config::default()).unwrap();
    session.select_reference_frame(Some(ReferenceFrame::manual(140.0).unwrap()));

    c.bench_function("session_30_frames", |b| {
        b.iter(|| {
            session.resume();
            for faces in &frames {
                black_box(session.process_frame(black_box(faces), 640.0, 480.0));
            }
        });
    });
}

criterion_group!(benches, benchmark_calibration, benchmark_frame, benchmark_session);
criterion_main!(benches);
