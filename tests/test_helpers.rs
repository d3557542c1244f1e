//! Helper functions and utilities for tests

#![allow(dead_code)]

use pupillary_distance::{
    constants::{IRIS_DIAMETER_MM, NUM_FACIAL_LANDMARKS},
    geometry::Point,
    landmarks::{indices, LandmarkSet},
    replay::{RecordedFrame, RecordingWriter},
    Result,
};
use std::path::Path;

/// Side of the square test frame in pixels
pub const FRAME_PX: f64 = 1000.0;

/// Builder for a synthetic frontal face in a [`FRAME_PX`] square frame.
///
/// Pupils sit on y = 400 around x = 500; the nose tip is 120px below them.
#[derive(Debug, Clone)]
pub struct FaceBuilder {
    pupil_gap_px: f64,
    iris_px: f64,
    face_px: f64,
    tilt_px: f64,
    shift_px: f64,
}

impl Default for FaceBuilder {
    fn default() -> Self {
        Self {
            pupil_gap_px: 120.0,
            iris_px: 20.0,
            face_px: 500.0,
            tilt_px: 0.0,
            shift_px: 0.0,
        }
    }
}

impl FaceBuilder {
    pub fn pupil_gap(mut self, px: f64) -> Self {
        self.pupil_gap_px = px;
        self
    }

    pub fn iris(mut self, px: f64) -> Self {
        self.iris_px = px;
        self
    }

    pub fn face_width(mut self, px: f64) -> Self {
        self.face_px = px;
        self
    }

    /// Lower the image-right pupil by `px`
    pub fn tilt(mut self, px: f64) -> Self {
        self.tilt_px = px;
        self
    }

    /// Move the pupils sideways relative to the nose bridge
    pub fn shift(mut self, px: f64) -> Self {
        self.shift_px = px;
        self
    }

    pub fn build(&self) -> Result<LandmarkSet> {
        let mut points = vec![Point::new(0.5, 0.5); NUM_FACIAL_LANDMARKS];
        let mut set = |index: usize, x: f64, y: f64| points[index] = Point::new(x / FRAME_PX, y / FRAME_PX);

        let lx = 500.0 + self.shift_px - self.pupil_gap_px / 2.0;
        let rx = 500.0 + self.shift_px + self.pupil_gap_px / 2.0;
        let ry = 400.0 + self.tilt_px;
        let half_iris = self.iris_px / 2.0;

        set(indices::LEFT_PUPIL, lx, 400.0);
        set(indices::RIGHT_PUPIL, rx, ry);
        set(indices::LEFT_IRIS_OUTER, lx - half_iris, 400.0);
        set(indices::LEFT_IRIS_INNER, lx + half_iris, 400.0);
        set(indices::RIGHT_IRIS_INNER, rx - half_iris, ry);
        set(indices::RIGHT_IRIS_OUTER, rx + half_iris, ry);
        set(indices::LEFT_CHEEK, 500.0 - self.face_px / 2.0, 450.0);
        set(indices::RIGHT_CHEEK, 500.0 + self.face_px / 2.0, 450.0);
        set(indices::LEFT_EYE_INNER, 470.0, 405.0);
        set(indices::RIGHT_EYE_INNER, 530.0, 405.0);
        set(indices::NOSE_BRIDGE, 500.0, 405.0);
        set(indices::NOSE_TIP, 500.0, 520.0);

        LandmarkSet::new(points)
    }
}

/// Face whose iris-only PD is `pd_mm` with a 20px iris
pub fn face_with_pd(pd_mm: f64) -> LandmarkSet {
    FaceBuilder::default()
        .pupil_gap(pd_mm / (IRIS_DIAMETER_MM / 20.0))
        .build()
        .unwrap()
}

/// Write a recording where each entry is one frame, `None` meaning no face
pub fn write_recording(path: &Path, frames: &[Option<LandmarkSet>]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = RecordingWriter::new(std::io::BufWriter::new(file));
    for frame in frames {
        let faces: Vec<LandmarkSet> = frame.iter().cloned().collect();
        writer.write_frame(&RecordedFrame::from_faces(&faces, FRAME_PX, FRAME_PX))?;
    }
    writer.finish()?;
    Ok(())
}
