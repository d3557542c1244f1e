//! Facial landmark input and the detector index contract.
//!
//! The external detector hands over one fixed-size ordered sequence of
//! normalized `(x, y)` keypoints per face. Only a handful of those indices are
//! read here; [`FaceGeometry`] pulls them out once per frame and converts them
//! to pixel coordinates so the rest of the pipeline never touches raw indices.

use crate::{
    constants::NUM_FACIAL_LANDMARKS,
    geometry::{distance, midpoint, to_pixels, Point},
    Error, Result,
};

/// Refined face mesh landmark indices. Left/right refer to the image side.
pub mod indices {
    /// Pupil center of the image-left eye
    pub const LEFT_PUPIL: usize = 468;
    /// Pupil center of the image-right eye
    pub const RIGHT_PUPIL: usize = 473;

    /// Horizontal iris boundary of the image-left eye
    pub const LEFT_IRIS_OUTER: usize = 469;
    pub const LEFT_IRIS_INNER: usize = 471;
    /// Horizontal iris boundary of the image-right eye
    pub const RIGHT_IRIS_INNER: usize = 474;
    pub const RIGHT_IRIS_OUTER: usize = 476;

    /// Cheek/temple points spanning the face width
    pub const LEFT_CHEEK: usize = 234;
    pub const RIGHT_CHEEK: usize = 454;

    /// Inner eye corners
    pub const LEFT_EYE_INNER: usize = 133;
    pub const RIGHT_EYE_INNER: usize = 362;

    /// Nose bridge between the eyes
    pub const NOSE_BRIDGE: usize = 168;
    /// Nose tip
    pub const NOSE_TIP: usize = 1;
}

/// One detected face: normalized keypoints in detector index order
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Wrap detector output, checking the index contract
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than [`NUM_FACIAL_LANDMARKS`] points are given
    /// or any coordinate is not finite
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() < NUM_FACIAL_LANDMARKS {
            return Err(Error::LandmarkContract(format!(
                "expected at least {NUM_FACIAL_LANDMARKS} landmarks, got {}",
                points.len()
            )));
        }
        if let Some(index) = points.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::LandmarkContract(format!("landmark {index} is not finite")));
        }
        Ok(Self { points })
    }

    /// Build a set from `[x, y]` pairs as stored in recordings
    ///
    /// # Errors
    ///
    /// Same conditions as [`LandmarkSet::new`]
    pub fn from_pairs(pairs: &[[f64; 2]]) -> Result<Self> {
        Self::new(pairs.iter().map(|&[x, y]| Point::new(x, y)).collect())
    }

    /// Number of keypoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a validated set; kept for API symmetry
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Normalized point at `index`
    #[must_use]
    pub fn point(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    /// All keypoints
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    // Indices below NUM_FACIAL_LANDMARKS are guaranteed by `new`.
    fn at(&self, index: usize) -> Point {
        self.points[index]
    }

    /// Extract the named keypoints in pixel space for a `width` x `height` frame
    #[must_use]
    pub fn to_geometry(&self, width: f64, height: f64) -> FaceGeometry {
        use indices::*;

        let px = |index: usize| to_pixels(&self.at(index), width, height);

        FaceGeometry {
            left_pupil: px(LEFT_PUPIL),
            right_pupil: px(RIGHT_PUPIL),
            left_iris: (px(LEFT_IRIS_OUTER), px(LEFT_IRIS_INNER)),
            right_iris: (px(RIGHT_IRIS_INNER), px(RIGHT_IRIS_OUTER)),
            left_cheek: px(LEFT_CHEEK),
            right_cheek: px(RIGHT_CHEEK),
            left_eye_inner: px(LEFT_EYE_INNER),
            right_eye_inner: px(RIGHT_EYE_INNER),
            nose_bridge: px(NOSE_BRIDGE),
            nose_tip: px(NOSE_TIP),
            frame_width: width,
            frame_height: height,
        }
    }
}

/// Named keypoints of one face in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGeometry {
    pub left_pupil: Point,
    pub right_pupil: Point,
    /// Horizontal iris boundary points
    pub left_iris: (Point, Point),
    pub right_iris: (Point, Point),
    pub left_cheek: Point,
    pub right_cheek: Point,
    pub left_eye_inner: Point,
    pub right_eye_inner: Point,
    pub nose_bridge: Point,
    pub nose_tip: Point,
    /// Dimensions of the frame the points were scaled to
    pub frame_width: f64,
    pub frame_height: f64,
}

impl FaceGeometry {
    /// Mean of both iris diameters in pixels
    #[must_use]
    pub fn average_iris_diameter(&self) -> f64 {
        let left = distance(&self.left_iris.0, &self.left_iris.1);
        let right = distance(&self.right_iris.0, &self.right_iris.1);
        (left + right) / 2.0
    }

    /// Cheek-to-cheek width in pixels
    #[must_use]
    pub fn face_width(&self) -> f64 {
        distance(&self.left_cheek, &self.right_cheek)
    }

    /// Gap between the inner eye corners in pixels
    #[must_use]
    pub fn inner_corner_distance(&self) -> f64 {
        distance(&self.left_eye_inner, &self.right_eye_inner)
    }

    /// Pupil-to-pupil distance in pixels
    #[must_use]
    pub fn pupil_distance(&self) -> f64 {
        distance(&self.left_pupil, &self.right_pupil)
    }

    /// Point halfway between the pupils
    #[must_use]
    pub fn pupil_midpoint(&self) -> Point {
        midpoint(&self.left_pupil, &self.right_pupil)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Synthetic frontal face in a 1000x1000 frame, easy to reason about in pixels.
    ///
    /// Pupils sit `pupil_gap_px` apart on y = 400 around x = 500, each iris is
    /// `iris_px` wide, cheeks are `face_px` apart, inner corners 60px apart,
    /// nose bridge on the midline and nose tip 120px below the pupils.
    pub fn synthetic_face(pupil_gap_px: f64, iris_px: f64, face_px: f64) -> LandmarkSet {
        let scale = 1000.0;
        let mut points = vec![Point::new(0.5, 0.5); NUM_FACIAL_LANDMARKS];
        let mut set = |index: usize, x: f64, y: f64| points[index] = Point::new(x / scale, y / scale);

        let lx = 500.0 - pupil_gap_px / 2.0;
        let rx = 500.0 + pupil_gap_px / 2.0;
        set(indices::LEFT_PUPIL, lx, 400.0);
        set(indices::RIGHT_PUPIL, rx, 400.0);
        set(indices::LEFT_IRIS_OUTER, lx - iris_px / 2.0, 400.0);
        set(indices::LEFT_IRIS_INNER, lx + iris_px / 2.0, 400.0);
        set(indices::RIGHT_IRIS_INNER, rx - iris_px / 2.0, 400.0);
        set(indices::RIGHT_IRIS_OUTER, rx + iris_px / 2.0, 400.0);
        set(indices::LEFT_CHEEK, 500.0 - face_px / 2.0, 450.0);
        set(indices::RIGHT_CHEEK, 500.0 + face_px / 2.0, 450.0);
        set(indices::LEFT_EYE_INNER, 470.0, 405.0);
        set(indices::RIGHT_EYE_INNER, 530.0, 405.0);
        set(indices::NOSE_BRIDGE, 500.0, 405.0);
        set(indices::NOSE_TIP, 500.0, 520.0);

        LandmarkSet::new(points).unwrap()
    }
}
