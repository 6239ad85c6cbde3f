//! dashring — detector for dashed-color-ring product markers.
//!
//! A marker is a ring of colored dashes photographed through an on-screen
//! overlay. The pipeline stages are:
//!
//! 1. **Classify** – total RGB → color-label mapping via HSV thresholds
//!    and an ordered hue-range table.
//! 2. **Sample** – circumference coordinate generation around an assumed
//!    center/radius, sorted clockwise from the reference bearing (180°).
//! 3. **Extract** – per-coordinate classification collapsed into one
//!    label per dash using the center (delimiter) color, then encoded as
//!    a fixed-width code (two characters per dash).
//! 4. **Match** – code resolution against the product table: exact
//!    lookup, cyclic rotations, then best similarity ratio.
//! 5. **Refine** – on failure, enumerated center/radius perturbations
//!    and a geometric re-estimate from 8-direction edge walks.
//!
//! # Public API
//! - [`Detector`] and [`DetectConfig`] as primary entry points
//! - [`ProductTable`] for the code → product mapping
//! - [`PixelClassifier`], [`CoordinateSet`], [`SequenceExtractor`],
//!   and [`EdgeScanner`] for driving individual stages
//!
//! The core performs no file or network I/O: images and product tables
//! are loaded by the caller.

mod color;
mod coords;
mod detect;
mod direction;
mod edge;
mod matcher;
mod palette;
mod sequence;
mod similarity;
#[cfg(test)]
mod test_utils;

pub use color::{ClassifierConfig, ColorLabel, HueBand, PixelClassifier};
pub use coords::CoordinateSet;
pub use detect::{DetectConfig, DetectError, Detection, Detector, Perturbation};
pub use direction::Direction;
pub use edge::{EdgeScanConfig, EdgeScanner, RingEstimate, ScanDepth, WalkPixel};
pub use matcher::{MatchOutcome, MatchTier, ProductTable, SimilarMatch, SIMILARITY_THRESHOLD};
pub use sequence::{ClassificationError, Sequence, SequenceExtractor, CODE_WIDTH};
pub use similarity::ratio;

/// Integer pixel coordinates in image space (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn point_distance_is_euclidean() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 4);
        assert_abs_diff_eq!(a.distance(b), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.distance(a), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn point_serializes_as_xy_object() {
        let p = Point::new(7, -2);
        let json = serde_json::to_string(&p).expect("point serializes");
        assert_eq!(json, r#"{"x":7,"y":-2}"#);
    }
}
