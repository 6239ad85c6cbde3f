//! Top-level marker detection.
//!
//! A detection runs a fixed, finite schedule of attempts: the nominal
//! overlay geometry at the image center, then each configured
//! center/radius perturbation, then one geometry re-estimated by the
//! edge scanner at a higher sampling grain. The first attempt whose
//! code resolves against the product table wins; if the schedule runs
//! out the error reports how many attempts were made and the best
//! similarity ratio seen, so a caller can tell "no ring" from "ring
//! with an unregistered code".

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::color::{ClassifierConfig, PixelClassifier};
use crate::coords::CoordinateSet;
use crate::edge::{EdgeScanConfig, EdgeScanner};
use crate::matcher::{MatchOutcome, MatchTier, ProductTable, SimilarMatch};
use crate::sequence::{ClassificationError, Sequence, SequenceExtractor};
use crate::Point;

/// One alternative geometry to try when the nominal overlay misses.
///
/// Shifts are fractions of the nominal radius; the scale multiplies it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub dx: f64,
    pub dy: f64,
    pub scale: f64,
}

impl Perturbation {
    fn apply(&self, center: Point, radius: f64) -> (Point, f64) {
        let shifted = Point::new(
            center.x + (self.dx * radius).round() as i32,
            center.y + (self.dy * radius).round() as i32,
        );
        (shifted, radius * self.scale)
    }
}

/// Tuning for [`Detector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Samples per circumference on approximation attempts.
    /// Default: [`DetectConfig::DEFAULT_GRAIN`].
    pub grain: u32,
    /// Samples per circumference on the edge-refined attempt.
    /// Default: [`DetectConfig::DEFAULT_REFINE_GRAIN`].
    #[serde(default = "DetectConfig::default_refine_grain")]
    pub refine_grain: u32,
    /// Nominal mid-ring radius as a fraction of half the smaller image
    /// dimension. Default: [`DetectConfig::DEFAULT_RADIUS_FRACTION`].
    pub radius_fraction: f64,
    /// Geometry perturbations tried, in order, after the nominal
    /// attempt. Default: [`DetectConfig::default_perturbations`].
    #[serde(default = "DetectConfig::default_perturbations")]
    pub perturbations: Vec<Perturbation>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub edge: EdgeScanConfig,
}

impl DetectConfig {
    pub const DEFAULT_GRAIN: u32 = 360;
    pub const DEFAULT_REFINE_GRAIN: u32 = 720;
    pub const DEFAULT_RADIUS_FRACTION: f64 = 0.56;

    fn default_refine_grain() -> u32 {
        Self::DEFAULT_REFINE_GRAIN
    }

    /// Radius scales first (markers are printed at a few known sizes),
    /// then single-axis center shifts.
    pub fn default_perturbations() -> Vec<Perturbation> {
        let scale = |s: f64| Perturbation {
            dx: 0.0,
            dy: 0.0,
            scale: s,
        };
        let shift = |dx: f64, dy: f64| Perturbation {
            dx,
            dy,
            scale: 1.0,
        };
        vec![
            scale(0.85),
            scale(1.15),
            scale(0.80),
            scale(1.20),
            shift(-0.15, 0.0),
            shift(0.15, 0.0),
            shift(0.0, -0.15),
            shift(0.0, 0.15),
        ]
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            grain: Self::DEFAULT_GRAIN,
            refine_grain: Self::DEFAULT_REFINE_GRAIN,
            radius_fraction: Self::DEFAULT_RADIUS_FRACTION,
            perturbations: Self::default_perturbations(),
            classifier: ClassifierConfig::default(),
            edge: EdgeScanConfig::default(),
        }
    }
}

/// Why a detection produced no product.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// A collapsed dash had no entry in the label → code table. The
    /// palette and the image disagree, so retrying other geometries
    /// would only encode more garbage.
    Classification(ClassificationError),
    /// Every scheduled attempt failed to resolve a product.
    NoMatch {
        attempts: u32,
        /// Best tier-3 near-miss across all attempts.
        best: SimilarMatch,
    },
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classification(err) => write!(f, "classification failed: {err}"),
            Self::NoMatch { attempts, best } => write!(
                f,
                "no registered product matched after {attempts} attempts \
                 (best similarity {:.2})",
                best.ratio
            ),
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Classification(err) => Some(err),
            Self::NoMatch { .. } => None,
        }
    }
}

impl From<ClassificationError> for DetectError {
    fn from(err: ClassificationError) -> Self {
        Self::Classification(err)
    }
}

/// A resolved marker.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Product name from the table.
    pub product: String,
    /// Registered key the extracted code normalized to.
    pub key: String,
    /// Code as extracted, before normalization.
    pub code: String,
    pub tier: MatchTier,
    /// Geometry of the winning attempt.
    pub center: Point,
    pub radius: f64,
    /// Attempts consumed, the winning one included.
    pub attempts: u32,
    /// The winning circumference sequence, for overlays and diagnostics.
    pub sequence: Sequence,
}

enum AttemptOutcome {
    Accepted {
        sequence: Sequence,
        key: String,
        product: String,
        tier: MatchTier,
    },
    Rejected(SimilarMatch),
}

/// Detects and resolves one dashed-ring marker per image.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    config: DetectConfig,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DetectConfig {
        &mut self.config
    }

    /// Run the attempt schedule against `image` and resolve the first
    /// successful code in `table`.
    pub fn detect(
        &self,
        image: &RgbImage,
        table: &ProductTable,
    ) -> Result<Detection, DetectError> {
        let classifier = PixelClassifier::new(self.config.classifier.clone());
        let extractor = SequenceExtractor::new(image, &classifier);

        let (w, h) = image.dimensions();
        let nominal_center = Point::new(w as i32 / 2, h as i32 / 2);
        let nominal_radius = self.config.radius_fraction * (w.min(h) as f64 / 2.0);

        let mut geometries = Vec::with_capacity(1 + self.config.perturbations.len());
        geometries.push((nominal_center, nominal_radius));
        for p in &self.config.perturbations {
            geometries.push(p.apply(nominal_center, nominal_radius));
        }

        let mut attempts = 0u32;
        let mut best = SimilarMatch {
            key: None,
            ratio: 0.0,
        };

        for (center, radius) in geometries {
            attempts += 1;
            match self.attempt(&extractor, table, center, radius, self.config.grain)? {
                AttemptOutcome::Accepted {
                    sequence,
                    key,
                    product,
                    tier,
                } => return Ok(self.accept(sequence, key, product, tier, center, radius, attempts)),
                AttemptOutcome::Rejected(similar) => {
                    if similar.ratio > best.ratio {
                        best = similar;
                    }
                }
            }
        }

        // Approximation exhausted; locate the ring geometrically.
        let scanner = EdgeScanner::new(image, &classifier, &self.config.edge);
        match scanner.estimate(nominal_center) {
            Some(estimate) => {
                attempts += 1;
                match self.attempt(
                    &extractor,
                    table,
                    estimate.center,
                    estimate.radius,
                    self.config.refine_grain,
                )? {
                    AttemptOutcome::Accepted {
                        sequence,
                        key,
                        product,
                        tier,
                    } => {
                        return Ok(self.accept(
                            sequence,
                            key,
                            product,
                            tier,
                            estimate.center,
                            estimate.radius,
                            attempts,
                        ))
                    }
                    AttemptOutcome::Rejected(similar) => {
                        if similar.ratio > best.ratio {
                            best = similar;
                        }
                    }
                }
            }
            None => warn!("edge refinement found no ring"),
        }

        Err(DetectError::NoMatch { attempts, best })
    }

    fn attempt(
        &self,
        extractor: &SequenceExtractor<'_>,
        table: &ProductTable,
        center: Point,
        radius: f64,
        grain: u32,
    ) -> Result<AttemptOutcome, ClassificationError> {
        let coords = CoordinateSet::sample(center, radius, grain);
        let sequence = extractor.extract(&coords)?;
        if sequence.is_empty() {
            debug!(%center, radius, "no dashes on sampled circumference");
            return Ok(AttemptOutcome::Rejected(SimilarMatch {
                key: None,
                ratio: 0.0,
            }));
        }
        match table.resolve(sequence.code()) {
            MatchOutcome::Match { key, product, tier } => Ok(AttemptOutcome::Accepted {
                sequence,
                key,
                product,
                tier,
            }),
            MatchOutcome::NoMatch(similar) => {
                debug!(%center, radius, code = sequence.code(), "code resolved nothing");
                Ok(AttemptOutcome::Rejected(similar))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn accept(
        &self,
        sequence: Sequence,
        key: String,
        product: String,
        tier: MatchTier,
        center: Point,
        radius: f64,
        attempts: u32,
    ) -> Detection {
        info!(%product, %tier, attempts, %center, radius, "resolved product marker");
        Detection {
            product,
            key,
            code: sequence.code().to_string(),
            tier,
            center,
            radius,
            attempts,
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorLabel;
    use crate::test_utils::{draw_dashed_ring, solid_image, RingSpec};

    fn table() -> ProductTable {
        let mut t = ProductTable::new();
        t.insert("000408", "north marker");
        t
    }

    #[test]
    fn detects_centered_ring_on_the_first_attempt() {
        // Ring band 46..66 straddles the nominal radius 0.56 * 100 = 56.
        let img = draw_dashed_ring(200, 200, &RingSpec::default());
        let detection = Detector::new()
            .detect(&img, &table())
            .expect("nominal geometry should hit");

        assert_eq!(detection.product, "north marker");
        assert_eq!(detection.key, "000408");
        assert_eq!(detection.tier, MatchTier::Exact);
        assert_eq!(detection.attempts, 1);
        assert_eq!(detection.center, Point::new(100, 100));
        assert!(!detection.sequence.points().is_empty());
    }

    #[test]
    fn rotated_ring_resolves_through_rotation_tier() {
        let spec = RingSpec {
            offset_deg: 100.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let detection = Detector::new()
            .detect(&img, &table())
            .expect("rotated ring should still resolve");

        assert_eq!(detection.key, "000408");
        assert_eq!(detection.code, "080004");
        assert_eq!(detection.tier, MatchTier::Rotation);
    }

    #[test]
    fn perturbation_rescues_a_shrunken_ring() {
        // Band 38..52 misses the nominal radius 56 but contains the
        // first scale perturbation, 0.85 * 56 ≈ 47.6.
        let spec = RingSpec {
            inner_radius: 38.0,
            outer_radius: 52.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let detection = Detector::new()
            .detect(&img, &table())
            .expect("scale perturbation should hit");

        assert_eq!(detection.key, "000408");
        assert_eq!(detection.attempts, 2);
    }

    #[test]
    fn edge_refinement_rescues_a_small_ring() {
        // Band 25..42 is outside every approximation geometry; only the
        // edge-scanner estimate lands inside it.
        let spec = RingSpec {
            inner_radius: 25.0,
            outer_radius: 42.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let detection = Detector::new()
            .detect(&img, &table())
            .expect("edge refinement should hit");

        assert_eq!(detection.key, "000408");
        assert_eq!(detection.product, "north marker");
        // Nominal + 8 perturbations + the refined attempt.
        assert_eq!(detection.attempts, 10);
        assert!(
            (25.0..42.0).contains(&detection.radius),
            "refined radius {} outside the ring band",
            detection.radius
        );
    }

    #[test]
    fn blank_image_fails_with_attempt_count() {
        let img = solid_image(200, 200, [255, 255, 255]);
        let err = Detector::new()
            .detect(&img, &table())
            .expect_err("nothing to detect");

        match err {
            DetectError::NoMatch { attempts, best } => {
                // Nominal + 8 perturbations; refinement finds no ring.
                assert_eq!(attempts, 9);
                assert!(best.key.is_none());
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn unmapped_dash_label_is_fatal() {
        let spec = RingSpec {
            dashes: vec![[255, 0, 0], [0, 0, 0], [0, 0, 255]],
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let err = Detector::new()
            .detect(&img, &table())
            .expect_err("black dash cannot encode");

        match err {
            DetectError::Classification(inner) => assert_eq!(inner.label, ColorLabel::Black),
            other => panic!("expected Classification, got {other:?}"),
        }
    }

    #[test]
    fn config_roundtrips_and_backfills_defaults() {
        let cfg = DetectConfig::default();
        let json = serde_json::to_string(&cfg).expect("config serializes");
        let back: DetectConfig = serde_json::from_str(&json).expect("config deserializes");
        assert_eq!(back.grain, DetectConfig::DEFAULT_GRAIN);
        assert_eq!(back.perturbations, cfg.perturbations);

        // Late-added fields may be absent from stored configs.
        let sparse = r#"{"grain": 180, "radius_fraction": 0.5}"#;
        let cfg: DetectConfig = serde_json::from_str(sparse).expect("sparse config parses");
        assert_eq!(cfg.refine_grain, DetectConfig::DEFAULT_REFINE_GRAIN);
        assert_eq!(cfg.perturbations.len(), 8);
    }
}
