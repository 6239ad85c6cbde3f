//! Edge walking and ring geometry re-estimation.
//!
//! When approximation with the nominal overlay geometry fails, the ring
//! is located geometrically: from the assumed center, walk outward in
//! the eight directions until the color classification changes (inner
//! edges), re-center between opposing inner edges, then walk on from
//! each inner edge to the outer edge. The per-direction radius is the
//! inner distance plus half the ring thickness; the overall radius is
//! the mean over all directions that resolved.
//!
//! Color naming is noisy at dash boundaries, so a walking pixel carries
//! a short window of recently observed labels and an edge is declared
//! only when the window no longer intersects the starting window.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::color::{ColorLabel, PixelClassifier};
use crate::direction::Direction;
use crate::Point;

/// Tuning for edge walks and scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeScanConfig {
    /// Number of recent labels a walking pixel remembers. A window of 2
    /// lets a single unrepresentative pixel pass without declaring an
    /// edge. Default: [`EdgeScanConfig::DEFAULT_COLOR_VARIANCE`].
    pub color_variance: usize,
    /// Pixel margin at the right/bottom borders treated as out of
    /// bounds. Default: [`EdgeScanConfig::DEFAULT_BOUNDS_MARGIN`].
    pub bounds_margin: i32,
    /// Maximum perpendicular side-step retries before a scan gives up
    /// and returns its best-effort out-of-bounds pixel.
    /// Default: [`EdgeScanConfig::DEFAULT_MAX_SIDE_STEPS`].
    pub max_side_steps: u32,
    /// Pixels advanced per walk iteration.
    /// Default: [`EdgeScanConfig::DEFAULT_STEP`].
    pub step: i32,
}

impl EdgeScanConfig {
    pub const DEFAULT_COLOR_VARIANCE: usize = 2;
    pub const DEFAULT_BOUNDS_MARGIN: i32 = 3;
    pub const DEFAULT_MAX_SIDE_STEPS: u32 = 100;
    pub const DEFAULT_STEP: i32 = 1;
}

impl Default for EdgeScanConfig {
    fn default() -> Self {
        Self {
            color_variance: Self::DEFAULT_COLOR_VARIANCE,
            bounds_margin: Self::DEFAULT_BOUNDS_MARGIN,
            max_side_steps: Self::DEFAULT_MAX_SIDE_STEPS,
            step: Self::DEFAULT_STEP,
        }
    }
}

/// Which ring edge a walk is looking for.
///
/// Outer walks additionally probe the two 45°-adjacent directions when
/// continuity breaks, tolerating ring edges that are not radial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDepth {
    Inner,
    Outer,
}

/// A pixel moving through the image during an edge walk.
///
/// Owns its coordinates and label window; created per walk and
/// discarded when the walk ends.
#[derive(Debug, Clone)]
pub struct WalkPixel {
    pub point: Point,
    pub brightness: f64,
    window: Vec<ColorLabel>,
}

impl WalkPixel {
    fn observe(&mut self, label: ColorLabel, brightness: f64, variance: usize) {
        self.brightness = brightness;
        self.window.push(label);
        let len = self.window.len();
        if len > variance {
            self.window.drain(..len - variance);
        }
    }

    /// Whether any recently seen label also appears in `other`.
    pub fn intersects(&self, other: &[ColorLabel]) -> bool {
        self.window.iter().any(|label| other.contains(label))
    }

    /// Most recently observed label.
    pub fn label(&self) -> ColorLabel {
        *self.window.last().expect("window is never empty")
    }

    pub fn window(&self) -> &[ColorLabel] {
        &self.window
    }
}

/// Geometry recovered from the eight-direction edge passes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RingEstimate {
    /// Center re-estimated from opposing inner edges.
    pub center: Point,
    /// Mean mid-ring radius over resolved directions.
    pub radius: f64,
    /// How many of the eight directions resolved both edges.
    pub resolved_directions: usize,
}

/// Walks pixels outward from a point until the color changes.
pub struct EdgeScanner<'a> {
    image: &'a RgbImage,
    classifier: &'a PixelClassifier,
    config: &'a EdgeScanConfig,
}

impl<'a> EdgeScanner<'a> {
    pub fn new(
        image: &'a RgbImage,
        classifier: &'a PixelClassifier,
        config: &'a EdgeScanConfig,
    ) -> Self {
        Self {
            image,
            classifier,
            config,
        }
    }

    /// Whether a point is at or past the usable image border.
    pub fn out_of_bounds(&self, p: Point) -> bool {
        let (w, h) = self.image.dimensions();
        let margin = self.config.bounds_margin;
        p.x < 0 || p.y < 0 || p.x >= w as i32 - margin || p.y >= h as i32 - margin
    }

    fn rgb_at(&self, p: Point) -> Option<[u8; 3]> {
        let (w, h) = self.image.dimensions();
        if p.x < 0 || p.y < 0 || p.x >= w as i32 || p.y >= h as i32 {
            return None;
        }
        Some(self.image.get_pixel(p.x as u32, p.y as u32).0)
    }

    /// Fresh walking pixel at `p`. Coordinates outside the image are
    /// clamped for sampling only; the logical point is kept as given so
    /// bounds checks still see it.
    fn pixel_at(&self, p: Point) -> WalkPixel {
        let (w, h) = self.image.dimensions();
        let sample = Point::new(
            p.x.clamp(0, w as i32 - 1),
            p.y.clamp(0, h as i32 - 1),
        );
        let rgb = self.image.get_pixel(sample.x as u32, sample.y as u32).0;
        WalkPixel {
            point: p,
            brightness: self.classifier.brightness(rgb),
            window: vec![self.classifier.classify(rgb)],
        }
    }

    fn advance(&self, px: &mut WalkPixel, direction: Direction, steps: i32) {
        px.point = direction.advance(px.point, steps);
        if let Some(rgb) = self.rgb_at(px.point) {
            px.observe(
                self.classifier.classify(rgb),
                self.classifier.brightness(rgb),
                self.config.color_variance,
            );
        }
    }

    /// Walk from `start` in `direction` until the label window stops
    /// intersecting the starting window or the walk leaves the image.
    ///
    /// The walk is hard-bounded by the image perimeter length; it can
    /// never loop unboundedly, even on a pathological buffer.
    pub fn walk(&self, start: Point, direction: Direction, depth: ScanDepth) -> WalkPixel {
        let mut px = self.pixel_at(start);
        let start_window = px.window.clone();
        let (w, h) = self.image.dimensions();
        let max_steps = (w + h) as usize;

        for _ in 0..max_steps {
            if !px.intersects(&start_window) || self.out_of_bounds(px.point) {
                break;
            }
            self.advance(&mut px, direction, self.config.step);

            if depth == ScanDepth::Outer && !px.intersects(&start_window) {
                px = self.probe_adjacent(px, direction, &start_window);
            }
        }
        px
    }

    /// When straight-line continuity breaks on an outer walk, probe one
    /// step in each 45°-adjacent direction and continue from whichever
    /// still intersects the starting colors. If neither does, the break
    /// stands and the walk ends where it was.
    fn probe_adjacent(
        &self,
        broken: WalkPixel,
        direction: Direction,
        start_window: &[ColorLabel],
    ) -> WalkPixel {
        let (first, second) = direction.adjacent();
        for adjacent in [first, second] {
            let mut probe = self.pixel_at(broken.point);
            self.advance(&mut probe, adjacent, self.config.step);
            if probe.intersects(start_window) {
                return probe;
            }
        }
        broken
    }

    /// Walk with bounded perpendicular side-step retries.
    ///
    /// A partially formed ring can leave a direction with no edge on the
    /// direct line. Retry from `start` offset sideways by the retry
    /// index (alternating sides), up to `max_side_steps` rows; if every
    /// retry runs out of the image, the last out-of-bounds pixel is
    /// returned as a best effort.
    pub fn scan(&self, start: Point, direction: Direction, depth: ScanDepth) -> WalkPixel {
        let mut px = self.walk(start, direction, depth);
        let mut rows = 0u32;

        while self.out_of_bounds(px.point) && rows < self.config.max_side_steps {
            let offset = direction.side_step(rows).advance(start, rows as i32);
            px = self.walk(offset, direction, depth);
            rows += 1;
        }
        px
    }

    /// Re-derive ring geometry from a starting center.
    ///
    /// Returns `None` when no direction resolves both edges; directions
    /// that fail individually are skipped and merely thin the mean.
    pub fn estimate(&self, center: Point) -> Option<RingEstimate> {
        let mut inner: [Option<Point>; 8] = [None; 8];
        for direction in Direction::ALL {
            let px = self.scan(center, direction, ScanDepth::Inner);
            if self.out_of_bounds(px.point) {
                tracing::debug!("no inner edge toward {direction}");
            } else {
                inner[direction.index()] = Some(px.point);
            }
        }

        let center = recenter(center, &inner);

        let mut radii = Vec::with_capacity(8);
        for direction in Direction::ALL {
            let Some(inner_edge) = inner[direction.index()] else {
                continue;
            };
            let outer = self.scan(inner_edge, direction, ScanDepth::Outer);
            if self.out_of_bounds(outer.point) {
                tracing::debug!("no outer edge toward {direction}");
                continue;
            }
            let inner_radius = center.distance(inner_edge);
            let thickness = inner_edge.distance(outer.point);
            radii.push((inner_radius + thickness / 2.0).trunc());
        }

        if radii.is_empty() {
            return None;
        }
        let radius = radii.iter().sum::<f64>() / radii.len() as f64;
        tracing::debug!(
            "edge estimate: center={center} radius={radius:.1} ({}/8 directions)",
            radii.len()
        );
        Some(RingEstimate {
            center,
            radius,
            resolved_directions: radii.len(),
        })
    }
}

/// Midpoint between opposing inner edges, axis by axis. An axis with a
/// missing edge keeps the starting coordinate.
fn recenter(start: Point, inner: &[Option<Point>; 8]) -> Point {
    let mut center = start;
    if let (Some(left), Some(right)) = (
        inner[Direction::Left.index()],
        inner[Direction::Right.index()],
    ) {
        center.x = left.x + (right.x - left.x) / 2;
    }
    if let (Some(up), Some(down)) = (
        inner[Direction::Up.index()],
        inner[Direction::Down.index()],
    ) {
        center.y = up.y + (down.y - up.y) / 2;
    }
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ClassifierConfig;
    use crate::test_utils::{draw_dashed_ring, solid_image, RingSpec};

    fn classifier() -> PixelClassifier {
        PixelClassifier::new(ClassifierConfig::default())
    }

    #[test]
    fn walk_stops_at_a_color_change() {
        let spec = RingSpec {
            center: Point::new(100, 100),
            inner_radius: 30.0,
            outer_radius: 40.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let config = EdgeScanConfig::default();
        let scanner = EdgeScanner::new(&img, &classifier, &config);

        // Due down from the center the ring is a solid dash.
        let px = scanner.walk(Point::new(100, 100), Direction::Down, ScanDepth::Inner);
        let d = px.point.distance(Point::new(100, 100));
        assert!(
            (28.0..36.0).contains(&d),
            "inner edge at distance {d}, point {}",
            px.point
        );
    }

    #[test]
    fn walk_on_uniform_image_runs_out_of_bounds() {
        let img = solid_image(64, 64, [255, 255, 255]);
        let classifier = classifier();
        let config = EdgeScanConfig::default();
        let scanner = EdgeScanner::new(&img, &classifier, &config);

        let px = scanner.walk(Point::new(32, 32), Direction::Right, ScanDepth::Inner);
        assert!(scanner.out_of_bounds(px.point));
    }

    #[test]
    fn scan_terminates_within_retry_bound_on_pathological_image() {
        // No edge anywhere: every retry walks out of bounds. The scan
        // must still return, with the best-effort pixel out of bounds.
        let img = solid_image(64, 64, [255, 255, 255]);
        let classifier = classifier();
        let config = EdgeScanConfig::default();
        let scanner = EdgeScanner::new(&img, &classifier, &config);

        for direction in Direction::ALL {
            let px = scanner.scan(Point::new(32, 32), direction, ScanDepth::Inner);
            assert!(scanner.out_of_bounds(px.point), "toward {direction}");
        }
    }

    #[test]
    fn estimate_recovers_center_and_radius() {
        let spec = RingSpec {
            center: Point::new(100, 100),
            inner_radius: 25.0,
            outer_radius: 35.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let config = EdgeScanConfig::default();
        let scanner = EdgeScanner::new(&img, &classifier, &config);

        let est = scanner
            .estimate(Point::new(100, 100))
            .expect("ring should be found");
        assert!(est.resolved_directions >= 4);
        assert!(
            (est.center.x - 100).abs() <= 4 && (est.center.y - 100).abs() <= 4,
            "center drifted to {}",
            est.center
        );
        assert!(
            (26.0..36.0).contains(&est.radius),
            "radius was {}",
            est.radius
        );
    }

    #[test]
    fn estimate_fails_cleanly_without_a_ring() {
        let img = solid_image(96, 96, [255, 255, 255]);
        let classifier = classifier();
        let config = EdgeScanConfig::default();
        let scanner = EdgeScanner::new(&img, &classifier, &config);
        assert!(scanner.estimate(Point::new(48, 48)).is_none());
    }

    #[test]
    fn estimate_recovers_an_offset_center() {
        let spec = RingSpec {
            center: Point::new(110, 90),
            inner_radius: 25.0,
            outer_radius: 35.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let config = EdgeScanConfig::default();
        let scanner = EdgeScanner::new(&img, &classifier, &config);

        let est = scanner
            .estimate(Point::new(100, 100))
            .expect("ring should be found");
        assert!(
            (est.center.x - 110).abs() <= 6 && (est.center.y - 90).abs() <= 6,
            "center estimate {} too far from (110, 90)",
            est.center
        );
    }
}
