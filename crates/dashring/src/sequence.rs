//! Circumference sequence extraction and encoding.
//!
//! Reads the color label at every sampled circumference coordinate,
//! collapses the raw run-length sequence into one label per dash, and
//! encodes the result as a fixed-width color code. The delimiter label
//! is whatever the ring center classifies as at extraction time, so the
//! same extractor works on any background the ring was printed on.

use std::collections::HashMap;
use std::hash::Hash;

use image::RgbImage;
use tracing::debug;

use crate::color::{ColorLabel, PixelClassifier};
use crate::coords::CoordinateSet;
use crate::Point;

/// Characters per dash in an encoded color code.
pub const CODE_WIDTH: usize = 2;

/// A dash label with no entry in the label → code table.
///
/// Achromatic labels (black/white/grey) surviving collapse as dashes
/// mean the classifier thresholds and the image disagree; the code
/// would be meaningless, so extraction fails instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationError {
    pub label: ColorLabel,
}

impl std::fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no registered code for color label `{}`", self.label)
    }
}

impl std::error::Error for ClassificationError {}

/// One extracted circumference sequence: the collapsed dash labels, the
/// encoded color code, and a parallel brightness digit string.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    dashes: Vec<ColorLabel>,
    code: String,
    brightness: String,
    delimiter: ColorLabel,
    points: Vec<Point>,
}

impl Sequence {
    /// Collapsed dash labels, delimiter runs removed.
    pub fn dashes(&self) -> &[ColorLabel] {
        &self.dashes
    }

    /// Encoded color code, [`CODE_WIDTH`] characters per dash. Empty
    /// when no dash survived collapse.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// One brightness digit (tenths of normalized value) per collapsed
    /// brightness run.
    pub fn brightness(&self) -> &str {
        &self.brightness
    }

    /// The label treated as the gap delimiter for this extraction.
    pub fn delimiter(&self) -> ColorLabel {
        self.delimiter
    }

    /// The circumference coordinates the sequence was read from, in
    /// read order. Exposed for overlay drawing; the library never draws.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Reads and encodes circumference sequences from one image.
pub struct SequenceExtractor<'a> {
    image: &'a RgbImage,
    classifier: &'a PixelClassifier,
}

impl<'a> SequenceExtractor<'a> {
    pub fn new(image: &'a RgbImage, classifier: &'a PixelClassifier) -> Self {
        Self { image, classifier }
    }

    /// Extract the collapsed, encoded sequence along `coords`.
    ///
    /// The delimiter label and delimiter brightness come from the pixel
    /// at the coordinate set's center. Fails only when a collapsed dash
    /// has no entry in the label → code table.
    pub fn extract(&self, coords: &CoordinateSet) -> Result<Sequence, ClassificationError> {
        let center_rgb = self.rgb_at(coords.center());
        let delimiter = self.classifier.classify(center_rgb);
        let delimiter_digit = brightness_digit(self.classifier.brightness(center_rgb));

        let mut labels = Vec::with_capacity(coords.len());
        let mut digits = Vec::with_capacity(coords.len());
        for &p in coords.points() {
            let rgb = self.rgb_at(p);
            labels.push(self.classifier.classify(rgb));
            digits.push(brightness_digit(self.classifier.brightness(rgb)));
        }

        let dashes = collapse(&labels, delimiter);
        let brightness: String = collapse(&digits, delimiter_digit)
            .into_iter()
            .map(|d| char::from(b'0' + d))
            .collect();

        let mut code = String::with_capacity(dashes.len() * CODE_WIDTH);
        for &label in &dashes {
            let piece = self
                .classifier
                .config()
                .code_for(label)
                .ok_or(ClassificationError { label })?;
            code.push_str(piece);
        }

        debug!(
            delimiter = %delimiter,
            dashes = dashes.len(),
            code = %code,
            "collapsed circumference sequence"
        );

        Ok(Sequence {
            dashes,
            code,
            brightness,
            delimiter,
            points: coords.points().to_vec(),
        })
    }

    /// Clamped pixel read, so coordinates just past the border still
    /// classify instead of panicking.
    fn rgb_at(&self, p: Point) -> [u8; 3] {
        let x = p.x.clamp(0, self.image.width() as i32 - 1) as u32;
        let y = p.y.clamp(0, self.image.height() as i32 - 1) as u32;
        self.image.get_pixel(x, y).0
    }
}

/// Truncated tenths digit of a normalized brightness, saturating at 9.
fn brightness_digit(value: f64) -> u8 {
    ((value * 10.0) as u8).min(9)
}

/// Collapse a raw circular sequence into one item per run.
///
/// With the delimiter present: rotate so the sequence starts at the
/// first delimiter (reassembling the run a circular read split in two),
/// strip the leading delimiter run, segment on the delimiter, and
/// reduce each segment by majority vote, ties going to the item seen
/// first. Without the delimiter there is nothing to segment on, so only
/// adjacent duplicates are merged.
fn collapse<T: Eq + Hash + Copy>(items: &[T], delimiter: T) -> Vec<T> {
    let Some(first) = items.iter().position(|&i| i == delimiter) else {
        let mut deduped: Vec<T> = Vec::new();
        for &item in items {
            if deduped.last() != Some(&item) {
                deduped.push(item);
            }
        }
        return deduped;
    };

    let mut shifted = Vec::with_capacity(items.len());
    shifted.extend_from_slice(&items[first..]);
    shifted.extend_from_slice(&items[..first]);

    let stripped: Vec<T> = shifted
        .into_iter()
        .skip_while(|&i| i == delimiter)
        .collect();

    stripped
        .split(|&i| i == delimiter)
        .filter(|segment| !segment.is_empty())
        .filter_map(majority)
        .collect()
}

/// Most frequent item of a segment; first occurrence wins ties.
fn majority<T: Eq + Hash + Copy>(segment: &[T]) -> Option<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    for &item in segment {
        *counts.entry(item).or_insert(0) += 1;
    }
    let best = counts.values().copied().max()?;
    segment
        .iter()
        .copied()
        .find(|item| counts[item] == best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ClassifierConfig;
    use crate::test_utils::{draw_dashed_ring, solid_image, RingSpec};

    use ColorLabel::*;

    #[test]
    fn collapse_segments_on_delimiter() {
        let raw = [White, Red, Red, White, Green, Green, White, Blue];
        assert_eq!(collapse(&raw, White), vec![Red, Green, Blue]);
    }

    #[test]
    fn collapse_rotates_split_run_back_together() {
        // A circular read that starts mid-dash: the blue tail and blue
        // head are the same dash.
        let raw = [Blue, White, Red, Red, White, Green, White, Blue, Blue];
        assert_eq!(collapse(&raw, White), vec![Red, Green, Blue]);
    }

    #[test]
    fn collapse_majority_vote_breaks_ties_by_first_seen() {
        let raw = [White, Red, Green, White];
        assert_eq!(collapse(&raw, White), vec![Red]);
        let raw = [White, Red, Green, Green, Red, White];
        assert_eq!(collapse(&raw, White), vec![Red]);
        let raw = [White, Red, Green, Green, White];
        assert_eq!(collapse(&raw, White), vec![Green]);
    }

    #[test]
    fn collapse_without_delimiter_merges_adjacent_runs() {
        let raw = [Red, Red, Green, Green, Green, Blue, Red];
        assert_eq!(collapse(&raw, White), vec![Red, Green, Blue, Red]);
    }

    #[test]
    fn collapse_all_delimiter_is_empty() {
        let raw = [White; 12];
        assert_eq!(collapse(&raw, White), Vec::<ColorLabel>::new());
    }

    fn classifier() -> PixelClassifier {
        PixelClassifier::new(ClassifierConfig::default())
    }

    #[test]
    fn extract_reads_canonical_code_from_ring() {
        let spec = RingSpec::default();
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let extractor = SequenceExtractor::new(&img, &classifier);
        let coords = CoordinateSet::sample(spec.center, 56.0, 360);

        let seq = extractor.extract(&coords).expect("ring should encode");
        assert_eq!(seq.dashes(), &[Red, Green, Blue]);
        assert_eq!(seq.code(), "000408");
        assert_eq!(seq.delimiter(), White);
        assert_eq!(seq.points().len(), coords.len());
    }

    #[test]
    fn extract_works_at_coarse_grain() {
        // 36 raw samples cover the circle with a worst-case angular gap
        // well under a dash gap's 24°, so every delimiter run is seen.
        let spec = RingSpec::default();
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let extractor = SequenceExtractor::new(&img, &classifier);
        let coords = CoordinateSet::sample(spec.center, 56.0, 36);

        let seq = extractor.extract(&coords).expect("ring should encode");
        assert_eq!(seq.code(), "000408");
    }

    #[test]
    fn gapless_single_color_ring_collapses_to_one_dash() {
        // No delimiter ever appears in the raw samples; adjacency
        // grouping reduces the whole ring to its one color.
        let spec = RingSpec {
            dashes: vec![[255, 0, 0]],
            gap_frac: 0.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let extractor = SequenceExtractor::new(&img, &classifier);
        let coords = CoordinateSet::sample(spec.center, 56.0, 360);

        let seq = extractor.extract(&coords).expect("solid ring still encodes");
        assert_eq!(seq.dashes(), &[Red]);
        assert_eq!(seq.code(), "00");
    }

    #[test]
    fn extract_rotated_ring_yields_rotated_code() {
        let spec = RingSpec {
            offset_deg: 100.0,
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let extractor = SequenceExtractor::new(&img, &classifier);
        let coords = CoordinateSet::sample(spec.center, 56.0, 360);

        let seq = extractor.extract(&coords).expect("ring should encode");
        // Same three dashes, read starting from a different one.
        assert_eq!(seq.dashes(), &[Blue, Red, Green]);
        assert_eq!(seq.code(), "080004");
    }

    #[test]
    fn extract_on_blank_image_is_empty() {
        let img = solid_image(120, 120, [255, 255, 255]);
        let classifier = classifier();
        let extractor = SequenceExtractor::new(&img, &classifier);
        let coords = CoordinateSet::sample(Point::new(60, 60), 30.0, 360);

        let seq = extractor.extract(&coords).expect("blank image still collapses");
        assert!(seq.is_empty());
        assert_eq!(seq.code(), "");
    }

    #[test]
    fn extract_fails_on_unmapped_dash_label() {
        let spec = RingSpec {
            dashes: vec![[255, 0, 0], [0, 0, 0], [0, 0, 255]],
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let extractor = SequenceExtractor::new(&img, &classifier);
        let coords = CoordinateSet::sample(spec.center, 56.0, 360);

        let err = extractor.extract(&coords).expect_err("black dash has no code");
        assert_eq!(err.label, Black);
    }

    #[test]
    fn extract_collects_brightness_digits_per_run() {
        // Darker dashes so their brightness digit differs from the
        // white background's.
        let spec = RingSpec {
            dashes: vec![[200, 0, 0], [0, 200, 0], [0, 0, 200]],
            ..RingSpec::default()
        };
        let img = draw_dashed_ring(200, 200, &spec);
        let classifier = classifier();
        let extractor = SequenceExtractor::new(&img, &classifier);
        let coords = CoordinateSet::sample(spec.center, 56.0, 360);

        let seq = extractor.extract(&coords).expect("ring should encode");
        // 200/255 ≈ 0.78 → digit 7 for every dash.
        assert_eq!(seq.brightness(), "777");
    }
}
