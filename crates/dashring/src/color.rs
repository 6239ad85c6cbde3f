//! Total RGB → color-label classification.
//!
//! Classification goes through HSV: very dark pixels are black, bright
//! desaturated pixels are white, an ambiguous saturation/value band maps
//! to grey, and everything else is named by an ordered table of hue
//! ranges. Every RGB triple maps to exactly one label.

use serde::{Deserialize, Serialize};

use crate::palette::CSS3_PALETTE;

/// Closed set of color labels a pixel can classify as.
///
/// The twelve chromatic labels are the dash alphabet; black, white, and
/// grey cover the achromatic delimiter/background cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorLabel {
    Red,
    Orange,
    Yellow,
    Lime,
    Green,
    Turquoise,
    Cyan,
    LightBlue,
    Blue,
    Purple,
    Magenta,
    Pink,
    Black,
    White,
    Grey,
}

impl ColorLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Lime => "lime",
            Self::Green => "green",
            Self::Turquoise => "turquoise",
            Self::Cyan => "cyan",
            Self::LightBlue => "lightblue",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Magenta => "magenta",
            Self::Pink => "pink",
            Self::Black => "black",
            Self::White => "white",
            Self::Grey => "grey",
        }
    }
}

impl std::fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One half-open hue band: hues up to and including `upper` (degrees)
/// that fell through all previous bands take `label`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueBand {
    /// Inclusive upper hue bound in integer degrees.
    pub upper: u16,
    pub label: ColorLabel,
}

/// Thresholds and tables for [`PixelClassifier`].
///
/// The hue table and the label → code table are configuration rather
/// than constants: registered product codes were produced under a
/// specific palette, and a deployment must be able to load the palette
/// those codes were derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// HSV value below which a pixel is black.
    /// Default: [`ClassifierConfig::DEFAULT_BLACK_VALUE_MAX`].
    pub black_value_max: f64,
    /// HSV saturation below which a bright pixel is white.
    /// Default: [`ClassifierConfig::DEFAULT_WHITE_SATURATION_MAX`].
    pub white_saturation_max: f64,
    /// HSV value above which a desaturated pixel is white.
    /// Default: [`ClassifierConfig::DEFAULT_WHITE_VALUE_MIN`].
    pub white_value_min: f64,
    /// Grey band: saturation bound for mid-brightness pixels.
    /// Default: [`ClassifierConfig::DEFAULT_GREY_SATURATION_MAX`].
    #[serde(default = "ClassifierConfig::default_grey_saturation_max")]
    pub grey_saturation_max: f64,
    /// Grey band: value floor for the desaturated branch.
    /// Default: [`ClassifierConfig::DEFAULT_GREY_VALUE_MIN`].
    #[serde(default = "ClassifierConfig::default_grey_value_min")]
    pub grey_value_min: f64,
    /// Grey band: saturation bound for the dark branch.
    /// Default: [`ClassifierConfig::DEFAULT_GREY_DARK_SATURATION_MAX`].
    #[serde(default = "ClassifierConfig::default_grey_dark_saturation_max")]
    pub grey_dark_saturation_max: f64,
    /// Grey band: value ceiling for the dark branch.
    /// Default: [`ClassifierConfig::DEFAULT_GREY_DARK_VALUE_MAX`].
    #[serde(default = "ClassifierConfig::default_grey_dark_value_max")]
    pub grey_dark_value_max: f64,
    /// Ordered hue bands, ascending `upper`. The last band must reach 360.
    pub hue_bands: Vec<HueBand>,
    /// Label → two-character code table used when encoding sequences.
    /// Labels absent from this table (black/white/grey by default) are
    /// only valid as delimiters; encoding them is a classification error.
    pub code_table: Vec<(ColorLabel, String)>,
}

impl ClassifierConfig {
    pub const DEFAULT_BLACK_VALUE_MAX: f64 = 0.30;
    pub const DEFAULT_WHITE_SATURATION_MAX: f64 = 0.05;
    pub const DEFAULT_WHITE_VALUE_MIN: f64 = 0.95;
    pub const DEFAULT_GREY_SATURATION_MAX: f64 = 0.05;
    pub const DEFAULT_GREY_VALUE_MIN: f64 = 0.30;
    pub const DEFAULT_GREY_DARK_SATURATION_MAX: f64 = 0.10;
    pub const DEFAULT_GREY_DARK_VALUE_MAX: f64 = 0.50;

    fn default_grey_saturation_max() -> f64 {
        Self::DEFAULT_GREY_SATURATION_MAX
    }

    fn default_grey_value_min() -> f64 {
        Self::DEFAULT_GREY_VALUE_MIN
    }

    fn default_grey_dark_saturation_max() -> f64 {
        Self::DEFAULT_GREY_DARK_SATURATION_MAX
    }

    fn default_grey_dark_value_max() -> f64 {
        Self::DEFAULT_GREY_DARK_VALUE_MAX
    }

    /// The hue table the registered product palette was derived under.
    pub fn default_hue_bands() -> Vec<HueBand> {
        use ColorLabel::*;
        [
            (15, Red),
            (45, Orange),
            (70, Yellow),
            (90, Lime),
            (145, Green),
            (160, Turquoise),
            (185, Cyan),
            (210, LightBlue),
            (260, Blue),
            (275, Purple),
            (300, Magenta),
            (330, Pink),
            (360, Red),
        ]
        .into_iter()
        .map(|(upper, label)| HueBand { upper, label })
        .collect()
    }

    /// The registered label → code mapping (two characters per dash).
    pub fn default_code_table() -> Vec<(ColorLabel, String)> {
        use ColorLabel::*;
        [
            (Red, "00"),
            (Orange, "01"),
            (Yellow, "02"),
            (Lime, "03"),
            (Green, "04"),
            (Turquoise, "05"),
            (Cyan, "06"),
            (LightBlue, "07"),
            (Blue, "08"),
            (Purple, "09"),
            (Magenta, "10"),
            (Pink, "11"),
        ]
        .into_iter()
        .map(|(label, code)| (label, code.to_string()))
        .collect()
    }

    /// Two-character code for a label, if the label is encodable.
    pub fn code_for(&self, label: ColorLabel) -> Option<&str> {
        self.code_table
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, code)| code.as_str())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            black_value_max: Self::DEFAULT_BLACK_VALUE_MAX,
            white_saturation_max: Self::DEFAULT_WHITE_SATURATION_MAX,
            white_value_min: Self::DEFAULT_WHITE_VALUE_MIN,
            grey_saturation_max: Self::DEFAULT_GREY_SATURATION_MAX,
            grey_value_min: Self::DEFAULT_GREY_VALUE_MIN,
            grey_dark_saturation_max: Self::DEFAULT_GREY_DARK_SATURATION_MAX,
            grey_dark_value_max: Self::DEFAULT_GREY_DARK_VALUE_MAX,
            hue_bands: Self::default_hue_bands(),
            code_table: Self::default_code_table(),
        }
    }
}

/// Deterministic, total RGB → [`ColorLabel`] classifier.
#[derive(Debug, Clone, Default)]
pub struct PixelClassifier {
    config: ClassifierConfig,
}

impl PixelClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify an RGB triple into exactly one label.
    ///
    /// Black/white/grey thresholds are checked before the hue table, so
    /// achromatic pixels never alias onto a chromatic label.
    pub fn classify(&self, rgb: [u8; 3]) -> ColorLabel {
        let (hue, saturation, value) = rgb_to_hsv(rgb);
        let cfg = &self.config;

        if value < cfg.black_value_max {
            return ColorLabel::Black;
        }
        if saturation < cfg.white_saturation_max && value > cfg.white_value_min {
            return ColorLabel::White;
        }
        if (saturation < cfg.grey_saturation_max && value > cfg.grey_value_min)
            || (saturation < cfg.grey_dark_saturation_max && value < cfg.grey_dark_value_max)
        {
            return ColorLabel::Grey;
        }

        // Integer truncation before the table lookup is part of the
        // registered-code contract: hue 15.7 is still red.
        let hue = hue as u16;
        for band in &cfg.hue_bands {
            if hue <= band.upper {
                return band.label;
            }
        }
        ColorLabel::Red
    }

    /// Normalized brightness (HSV value channel) in `[0, 1]`.
    pub fn brightness(&self, rgb: [u8; 3]) -> f64 {
        let max = rgb.iter().copied().max().unwrap_or(0);
        max as f64 / 255.0
    }

    /// The three nearest CSS3 reference color names by squared RGB
    /// distance, nearest first. Fallback for pixels where the hue table
    /// is too coarse to be trusted.
    pub fn likely_labels(&self, rgb: [u8; 3]) -> [&'static str; 3] {
        let mut ranked: Vec<(u32, &'static str)> = CSS3_PALETTE
            .iter()
            .map(|(name, reference)| {
                let dist: u32 = reference
                    .iter()
                    .zip(rgb.iter())
                    .map(|(&a, &b)| {
                        let d = a as i32 - b as i32;
                        (d * d) as u32
                    })
                    .sum();
                (dist, *name)
            })
            .collect();
        ranked.sort_by_key(|(dist, _)| *dist);
        [ranked[0].1, ranked[1].1, ranked[2].1]
    }
}

/// RGB → (hue degrees `[0, 360)`, saturation `[0, 1]`, value `[0, 1]`).
fn rgb_to_hsv(rgb: [u8; 3]) -> (f64, f64, f64) {
    let r = rgb[0] as f64 / 255.0;
    let g = rgb[1] as f64 / 255.0;
    let b = rgb[2] as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let value = max;
    let saturation = if max > 0.0 { delta / max } else { 0.0 };
    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (hue, saturation, value)
}
