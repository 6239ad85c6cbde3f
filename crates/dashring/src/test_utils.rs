//! Shared synthetic-image helpers for unit tests.
//!
//! One dashed-ring painter instead of per-module copies. Dash layout is
//! expressed in the same clockwise-from-180° bearing frame the sampler
//! sorts by, so a painted dash order is the decoded dash order.

use image::{Rgb, RgbImage};

use crate::Point;

/// Parameters for a painted dashed ring.
#[derive(Debug, Clone)]
pub(crate) struct RingSpec {
    pub center: Point,
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// Dash colors in clockwise order from the reference bearing.
    pub dashes: Vec<[u8; 3]>,
    /// Fraction of each dash sector painted as background (the gap
    /// leads the sector, so a delimiter run sits at the reference
    /// bearing when `offset_deg` is 0).
    pub gap_frac: f64,
    /// Rotates the whole pattern clockwise by this many degrees.
    pub offset_deg: f64,
    pub background: [u8; 3],
}

impl Default for RingSpec {
    fn default() -> Self {
        Self {
            center: Point::new(100, 100),
            inner_radius: 46.0,
            outer_radius: 66.0,
            dashes: vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]],
            gap_frac: 0.2,
            offset_deg: 0.0,
            background: [255, 255, 255],
        }
    }
}

/// Render a dashed ring on a `background`-filled image.
pub(crate) fn draw_dashed_ring(w: u32, h: u32, spec: &RingSpec) -> RgbImage {
    let mut img = RgbImage::from_pixel(w, h, Rgb(spec.background));
    let sector = 360.0 / spec.dashes.len() as f64;
    let gap = sector * spec.gap_frac;

    for y in 0..h {
        for x in 0..w {
            let dx = x as f64 - spec.center.x as f64;
            let dy = y as f64 - spec.center.y as f64;
            let d = dx.hypot(dy);
            if d < spec.inner_radius || d > spec.outer_radius {
                continue;
            }
            // Clockwise-from-180° key, matching the sampler's sort.
            let key = (180.0 - dy.atan2(dx).to_degrees()).rem_euclid(360.0);
            let key = (key - spec.offset_deg).rem_euclid(360.0);
            let within = key.rem_euclid(sector);
            if within < gap {
                continue;
            }
            let idx = (key / sector) as usize % spec.dashes.len();
            img.put_pixel(x, y, Rgb(spec.dashes[idx]));
        }
    }
    img
}

/// Uniformly colored image.
pub(crate) fn solid_image(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(w, h, Rgb(rgb))
}
