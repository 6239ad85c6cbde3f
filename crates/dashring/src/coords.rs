//! Circumference coordinate sampling.
//!
//! Produces the ordered, deduplicated set of integer pixel coordinates
//! a sequence is read from. The angle argument is the raw sample index
//! in radians — NOT `i * 2π / grain`. Registered product codes were
//! derived under this sampling, so the behavior (including the point
//! count saturating as grain grows) is a compatibility contract, not a
//! bug to fix. Changing it requires re-registering every product code.

use std::collections::HashSet;

use crate::Point;

/// Ordered, deduplicated circumference coordinates for one ring geometry.
///
/// Points are sorted by bearing from the center, starting at the
/// coordinate nearest 180° (due left) and proceeding clockwise.
/// Immutable once computed; a new geometry means a new set.
#[derive(Debug, Clone)]
pub struct CoordinateSet {
    center: Point,
    radius: f64,
    grain: u32,
    points: Vec<Point>,
}

impl CoordinateSet {
    /// Sample `grain` points on the circle `(center, radius)`.
    pub fn sample(center: Point, radius: f64, grain: u32) -> Self {
        let mut seen = HashSet::new();
        let mut points = Vec::new();
        for i in 0..grain {
            let angle = i as f64;
            let x = (radius * angle.cos() + center.x as f64).round() as i32;
            let y = (radius * angle.sin() + center.y as f64).round() as i32;
            let p = Point::new(x, y);
            if seen.insert(p) {
                points.push(p);
            }
        }
        points.sort_by(|a, b| {
            bearing_key(center, *a)
                .total_cmp(&bearing_key(center, *b))
        });
        Self {
            center,
            radius,
            grain,
            points,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn grain(&self) -> u32 {
        self.grain
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Sort key: degrees clockwise from the reference bearing (due left).
///
/// `atan2` bearings are remapped so a point at exactly 180° keys to 0
/// and keys grow clockwise around the ring.
fn bearing_key(center: Point, p: Point) -> f64 {
    let dx = (p.x - center.x) as f64;
    let dy = (p.y - center.y) as f64;
    (180.0 - dy.atan2(dx).to_degrees()).rem_euclid(360.0)
}
