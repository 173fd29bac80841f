//! Point buffering.
//!
//! Reported locations are approximate, so every event point is replaced
//! by a disc before being joined against tax blocks. The disc is a
//! regular polygon inscribed in the circle, with the same vertex count
//! GEOS uses by default (16 segments per quarter circle).

use std::f64::consts::TAU;

use geo::{Coord, LineString, Point, Polygon};
use rstar::AABB;

/// Vertices used to approximate a disc.
pub const BUFFER_SEGMENTS: usize = 64;

/// Returns a disc of `radius` around `center`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn buffer_point(center: Point<f64>, radius: f64) -> Polygon<f64> {
    let step = TAU / BUFFER_SEGMENTS as f64;
    let ring: Vec<Coord<f64>> = (0..BUFFER_SEGMENTS)
        .map(|i| {
            let angle = step * i as f64;
            Coord {
                x: radius.mul_add(angle.cos(), center.x()),
                y: radius.mul_add(angle.sin(), center.y()),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Bounding box of the disc of `radius` around `center`.
#[must_use]
pub fn buffer_envelope(center: Point<f64>, radius: f64) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [center.x() - radius, center.y() - radius],
        [center.x() + radius, center.y() + radius],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains};

    #[test]
    fn disc_is_closed_and_centered() {
        let disc = buffer_point(Point::new(100.0, 50.0), 10.0);
        // Polygon::new closes the ring.
        assert_eq!(disc.exterior().0.len(), BUFFER_SEGMENTS + 1);
        assert!(disc.contains(&Point::new(100.0, 50.0)));
        assert!(!disc.contains(&Point::new(111.0, 50.0)));
    }

    #[test]
    fn disc_area_approximates_circle() {
        let disc = buffer_point(Point::new(0.0, 0.0), 200.0);
        let circle = std::f64::consts::PI * 200.0 * 200.0;
        let area = disc.unsigned_area();
        assert!(area < circle);
        assert!((circle - area) / circle < 0.01);
    }
}
