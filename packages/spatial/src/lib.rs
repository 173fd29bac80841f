#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for tax block attribution.
//!
//! Builds an R-tree over tax block polygons and counts, per block and per
//! day, how many buffered event points touch each block. A buffered point
//! may touch several blocks and is counted once for each of them.

pub mod buffer;
pub mod parcels;

use std::collections::{BTreeMap, BTreeSet};

use block_activity_models::{DatedPoint, ParcelDay, ParcelPolygon, RawParcelKey, is_valid_point};
use geo::{Area, CoordsIter, Intersects, MultiPolygon, Validation};
use rstar::{AABB, RTree, RTreeObject};

use crate::buffer::{buffer_envelope, buffer_point};

/// Errors from loading parcel geodata.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// A required input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The document parsed but is not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection in {path}")]
    NotFeatureCollection {
        /// Path of the offending file.
        path: String,
    },
}

/// Event counts keyed by (parcel, day). Absent cells mean zero.
pub type DayCounts = BTreeMap<ParcelDay, u64>;

/// A tax block polygon stored in the R-tree with its key.
struct ParcelEntry {
    key: RawParcelKey,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ParcelEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over tax block polygons.
///
/// Constructed once per run and shared by the permit and complaint
/// joins.
pub struct ParcelIndex {
    parcels: RTree<ParcelEntry>,
    keys: BTreeSet<RawParcelKey>,
    invalid: usize,
    without_geometry: usize,
}

impl ParcelIndex {
    /// Builds the index.
    ///
    /// Every parcel contributes its key to [`Self::keys`], including
    /// parcels without a geometry, but only parcels with a valid polygon
    /// take part in joins.
    #[must_use]
    pub fn new(parcels: Vec<ParcelPolygon>) -> Self {
        let mut keys = BTreeSet::new();
        let mut entries = Vec::with_capacity(parcels.len());
        let mut invalid = 0;
        let mut without_geometry = 0;

        for parcel in parcels {
            keys.insert(parcel.key.clone());

            let Some(geometry) = parcel.geometry else {
                without_geometry += 1;
                continue;
            };
            if !is_valid_polygon(&geometry) {
                log::debug!("Excluding parcel {:?} with invalid geometry", parcel.key);
                invalid += 1;
                continue;
            }

            entries.push(ParcelEntry {
                key: parcel.key,
                envelope: compute_envelope(&geometry),
                polygon: geometry,
            });
        }

        if invalid > 0 {
            log::warn!("Excluded {invalid} parcels with invalid geometry from spatial joins");
        }
        if without_geometry > 0 {
            log::warn!("{without_geometry} parcels have no polygon and only appear as zero rows");
        }
        log::info!(
            "Loaded {} parcel polygons ({} distinct keys) into spatial index",
            entries.len(),
            keys.len()
        );

        Self {
            parcels: RTree::bulk_load(entries),
            keys,
            invalid,
            without_geometry,
        }
    }

    /// Number of indexed (valid) polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parcels.size()
    }

    /// Whether no polygon was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parcels.size() == 0
    }

    /// Number of parcels excluded for invalid geometry.
    #[must_use]
    pub const fn invalid(&self) -> usize {
        self.invalid
    }

    /// Number of parcels that had no polygon at all.
    #[must_use]
    pub const fn without_geometry(&self) -> usize {
        self.without_geometry
    }

    /// Every distinct parcel key in the input, including incomplete ones.
    #[must_use]
    pub const fn keys(&self) -> &BTreeSet<RawParcelKey> {
        &self.keys
    }

    /// Keys of every indexed polygon touched by the disc of `radius`
    /// around `point`. A key appears once per touching polygon.
    pub fn parcels_touching(
        &self,
        point: geo::Point<f64>,
        radius: f64,
    ) -> impl Iterator<Item = &RawParcelKey> {
        let disc = buffer_point(point, radius);
        self.parcels
            .locate_in_envelope_intersecting(&buffer_envelope(point, radius))
            .filter(move |entry| entry.polygon.0.iter().any(|polygon| disc.intersects(polygon)))
            .map(|entry| &entry.key)
    }

    /// Counts, for each (parcel, day), the events whose buffered point
    /// touches the parcel.
    ///
    /// Events with invalid points are skipped. Cells with no events are
    /// omitted from the result.
    #[must_use]
    pub fn count_by_parcel_day(&self, events: &[DatedPoint], radius: f64) -> DayCounts {
        let mut counts = DayCounts::new();
        let mut unmatched = 0u64;

        for event in events {
            if !is_valid_point(&event.point) {
                continue;
            }
            let mut matched = false;
            for key in self.parcels_touching(event.point, radius) {
                matched = true;
                *counts
                    .entry(ParcelDay {
                        parcel: key.clone(),
                        date: event.date,
                    })
                    .or_default() += 1;
            }
            if !matched {
                unmatched += 1;
            }
        }

        log::debug!("{unmatched} of {} events touched no parcel", events.len());

        counts
    }
}

/// Whether a polygon can take part in a spatial join.
///
/// Rejects empty and zero-area shapes, non-finite coordinates, and
/// anything [`Validation`] flags (self-intersecting rings, overlapping
/// members, holes outside the shell).
#[must_use]
pub fn is_valid_polygon(polygon: &MultiPolygon<f64>) -> bool {
    !polygon.0.is_empty()
        && polygon
            .coords_iter()
            .all(|coord| coord.x.is_finite() && coord.y.is_finite())
        && polygon.unsigned_area() > 0.0
        && polygon.is_valid()
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use geo::{LineString, Point, Polygon, Rect, coord};

    fn square(key: RawParcelKey, min: (f64, f64), max: (f64, f64)) -> ParcelPolygon {
        let rect = Rect::new(coord! { x: min.0, y: min.1 }, coord! { x: max.0, y: max.1 });
        ParcelPolygon {
            key,
            geometry: Some(MultiPolygon(vec![rect.to_polygon()])),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 8, d).unwrap()
    }

    #[test]
    fn buffered_point_inside_parcel_counts_once() {
        let index = ParcelIndex::new(vec![square(
            RawParcelKey::new("1", "100"),
            (0.0, 0.0),
            (100.0, 100.0),
        )]);
        let counts = index.count_by_parcel_day(
            &[DatedPoint {
                date: day(1),
                point: Point::new(5.0, 0.0),
            }],
            200.0,
        );
        assert_eq!(counts.len(), 1);
        assert_eq!(
            counts.get(&ParcelDay {
                parcel: RawParcelKey::new("1", "100"),
                date: day(1),
            }),
            Some(&1)
        );
    }

    #[test]
    fn buffer_reaches_neighbouring_parcels() {
        let index = ParcelIndex::new(vec![
            square(RawParcelKey::new("1", "100"), (0.0, 0.0), (100.0, 100.0)),
            square(RawParcelKey::new("1", "101"), (150.0, 0.0), (250.0, 100.0)),
            square(RawParcelKey::new("1", "102"), (1000.0, 0.0), (1100.0, 100.0)),
        ]);
        let keys: Vec<&RawParcelKey> = index
            .parcels_touching(Point::new(90.0, 50.0), 100.0)
            .collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&&RawParcelKey::new("1", "100")));
        assert!(keys.contains(&&RawParcelKey::new("1", "101")));
    }

    #[test]
    fn counts_occurrences_per_day() {
        let index = ParcelIndex::new(vec![square(
            RawParcelKey::new("1", "100"),
            (0.0, 0.0),
            (100.0, 100.0),
        )]);
        let point = Point::new(50.0, 50.0);
        let counts = index.count_by_parcel_day(
            &[
                DatedPoint { date: day(1), point },
                DatedPoint { date: day(1), point },
                DatedPoint { date: day(2), point },
                DatedPoint {
                    date: day(2),
                    point: Point::new(5000.0, 5000.0),
                },
            ],
            200.0,
        );
        let key = RawParcelKey::new("1", "100");
        assert_eq!(
            counts.get(&ParcelDay {
                parcel: key.clone(),
                date: day(1)
            }),
            Some(&2)
        );
        assert_eq!(
            counts.get(&ParcelDay {
                parcel: key,
                date: day(2)
            }),
            Some(&1)
        );
    }

    #[test]
    fn invalid_geometries_are_excluded() {
        let degenerate = square(RawParcelKey::new("1", "200"), (0.0, 0.0), (0.0, 0.0));
        let non_finite = square(RawParcelKey::new("1", "201"), (0.0, 0.0), (f64::NAN, 10.0));
        let index = ParcelIndex::new(vec![degenerate, non_finite]);

        assert!(index.is_empty());
        assert_eq!(index.invalid(), 2);
        assert_eq!(index.keys().len(), 2);

        let counts = index.count_by_parcel_day(
            &[DatedPoint {
                date: day(1),
                point: Point::new(f64::INFINITY, 0.0),
            }],
            200.0,
        );
        assert!(counts.is_empty());
    }

    #[test]
    fn self_intersecting_polygon_is_excluded() {
        let bowtie = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (10.0, 10.0),
                (10.0, 0.0),
                (0.0, 20.0),
                (0.0, 0.0),
            ]),
            vec![],
        );
        let bowtie = MultiPolygon(vec![bowtie]);
        assert!(bowtie.unsigned_area() > 0.0);
        assert!(!is_valid_polygon(&bowtie));

        let index = ParcelIndex::new(vec![ParcelPolygon {
            key: RawParcelKey::new("1", "300"),
            geometry: Some(bowtie),
        }]);
        assert!(index.is_empty());
        assert_eq!(index.invalid(), 1);
        assert_eq!(index.keys().len(), 1);
        assert_eq!(index.parcels_touching(Point::new(5.0, 5.0), 1.0).count(), 0);
    }

    #[test]
    fn parcel_without_geometry_keeps_its_key() {
        let index = ParcelIndex::new(vec![
            square(RawParcelKey::new("1", "100"), (0.0, 0.0), (100.0, 100.0)),
            ParcelPolygon {
                key: RawParcelKey::new("1", "200"),
                geometry: None,
            },
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.without_geometry(), 1);
        assert_eq!(index.invalid(), 0);
        assert!(index.keys().contains(&RawParcelKey::new("1", "200")));
        assert_eq!(index.keys().len(), 2);
    }

    #[test]
    fn key_split_over_two_polygons_counts_once_per_polygon() {
        let key = RawParcelKey::new("1", "100");
        let index = ParcelIndex::new(vec![
            square(key.clone(), (0.0, 0.0), (100.0, 100.0)),
            square(key.clone(), (100.0, 0.0), (200.0, 100.0)),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.keys().len(), 1);

        let counts = index.count_by_parcel_day(
            &[
                DatedPoint {
                    date: day(1),
                    point: Point::new(100.0, 50.0),
                },
                DatedPoint {
                    date: day(1),
                    point: Point::new(10.0, 50.0),
                },
            ],
            5.0,
        );
        assert_eq!(counts.len(), 1);
        assert_eq!(
            counts.get(&ParcelDay {
                parcel: key,
                date: day(1),
            }),
            Some(&3)
        );
    }

    #[test]
    fn padded_keys_stay_distinct_in_the_index() {
        let plain = RawParcelKey::new("1", "100");
        let padded = RawParcelKey::new("1", " 100 ");
        let index = ParcelIndex::new(vec![
            square(plain.clone(), (0.0, 0.0), (100.0, 100.0)),
            square(padded.clone(), (100.0, 0.0), (200.0, 100.0)),
        ]);
        assert_eq!(index.keys().len(), 2);
        assert_eq!(plain.resolve(), padded.resolve());

        let counts = index.count_by_parcel_day(
            &[DatedPoint {
                date: day(1),
                point: Point::new(100.0, 50.0),
            }],
            5.0,
        );
        assert_eq!(counts.len(), 2);
        for parcel in [plain, padded] {
            assert_eq!(counts.get(&ParcelDay { parcel, date: day(1) }), Some(&1));
        }
    }
}
