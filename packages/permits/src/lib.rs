#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Film permit location resolution.
//!
//! Each permit's "parking held" description is split into comma-separated
//! clauses, each clause is parsed into a main street and two cross
//! streets, and the two resulting intersections are looked up in the
//! [`IntersectionCatalog`]. The representative point of a clause is the
//! midpoint of its two intersection points.
//!
//! Permits whose description has a single clause are not geocoded at
//! all. Malformed clauses are dropped and counted. Clauses whose
//! intersections are not in the catalog keep a `None` midpoint.

pub mod clauses;
pub mod location;

use std::collections::BTreeMap;

use block_activity_intersections::{IntersectionCatalog, StreetPair};
use block_activity_models::PermitRecord;
use chrono::NaiveDateTime;
use geo::{Centroid, MultiPoint, Point};

use crate::location::{LocationParse, MalformedReason, ParkingLocation, parse_location};

/// One parking clause of a permit, with its resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct PermitSegment {
    /// Permit the clause belongs to.
    pub permit_id: String,
    /// Start of the permitted activity.
    pub start: NaiveDateTime,
    /// End of the permitted activity.
    pub end: NaiveDateTime,
    /// Borough name as written on the permit.
    pub borough: Option<String>,
    /// The clause text.
    pub location_text: String,
    /// `(main street, first cross street)`.
    pub from_intersection: StreetPair,
    /// `(main street, second cross street)`.
    pub to_intersection: StreetPair,
    /// Midpoint of the two intersections, `None` if either is unknown.
    pub midpoint: Option<Point<f64>>,
}

/// Counters describing how permits fared during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Permits examined.
    pub permits: u64,
    /// Permits skipped because their description has a single clause.
    pub single_clause: u64,
    /// Clauses examined from multi-clause permits.
    pub clauses: u64,
    /// Clauses that did not match the location grammar, by reason.
    pub malformed: BTreeMap<MalformedReason, u64>,
    /// Parsed clauses with at least one intersection missing from the
    /// catalog.
    pub unresolved: u64,
    /// Parsed clauses with a midpoint.
    pub resolved: u64,
}

impl ResolutionStats {
    /// Total malformed clauses across all reasons.
    #[must_use]
    pub fn malformed_total(&self) -> u64 {
        self.malformed.values().sum()
    }
}

/// Output of [`resolve_permits`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Every parsed clause, resolved or not.
    pub segments: Vec<PermitSegment>,
    /// What happened along the way.
    pub stats: ResolutionStats,
}

impl Resolution {
    /// Segments that have a midpoint.
    pub fn resolved(&self) -> impl Iterator<Item = &PermitSegment> {
        self.segments.iter().filter(|segment| segment.midpoint.is_some())
    }
}

/// Midpoint of the intersections `from` and `to`, or `None` if either is
/// absent from the catalog.
#[must_use]
pub fn intersection_midpoint(
    catalog: &IntersectionCatalog,
    from: &StreetPair,
    to: &StreetPair,
) -> Option<Point<f64>> {
    let start = catalog.lookup_pair(from)?;
    let end = catalog.lookup_pair(to)?;
    MultiPoint::new(vec![start, end]).centroid()
}

/// Parses every clause of a permit.
///
/// Returns `None` for single-clause permits, which are excluded from
/// geocoding.
#[must_use]
pub fn parse_permit_clauses(permit: &PermitRecord) -> Option<Vec<(String, LocationParse)>> {
    let clauses = clauses::split_clauses(&permit.parking_description);
    if clauses.len() <= 1 {
        return None;
    }
    Some(
        clauses
            .into_iter()
            .map(|clause| {
                let parsed = parse_location(&clause);
                (clause, parsed)
            })
            .collect(),
    )
}

/// Builds the segment for one parsed clause of `permit`.
#[must_use]
pub fn resolve_segment(
    permit: &PermitRecord,
    clause: String,
    location: &ParkingLocation,
    catalog: &IntersectionCatalog,
) -> PermitSegment {
    let from_intersection = location.from_intersection();
    let to_intersection = location.to_intersection();
    let midpoint = intersection_midpoint(catalog, &from_intersection, &to_intersection);

    PermitSegment {
        permit_id: permit.id.clone(),
        start: permit.start,
        end: permit.end,
        borough: permit.borough.clone(),
        location_text: clause,
        from_intersection,
        to_intersection,
        midpoint,
    }
}

/// Resolves every permit into located segments.
#[must_use]
pub fn resolve_permits(permits: &[PermitRecord], catalog: &IntersectionCatalog) -> Resolution {
    let mut resolution = Resolution::default();

    for permit in permits {
        resolution.stats.permits += 1;

        let Some(clauses) = parse_permit_clauses(permit) else {
            resolution.stats.single_clause += 1;
            continue;
        };

        for (clause, parsed) in clauses {
            resolution.stats.clauses += 1;
            match parsed {
                LocationParse::Parsed(location) => {
                    let segment = resolve_segment(permit, clause, &location, catalog);
                    if segment.midpoint.is_some() {
                        resolution.stats.resolved += 1;
                    } else {
                        log::debug!(
                            "Permit {}: no intersection for {:?}",
                            segment.permit_id,
                            segment.location_text
                        );
                        resolution.stats.unresolved += 1;
                    }
                    resolution.segments.push(segment);
                }
                LocationParse::Malformed(reason) => {
                    log::debug!("Permit {}: {reason} in {clause:?}", permit.id);
                    *resolution.stats.malformed.entry(reason).or_default() += 1;
                }
            }
        }
    }

    let stats = &resolution.stats;
    log::info!(
        "Resolved {} of {} permit clauses ({} unresolved, {} malformed, {} single-clause permits skipped)",
        stats.resolved,
        stats.clauses,
        stats.unresolved,
        stats.malformed_total(),
        stats.single_clause
    );

    resolution
}
