//! Day expansion.
//!
//! Permits become one event per calendar day they are active, complaints
//! become one event on the day they were created, and the parcel set
//! becomes the parcel × day skeleton over the observation window.

use block_activity_models::{
    ComplaintRecord, DatedPoint, ObservationWindow, ParcelDay, RawParcelKey,
};
use block_activity_permits::PermitSegment;
use chrono::{NaiveDate, NaiveDateTime};

/// Every calendar day from `start` to `end`, both inclusive, at day
/// resolution. Yields nothing if `end` falls on a day before `start`.
pub fn expand_days(start: NaiveDateTime, end: NaiveDateTime) -> impl Iterator<Item = NaiveDate> {
    let last = end.date();
    start.date().iter_days().take_while(move |day| *day <= last)
}

/// One event per (located segment, active day).
///
/// Segments without a midpoint cannot be placed and are skipped.
#[must_use]
pub fn permit_day_points<'a>(
    segments: impl IntoIterator<Item = &'a PermitSegment>,
) -> Vec<DatedPoint> {
    segments
        .into_iter()
        .filter_map(|segment| segment.midpoint.map(|point| (segment, point)))
        .flat_map(|(segment, point)| {
            expand_days(segment.start, segment.end).map(move |date| DatedPoint { date, point })
        })
        .collect()
}

/// Complaint events with valid locations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintPoints {
    /// One event per located complaint.
    pub points: Vec<DatedPoint>,
    /// Complaints dropped for a missing or non-finite location.
    pub invalid: u64,
}

/// Tags each complaint with its creation day, dropping those without a
/// valid point.
#[must_use]
pub fn complaint_points<'a>(
    complaints: impl IntoIterator<Item = &'a ComplaintRecord>,
) -> ComplaintPoints {
    let mut result = ComplaintPoints::default();
    let mut total = 0usize;

    for complaint in complaints {
        total += 1;
        match complaint.point() {
            Some(point) => result.points.push(DatedPoint {
                date: complaint.date(),
                point,
            }),
            None => result.invalid += 1,
        }
    }

    if result.invalid > 0 {
        log::warn!(
            "Excluded {} of {} complaints with missing or invalid coordinates",
            result.invalid,
            total
        );
    }

    result
}

/// The full cross product of `keys` and the days of `window`.
///
/// Each distinct key yields exactly one cell per day. Incomplete keys are
/// kept here and dropped at assembly.
#[must_use]
pub fn build_skeleton<'a>(
    keys: impl IntoIterator<Item = &'a RawParcelKey>,
    window: &ObservationWindow,
) -> Vec<ParcelDay> {
    let keys: std::collections::BTreeSet<&RawParcelKey> = keys.into_iter().collect();
    let days: Vec<NaiveDate> = window.days().collect();

    let mut skeleton = Vec::with_capacity(keys.len() * days.len());
    for key in keys {
        for date in &days {
            skeleton.push(ParcelDay {
                parcel: key.clone(),
                date: *date,
            });
        }
    }
    skeleton
}
