//! Dense matrix assembly.
//!
//! Left-joins the permit and complaint counts onto the parcel × day
//! skeleton. Skeleton cells without a count get zero. Cells whose parcel
//! key is incomplete are dropped, and what they carried is tallied so the
//! loss is visible in the run report.

use std::collections::BTreeMap;

use block_activity_models::{ParcelDay, ParcelDayCell, ParcelKey};
use block_activity_spatial::DayCounts;
use chrono::NaiveDate;

/// Output of [`assemble`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    /// One cell per (complete parcel key, day), sorted by key then day.
    pub cells: Vec<ParcelDayCell>,
    /// Skeleton cells dropped for an incomplete parcel key.
    pub dropped_rows: u64,
    /// Permit and complaint events that fell on dropped cells.
    pub dropped_events: u64,
}

/// Builds the dense matrix from the skeleton and the two count series.
///
/// Counts for (parcel, day) pairs outside the skeleton are ignored. Raw
/// keys that resolve to the same parcel key are merged into one cell.
#[must_use]
pub fn assemble(skeleton: &[ParcelDay], permits: &DayCounts, cases: &DayCounts) -> Assembly {
    let mut merged: BTreeMap<(ParcelKey, NaiveDate), (u64, u64)> = BTreeMap::new();
    let mut dropped_rows = 0;
    let mut dropped_events = 0;

    for cell in skeleton {
        let permit_count = permits.get(cell).copied().unwrap_or(0);
        let case_count = cases.get(cell).copied().unwrap_or(0);

        let Some(key) = cell.parcel.resolve() else {
            dropped_rows += 1;
            dropped_events += permit_count + case_count;
            continue;
        };

        let entry = merged.entry((key, cell.date)).or_default();
        entry.0 += permit_count;
        entry.1 += case_count;
    }

    if dropped_rows > 0 {
        log::warn!(
            "Dropped {dropped_rows} cells with an incomplete parcel key \
             ({dropped_events} events lost)"
        );
    }

    let cells = merged
        .into_iter()
        .map(|((key, date), (permits, cases))| ParcelDayCell {
            key,
            date,
            permits,
            cases,
        })
        .collect();

    Assembly {
        cells,
        dropped_rows,
        dropped_events,
    }
}
