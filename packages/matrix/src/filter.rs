//! Complaint selection by agency and complaint type.
//!
//! Only complaints routed to street-facing agencies are of interest, and
//! a handful of complaint types unrelated to street occupancy are left
//! out. Matching is exact and case-sensitive, like the Socrata query the
//! exports are pulled with.

use block_activity_models::ComplaintRecord;

/// Agencies whose complaints are kept by default.
pub const DEFAULT_AGENCIES: [&str; 3] = ["NYPD", "DOT", "DSNY"];

/// Complaint types dropped by default.
pub const DEFAULT_EXCLUDED_TYPES: [&str; 5] = [
    "Encampment",
    "Panhandling",
    "Bike/Roller/Skate Chronic",
    "Snow or Ice",
    "Drug Activity",
];

/// Which complaints take part in the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintFilter {
    /// Agencies to keep. Empty keeps every agency.
    pub agencies: Vec<String>,
    /// Complaint types to drop.
    pub excluded_types: Vec<String>,
}

impl Default for ComplaintFilter {
    fn default() -> Self {
        Self {
            agencies: DEFAULT_AGENCIES.iter().map(ToString::to_string).collect(),
            excluded_types: DEFAULT_EXCLUDED_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Complaints that passed a [`ComplaintFilter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selected<'a> {
    /// Complaints kept, in input order.
    pub complaints: Vec<&'a ComplaintRecord>,
    /// Complaints dropped by agency or type.
    pub filtered: u64,
}

impl ComplaintFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self {
            agencies: Vec::new(),
            excluded_types: Vec::new(),
        }
    }

    /// Whether `complaint` is kept.
    ///
    /// With an agency list, a complaint without an agency is dropped. A
    /// complaint without a type is never dropped for its type.
    #[must_use]
    pub fn accepts(&self, complaint: &ComplaintRecord) -> bool {
        let agency_kept = self.agencies.is_empty()
            || complaint
                .agency
                .as_deref()
                .is_some_and(|agency| self.agencies.iter().any(|a| a == agency));
        let type_kept = complaint
            .complaint_type
            .as_deref()
            .is_none_or(|kind| !self.excluded_types.iter().any(|t| t == kind));
        agency_kept && type_kept
    }

    /// Splits `complaints` into those kept and a count of those dropped.
    #[must_use]
    pub fn select<'a>(&self, complaints: &'a [ComplaintRecord]) -> Selected<'a> {
        let kept: Vec<&ComplaintRecord> = complaints.iter().filter(|c| self.accepts(c)).collect();
        let filtered = u64::try_from(complaints.len() - kept.len()).unwrap_or(u64::MAX);

        if filtered > 0 {
            log::info!(
                "Filtered out {filtered} of {} complaints by agency or complaint type",
                complaints.len()
            );
        }

        Selected {
            complaints: kept,
            filtered,
        }
    }
}
