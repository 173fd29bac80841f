//! Data-quality counters for one pipeline run.

use serde::Serialize;

/// What a run loaded, dropped, joined, and wrote.
///
/// Nothing in the pipeline fails on bad data. Every record that is
/// filtered out shows up in one of these counters instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Complaints normalized by the loader.
    pub complaints_loaded: u64,
    /// Complaint rows rejected by the loader (missing key, bad timestamp).
    pub complaints_unparseable: u64,
    /// Complaints dropped by the agency and complaint type filter.
    pub complaints_filtered: u64,
    /// Complaints excluded for a missing or invalid location.
    pub complaints_invalid_geometry: u64,

    /// Permits normalized by the loader.
    pub permits_loaded: u64,
    /// Permit rows rejected by the loader (missing id, bad timestamp).
    pub permits_unparseable: u64,
    /// Permits excluded from geocoding for having a single clause.
    pub permits_single_clause: u64,

    /// Clauses matching the location grammar.
    pub segments_parsed: u64,
    /// Clauses not matching the location grammar.
    pub segments_malformed: u64,
    /// Parsed clauses with an intersection missing from the catalog.
    pub segments_unresolved: u64,
    /// Parsed clauses with a midpoint.
    pub segments_resolved: u64,

    /// Parcel polygons excluded from joins for invalid geometry.
    pub parcels_invalid_geometry: u64,
    /// Parcels with no polygon at all. They only appear as zero rows.
    pub parcels_without_geometry: u64,

    /// Permit-day events fed to the spatial join.
    pub permit_day_events: u64,
    /// Complaint events fed to the spatial join.
    pub complaint_events: u64,
    /// (parcel, day) matches from permit-day events.
    pub permit_matches: u64,
    /// (parcel, day) matches from complaint events.
    pub complaint_matches: u64,

    /// Cells in the parcel × day skeleton.
    pub skeleton_cells: u64,
    /// Rows in the final matrix.
    pub output_rows: u64,
    /// Skeleton cells dropped for an incomplete parcel key.
    pub rows_dropped_null_parcel: u64,
    /// Events that fell on those dropped cells.
    pub events_dropped_null_parcel: u64,
}

impl PipelineReport {
    /// Writes the report to the log.
    pub fn log_summary(&self) {
        log::info!(
            "Complaints: {} loaded, {} unparseable, {} filtered, {} without a valid location",
            self.complaints_loaded,
            self.complaints_unparseable,
            self.complaints_filtered,
            self.complaints_invalid_geometry
        );
        log::info!(
            "Permits: {} loaded, {} unparseable, {} single-clause (not geocoded)",
            self.permits_loaded,
            self.permits_unparseable,
            self.permits_single_clause
        );
        log::info!(
            "Segments: {} parsed ({} resolved, {} unresolved), {} malformed",
            self.segments_parsed,
            self.segments_resolved,
            self.segments_unresolved,
            self.segments_malformed
        );
        log::info!(
            "Spatial join: {} permit-day events -> {} matches, {} complaint events -> {} matches",
            self.permit_day_events,
            self.permit_matches,
            self.complaint_events,
            self.complaint_matches
        );
        log::info!(
            "Matrix: {} skeleton cells, {} output rows",
            self.skeleton_cells,
            self.output_rows
        );
        if self.parcels_invalid_geometry > 0 {
            log::warn!(
                "{} parcels had invalid geometry and never matched",
                self.parcels_invalid_geometry
            );
        }
        if self.parcels_without_geometry > 0 {
            log::warn!(
                "{} parcels had no polygon and only appear as zero rows",
                self.parcels_without_geometry
            );
        }
        if self.rows_dropped_null_parcel > 0 {
            log::warn!(
                "{} cells dropped for an incomplete parcel key, losing {} events",
                self.rows_dropped_null_parcel,
                self.events_dropped_null_parcel
            );
        }
    }
}
