//! Pipeline driver.
//!
//! Stages run one after another, each fully materializing its output
//! before the next starts. The intersection catalog and parcel index are
//! built once and only borrowed afterwards.

use std::path::Path;

use block_activity_intersections::IntersectionCatalog;
use block_activity_models::{
    ComplaintRecord, ObservationWindow, ParcelDayCell, PermitRecord,
};
use block_activity_permits::resolve_permits;
use block_activity_source::RecordLoader;
use block_activity_spatial::ParcelIndex;
use block_activity_spatial::parcels::{ParcelFields, load_parcels};

use crate::assemble::assemble;
use crate::filter::ComplaintFilter;
use crate::progress::ProgressCallback;
use crate::sink::TabularSink;
use crate::temporal::{build_skeleton, complaint_points, permit_day_points};
use crate::{PipelineConfig, PipelineError, PipelineReport};

/// Progress steps reported by [`build_matrix`].
pub const MATRIX_STEPS: u64 = 5;

/// Progress steps reported by [`run`], including [`MATRIX_STEPS`].
pub const RUN_STEPS: u64 = MATRIX_STEPS + 5;

/// Everything the in-memory core needs.
pub struct MatrixInputs<'a> {
    /// Normalized complaints, before filtering.
    pub complaints: &'a [ComplaintRecord],
    /// Which complaints take part.
    pub complaint_filter: &'a ComplaintFilter,
    /// Normalized permits.
    pub permits: &'a [PermitRecord],
    /// Street pair to intersection lookup.
    pub catalog: &'a IntersectionCatalog,
    /// Tax block polygons.
    pub parcels: &'a ParcelIndex,
    /// Days covered by the matrix.
    pub window: ObservationWindow,
    /// Positional uncertainty radius, in planar units.
    pub buffer_radius: f64,
}

/// The finished matrix and how it was reached.
#[derive(Debug, Clone, Default)]
pub struct MatrixOutput {
    /// One cell per (complete parcel key, day), sorted.
    pub cells: Vec<ParcelDayCell>,
    /// Counters from every stage. Loader counters are left at zero.
    pub report: PipelineReport,
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Builds the block × day matrix from already loaded inputs.
///
/// Advances `progress` by [`MATRIX_STEPS`] but never sets its total or
/// finishes it.
#[must_use]
pub fn build_matrix(inputs: &MatrixInputs<'_>, progress: &dyn ProgressCallback) -> MatrixOutput {
    let mut report = PipelineReport {
        parcels_invalid_geometry: to_u64(inputs.parcels.invalid()),
        parcels_without_geometry: to_u64(inputs.parcels.without_geometry()),
        ..PipelineReport::default()
    };

    progress.set_message("Resolving permit locations".to_string());
    let resolution = resolve_permits(inputs.permits, inputs.catalog);
    let stats = &resolution.stats;
    report.permits_single_clause = stats.single_clause;
    report.segments_parsed = stats.resolved + stats.unresolved;
    report.segments_malformed = stats.malformed_total();
    report.segments_unresolved = stats.unresolved;
    report.segments_resolved = stats.resolved;
    progress.inc(1);

    progress.set_message("Expanding events by day".to_string());
    let permit_points = permit_day_points(resolution.resolved());
    let selected = inputs.complaint_filter.select(inputs.complaints);
    report.complaints_filtered = selected.filtered;
    let complaints = complaint_points(selected.complaints);
    report.permit_day_events = to_u64(permit_points.len());
    report.complaint_events = to_u64(complaints.points.len());
    report.complaints_invalid_geometry = complaints.invalid;
    progress.inc(1);

    progress.set_message("Joining permits to tax blocks".to_string());
    let permit_counts = inputs
        .parcels
        .count_by_parcel_day(&permit_points, inputs.buffer_radius);
    report.permit_matches = permit_counts.values().sum();
    progress.inc(1);

    progress.set_message("Joining complaints to tax blocks".to_string());
    let case_counts = inputs
        .parcels
        .count_by_parcel_day(&complaints.points, inputs.buffer_radius);
    report.complaint_matches = case_counts.values().sum();
    progress.inc(1);

    progress.set_message("Assembling matrix".to_string());
    let skeleton = build_skeleton(inputs.parcels.keys(), &inputs.window);
    report.skeleton_cells = to_u64(skeleton.len());
    let assembly = assemble(&skeleton, &permit_counts, &case_counts);
    report.output_rows = to_u64(assembly.cells.len());
    report.rows_dropped_null_parcel = assembly.dropped_rows;
    report.events_dropped_null_parcel = assembly.dropped_events;
    progress.inc(1);

    log::info!(
        "Assembled {} rows over {} days for {} tax blocks",
        assembly.cells.len(),
        inputs.window.len_days(),
        inputs.parcels.keys().len()
    );

    MatrixOutput {
        cells: assembly.cells,
        report,
    }
}

fn require(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::FileNotFound(path.display().to_string()))
    }
}

/// Loads the intersection catalog from its cache, rebuilding it from the
/// street nodes when `config.refresh` is set or no cache exists.
///
/// # Errors
///
/// Returns [`PipelineError`] if the cache or node file cannot be read,
/// parsed, or written.
pub fn load_catalog(config: &PipelineConfig) -> Result<IntersectionCatalog, PipelineError> {
    Ok(block_activity_intersections::load_or_build(
        &config.intersection_cache_file(),
        &config.street_nodes_file(),
        config.refresh,
    )?)
}

/// Runs the whole pipeline: load, build, write.
///
/// Every required file is checked before any transformation starts.
///
/// # Errors
///
/// Returns [`PipelineError`] if the configuration is invalid, an input is
/// missing or unreadable, or the output cannot be written. Data-quality
/// problems never fail a run; they are counted in the returned report.
pub fn run(
    config: &PipelineConfig,
    loader: &dyn RecordLoader,
    sink: &mut dyn TabularSink,
    progress: &dyn ProgressCallback,
) -> Result<PipelineReport, PipelineError> {
    let window = config.validate()?;
    let complaint_filter = config.complaint_filter();

    let parcels_path = config.parcels_file();
    require(&parcels_path)?;
    if config.refresh || !config.intersection_cache_file().exists() {
        require(&config.street_nodes_file())?;
    }

    log::info!(
        "Building block activity matrix for {} to {}",
        window.start(),
        window.end()
    );
    progress.set_total(RUN_STEPS);

    progress.set_message("Loading complaints".to_string());
    let complaints = loader.load_complaints()?;
    progress.inc(1);

    progress.set_message("Loading permits".to_string());
    let permits = loader.load_permits()?;
    progress.inc(1);

    progress.set_message("Loading intersection catalog".to_string());
    let catalog = load_catalog(config)?;
    progress.inc(1);

    progress.set_message("Loading tax blocks".to_string());
    let parcels = load_parcels(
        &parcels_path,
        ParcelFields {
            borough: &config.parcel_borough_field,
            block: &config.parcel_block_field,
        },
    )?;
    let index = ParcelIndex::new(parcels);
    progress.inc(1);

    let MatrixOutput { cells, mut report } = build_matrix(
        &MatrixInputs {
            complaints: &complaints.records,
            complaint_filter: &complaint_filter,
            permits: &permits.records,
            catalog: &catalog,
            parcels: &index,
            window,
            buffer_radius: config.buffer_radius,
        },
        progress,
    );
    report.complaints_loaded = to_u64(complaints.records.len());
    report.complaints_unparseable = complaints.rejected;
    report.permits_loaded = to_u64(permits.records.len());
    report.permits_unparseable = permits.rejected;

    progress.set_message("Writing matrix".to_string());
    sink.write(&cells)?;
    progress.inc(1);

    progress.finish(format!("Wrote {} rows", cells.len()));
    report.log_summary();

    Ok(report)
}
