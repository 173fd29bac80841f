#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record types shared by the block activity pipeline.
//!
//! Complaints and permits arrive from the extraction collaborator as
//! typed records, parcels and street nodes come from geodata files, and
//! the pipeline emits one [`ParcelDayCell`] per tax block per day. All
//! geometries are in the same planar coordinate reference system
//! (NY State Plane Long Island, EPSG:2263, in feet).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};

/// Errors from constructing model values.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The observation window ends before it starts.
    #[error("Observation window end {end} is before start {start}")]
    InvertedWindow {
        /// First day of the window.
        start: NaiveDate,
        /// Last day of the window.
        end: NaiveDate,
    },
}

/// Tax block identity as read from the parcel dataset.
///
/// Either component may be missing in the source data. Only keys with
/// both components present can be reported; see [`Self::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawParcelKey {
    /// Borough identifier (e.g. `"1"` for Manhattan).
    pub borough: Option<String>,
    /// Block identifier within the borough.
    pub block: Option<String>,
}

impl RawParcelKey {
    /// Creates a key with both components present.
    #[must_use]
    pub fn new(borough: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            borough: Some(borough.into()),
            block: Some(block.into()),
        }
    }

    /// Returns the fully specified key, or `None` when either component
    /// is missing or blank.
    #[must_use]
    pub fn resolve(&self) -> Option<ParcelKey> {
        let borough = self.borough.as_deref().map(str::trim)?;
        let block = self.block.as_deref().map(str::trim)?;
        if borough.is_empty() || block.is_empty() {
            return None;
        }
        Some(ParcelKey {
            borough: borough.to_string(),
            block: block.to_string(),
        })
    }
}

/// A fully specified tax block identity (borough + block).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParcelKey {
    /// Borough identifier.
    pub borough: String,
    /// Block identifier within the borough.
    pub block: String,
}

impl fmt::Display for ParcelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.borough, self.block)
    }
}

/// Closed, inclusive date interval over which activity is aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObservationWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl ObservationWindow {
    /// Creates a window covering `start..=end`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvertedWindow`] if `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ModelError> {
        if end < start {
            return Err(ModelError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day of the window.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window (inclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the window.
    #[must_use]
    pub fn len_days(&self) -> u64 {
        (self.end - self.start).num_days().unsigned_abs() + 1
    }

    /// Every day in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }
}

/// A service complaint as handed over by the extraction collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintRecord {
    /// Source unique key.
    pub id: String,
    /// When the complaint was created (timezone-naive).
    pub created_at: NaiveDateTime,
    /// Agency the complaint was routed to (e.g. `"NYPD"`).
    pub agency: Option<String>,
    /// Complaint type (e.g. `"Noise - Street/Sidewalk"`).
    pub complaint_type: Option<String>,
    /// Planar X coordinate.
    pub x: Option<f64>,
    /// Planar Y coordinate.
    pub y: Option<f64>,
}

impl ComplaintRecord {
    /// Calendar day the complaint was created.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.created_at.date()
    }

    /// The complaint location, if both coordinates are present and form a
    /// valid point.
    #[must_use]
    pub fn point(&self) -> Option<Point<f64>> {
        let point = Point::new(self.x?, self.y?);
        is_valid_point(&point).then_some(point)
    }
}

/// A film production permit as handed over by the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitRecord {
    /// Source event identifier.
    pub id: String,
    /// Start of the permitted activity (timezone-naive).
    pub start: NaiveDateTime,
    /// End of the permitted activity (timezone-naive).
    pub end: NaiveDateTime,
    /// Borough name as written on the permit.
    pub borough: Option<String>,
    /// Free-text "parking held" description, possibly multi-clause.
    pub parking_description: String,
}

/// A street-network node with the names of every street meeting there.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetNode {
    /// Source node identifier.
    pub node_id: String,
    /// Streets incident to the node.
    pub streets: Vec<String>,
    /// Node location.
    pub geometry: Point<f64>,
}

/// A tax block from the parcel dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelPolygon {
    /// Tax block identity, possibly incomplete.
    pub key: RawParcelKey,
    /// Block outline. `None` when the feature carries no polygonal
    /// geometry; the block still gets its skeleton rows but never matches
    /// an event.
    pub geometry: Option<MultiPolygon<f64>>,
}

/// A (parcel, day) coordinate in the block × day matrix, before the
/// parcel key is known to be complete.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParcelDay {
    /// Tax block identity, possibly incomplete.
    pub parcel: RawParcelKey,
    /// Calendar day.
    pub date: NaiveDate,
}

/// A point event tagged with the calendar day it applies to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedPoint {
    /// Day of the event.
    pub date: NaiveDate,
    /// Event location.
    pub point: Point<f64>,
}

/// One cell of the final block × day matrix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParcelDayCell {
    /// Tax block identity.
    pub key: ParcelKey,
    /// Calendar day.
    pub date: NaiveDate,
    /// Number of permitted filming occupancies touching the block that day.
    pub permits: u64,
    /// Number of complaints touching the block that day.
    pub cases: u64,
}

/// Whether a point has finite coordinates.
#[must_use]
pub fn is_valid_point(point: &Point<f64>) -> bool {
    point.x().is_finite() && point.y().is_finite()
}
