//! Raw Socrata rows and their normalization into typed records.

use block_activity_models::{ComplaintRecord, PermitRecord};
use serde::Deserialize;

use crate::parsing::{deserialize_text, non_blank, parse_coordinate, parse_socrata_timestamp};

/// A 311 service request row as exported by Socrata.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawComplaint {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub unique_key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub created_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub complaint_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub x_coordinate_state_plane: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub y_coordinate_state_plane: Option<String>,
}

impl RawComplaint {
    /// Converts the row into a [`ComplaintRecord`].
    ///
    /// Returns `None` if the key is missing or the creation timestamp
    /// cannot be parsed. Missing coordinates are kept as `None`.
    #[must_use]
    pub fn normalize(self) -> Option<ComplaintRecord> {
        let id = non_blank(self.unique_key)?;
        let created_at = self.created_date.as_deref().and_then(parse_socrata_timestamp)?;

        Some(ComplaintRecord {
            id,
            created_at,
            agency: non_blank(self.agency),
            complaint_type: non_blank(self.complaint_type),
            x: parse_coordinate(self.x_coordinate_state_plane.as_deref()),
            y: parse_coordinate(self.y_coordinate_state_plane.as_deref()),
        })
    }
}

/// A film permit row as exported by Socrata.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawPermit {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub eventid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub startdatetime: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub enddatetime: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub borough: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub parkingheld: Option<String>,
}

impl RawPermit {
    /// Converts the row into a [`PermitRecord`].
    ///
    /// Returns `None` if the id is missing or either timestamp cannot be
    /// parsed. A missing parking description becomes an empty string.
    #[must_use]
    pub fn normalize(self) -> Option<PermitRecord> {
        let id = non_blank(self.eventid)?;
        let start = self.startdatetime.as_deref().and_then(parse_socrata_timestamp)?;
        let end = self.enddatetime.as_deref().and_then(parse_socrata_timestamp)?;

        Some(PermitRecord {
            id,
            start,
            end,
            borough: non_blank(self.borough),
            parking_description: self.parkingheld.unwrap_or_default(),
        })
    }
}
