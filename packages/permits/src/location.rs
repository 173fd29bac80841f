//! Parser for "MAIN between SIDE_A and SIDE_B" parking clauses.
//!
//! The grammar is fixed: exactly one `between` token separating the main
//! street from the side streets, and exactly one `and` token separating
//! the two side streets. Anything else is reported as
//! [`LocationParse::Malformed`].
//!
//! Tokens match whole words only, which is stricter than splitting on the
//! raw substrings: "Broadway between Grand St and Canal St" parses here,
//! whereas a substring split would also cut at the "and" inside "Grand"
//! and reject the clause as having two `and` tokens.

use std::sync::LazyLock;

use block_activity_intersections::StreetPair;
use regex::Regex;
use strum_macros::{AsRefStr, Display};

static BETWEEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbetween\b").expect("valid regex"));

static AND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\band\b").expect("valid regex"));

/// Why a clause did not match the location grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MalformedReason {
    /// No `between` token.
    MissingBetween,
    /// More than one `between` token.
    RepeatedBetween,
    /// No `and` token after `between`.
    MissingAnd,
    /// More than one `and` token after `between`.
    RepeatedAnd,
    /// One of the three street names is blank.
    EmptyStreet,
}

/// A parking clause split into its three street names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingLocation {
    /// Street the parking is held on.
    pub main_street: String,
    /// Cross street at one end of the held block.
    pub side_a: String,
    /// Cross street at the other end of the held block.
    pub side_b: String,
}

impl ParkingLocation {
    /// `(main_street, side_a)`.
    #[must_use]
    #[allow(clippy::wrong_self_convention)]
    pub fn from_intersection(&self) -> StreetPair {
        StreetPair::new(self.main_street.clone(), self.side_a.clone())
    }

    /// `(main_street, side_b)`.
    #[must_use]
    pub fn to_intersection(&self) -> StreetPair {
        StreetPair::new(self.main_street.clone(), self.side_b.clone())
    }
}

/// Result of parsing one parking clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationParse {
    /// The clause matched the grammar.
    Parsed(ParkingLocation),
    /// The clause did not match.
    Malformed(MalformedReason),
}

/// Parses a single parking clause.
#[must_use]
pub fn parse_location(clause: &str) -> LocationParse {
    let (main_street, remainder) = match split_on_single(&BETWEEN_RE, clause) {
        Ok(parts) => parts,
        Err(Separator::Missing) => {
            return LocationParse::Malformed(MalformedReason::MissingBetween);
        }
        Err(Separator::Repeated) => {
            return LocationParse::Malformed(MalformedReason::RepeatedBetween);
        }
    };

    let (side_a, side_b) = match split_on_single(&AND_RE, remainder) {
        Ok(parts) => parts,
        Err(Separator::Missing) => return LocationParse::Malformed(MalformedReason::MissingAnd),
        Err(Separator::Repeated) => return LocationParse::Malformed(MalformedReason::RepeatedAnd),
    };

    let (main_street, side_a, side_b) = (main_street.trim(), side_a.trim(), side_b.trim());
    if main_street.is_empty() || side_a.is_empty() || side_b.is_empty() {
        return LocationParse::Malformed(MalformedReason::EmptyStreet);
    }

    LocationParse::Parsed(ParkingLocation {
        main_street: main_street.to_string(),
        side_a: side_a.to_string(),
        side_b: side_b.to_string(),
    })
}

enum Separator {
    Missing,
    Repeated,
}

fn split_on_single<'a>(
    separator: &Regex,
    text: &'a str,
) -> Result<(&'a str, &'a str), Separator> {
    let mut matches = separator.find_iter(text);
    let Some(found) = matches.next() else {
        return Err(Separator::Missing);
    };
    if matches.next().is_some() {
        return Err(Separator::Repeated);
    }
    Ok((&text[..found.start()], &text[found.end()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(clause: &str) -> ParkingLocation {
        match parse_location(clause) {
            LocationParse::Parsed(location) => location,
            LocationParse::Malformed(reason) => panic!("{clause:?} was malformed: {reason}"),
        }
    }

    #[test]
    fn parses_between_and_clause() {
        let location = parsed("Main St between 1st Ave and 2nd Ave");
        assert_eq!(location.from_intersection(), StreetPair::new("Main St", "1st Ave"));
        assert_eq!(location.to_intersection(), StreetPair::new("Main St", "2nd Ave"));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let location = parsed("  WEST 44 STREET   between 6 AVENUE and   7 AVENUE ");
        assert_eq!(location.main_street, "WEST 44 STREET");
        assert_eq!(location.side_a, "6 AVENUE");
        assert_eq!(location.side_b, "7 AVENUE");
    }

    #[test]
    fn embedded_tokens_do_not_split() {
        let location = parsed("Standard Pl between Sandy Ln and Andover St");
        assert_eq!(location.main_street, "Standard Pl");
        assert_eq!(location.side_a, "Sandy Ln");
        assert_eq!(location.side_b, "Andover St");

        let location = parsed("Grand St between Sandford Ave and Island Rd");
        assert_eq!(location.side_a, "Sandford Ave");
        assert_eq!(location.side_b, "Island Rd");

        let location = parsed("Broadway between Grand St and Canal St");
        assert_eq!(location.main_street, "Broadway");
        assert_eq!(location.side_a, "Grand St");
        assert_eq!(location.side_b, "Canal St");
    }

    #[test]
    fn reports_malformed_clauses() {
        assert_eq!(
            parse_location("Main St from 1st Ave to 2nd Ave"),
            LocationParse::Malformed(MalformedReason::MissingBetween)
        );
        assert_eq!(
            parse_location("Main St between 1st Ave between 2nd Ave and 3rd Ave"),
            LocationParse::Malformed(MalformedReason::RepeatedBetween)
        );
        assert_eq!(
            parse_location("Main St between 1st Ave"),
            LocationParse::Malformed(MalformedReason::MissingAnd)
        );
        assert_eq!(
            parse_location("Main St between 1st Ave and 2nd Ave and 3rd Ave"),
            LocationParse::Malformed(MalformedReason::RepeatedAnd)
        );
        assert_eq!(
            parse_location("between 1st Ave and 2nd Ave"),
            LocationParse::Malformed(MalformedReason::EmptyStreet)
        );
    }

    #[test]
    fn reason_labels_are_snake_case() {
        assert_eq!(MalformedReason::MissingBetween.as_ref(), "missing_between");
        assert_eq!(MalformedReason::EmptyStreet.to_string(), "empty_street");
    }
}
