//! Grid locations such as `A3`.
//!
//! A [`Location`] is a column letter followed by a one-based row number.
//! Locations serialize as their label so plots stored as JSON read like
//! `{"A1": {...}, "B3": {...}}`.

use serde::{Deserialize, Serialize};

use crate::error::FarmError;

/// Maximum number of columns a grid can have (`A` through `Z`).
pub const MAX_COLUMNS: u8 = 26;

/// A cell coordinate on a plot grid.
///
/// Ordering is column first (`A1 < A2 < B1`), which is the order a
/// `BTreeMap` of cells iterates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    /// Zero-based column index (`A` is 0).
    pub column: u8,
    /// One-based row number.
    pub row: u32,
}

impl Location {
    /// Build a location from a zero-based column and a one-based row.
    ///
    /// Returns `None` when the column is past `Z` or the row is zero.
    pub const fn new(column: u8, row: u32) -> Option<Self> {
        if column >= MAX_COLUMNS || row == 0 {
            return None;
        }
        Some(Self { column, row })
    }

    /// Parse a label such as `"A3"` or `"c12"`. Surrounding whitespace is
    /// ignored and the column letter is case-insensitive.
    pub fn parse(raw: &str) -> Result<Self, FarmError> {
        let label = raw.trim();
        let invalid = || FarmError::InvalidLocation(raw.to_owned());

        let mut chars = label.chars();
        let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
        if !letter.is_ascii_uppercase() {
            return Err(invalid());
        }
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let column = u8::try_from(letter)
            .ok()
            .and_then(|byte| byte.checked_sub(b'A'))
            .ok_or_else(invalid)?;
        let row = digits.parse::<u32>().map_err(|_parse| invalid())?;

        Self::new(column, row).ok_or_else(invalid)
    }

    /// The column letter (`'A'` for column 0).
    pub fn column_letter(self) -> char {
        b'A'.checked_add(self.column).map_or('?', char::from)
    }

    /// Whether the location fits inside a grid of the given size.
    pub const fn within(self, columns: u8, rows: u32) -> bool {
        self.column < columns && self.row <= rows
    }

    /// Check that the location fits inside a grid of the given size.
    pub const fn ensure_within(self, columns: u8, rows: u32) -> Result<Self, FarmError> {
        if self.within(columns, rows) {
            Ok(self)
        } else {
            Err(FarmError::LocationOutOfBounds {
                location: self,
                columns,
                rows,
            })
        }
    }

    /// Every location of a `columns` x `rows` grid, column by column.
    pub fn grid(columns: u8, rows: u32) -> impl Iterator<Item = Self> {
        let columns = columns.min(MAX_COLUMNS);
        (0..columns).flat_map(move |column| (1..=rows).map(move |row| Self { column, row }))
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.column_letter(), self.row)
    }
}

impl core::str::FromStr for Location {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = FarmError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels() {
        let a3 = Location::parse("A3").ok();
        assert_eq!(a3, Location::new(0, 3));

        let c12 = Location::parse(" c12 ").ok();
        assert_eq!(c12, Location::new(2, 12));
        assert_eq!(c12.map(|l| l.to_string()).as_deref(), Some("C12"));
    }

    #[test]
    fn rejects_bad_labels() {
        for raw in ["", "A", "3A", "A0", "A-1", "AA1", "1", "Ä1", "A1.5"] {
            assert!(Location::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn bounds_check() {
        let e5 = Location::new(4, 5).unwrap_or(Location { column: 0, row: 1 });
        assert!(e5.within(5, 5));
        assert!(!e5.within(4, 5));
        assert!(!e5.within(5, 4));
        assert!(matches!(
            e5.ensure_within(3, 3),
            Err(FarmError::LocationOutOfBounds { .. })
        ));
    }

    #[test]
    fn grid_covers_every_cell_once() {
        let cells: Vec<Location> = Location::grid(3, 2).collect();
        assert_eq!(cells.len(), 6);
        let labels: Vec<String> = cells.iter().map(ToString::to_string).collect();
        assert_eq!(labels, ["A1", "A2", "B1", "B2", "C1", "C2"]);
    }

    #[test]
    fn serializes_as_label_and_works_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        if let Some(b2) = Location::new(1, 2) {
            map.insert(b2, 7_u32);
        }
        let json = serde_json::to_string(&map).unwrap_or_default();
        assert_eq!(json, r#"{"B2":7}"#);

        let back: Result<std::collections::BTreeMap<Location, u32>, _> =
            serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(map));
    }
}
