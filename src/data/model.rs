use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const COL_YEAR: &str = "Year";
pub const COL_LATITUDE: &str = "Latitude";
pub const COL_LONGITUDE: &str = "Longitude";
pub const COL_PM25: &str = "PM25";

/// Legacy spelling of the PM2.5 column, accepted on load only.
pub const COL_PM25_LEGACY: &str = "PM2.5";

/// Canonical column order used by every on-disk format.
pub const COLUMNS: [&str; 4] = [COL_YEAR, COL_LATITUDE, COL_LONGITUDE, COL_PM25];

// ---------------------------------------------------------------------------
// Entry – one row of the table
// ---------------------------------------------------------------------------

/// A single air-quality observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "Year")]
    pub year: i64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "PM25")]
    pub pm25: f64,
}

impl Entry {
    pub fn new(year: i64, latitude: f64, longitude: f64, pm25: f64) -> Self {
        Self {
            year,
            latitude,
            longitude,
            pm25,
        }
    }
}

// ---------------------------------------------------------------------------
// DataError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("position {position} out of range for dataset of {len} entries")]
    PositionOutOfRange { position: i64, len: usize },
    #[error("no entries match the given criteria")]
    NoMatch,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full table, addressed by zero-based position.
///
/// Positions are not stable identifiers: deleting an entry shifts every
/// later entry down by one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    entries: Vec<Entry>,
}

impl Dataset {
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in positional order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Map a signed position onto a valid index, if it is in range.
    fn index(&self, position: i64) -> Result<usize, DataError> {
        usize::try_from(position)
            .ok()
            .filter(|&i| i < self.entries.len())
            .ok_or(DataError::PositionOutOfRange {
                position,
                len: self.entries.len(),
            })
    }

    pub fn get(&self, position: i64) -> Result<&Entry, DataError> {
        let i = self.index(position)?;
        Ok(&self.entries[i])
    }

    /// Append at the end; returns the new entry's position.
    pub fn append(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Overwrite in place; returns the previous value.
    pub fn update_at(&mut self, position: i64, entry: Entry) -> Result<Entry, DataError> {
        let i = self.index(position)?;
        Ok(std::mem::replace(&mut self.entries[i], entry))
    }

    /// Remove and re-compact; returns the removed value.
    pub fn delete_at(&mut self, position: i64) -> Result<Entry, DataError> {
        let i = self.index(position)?;
        Ok(self.entries.remove(i))
    }

    /// Undo an `append`.
    pub(crate) fn pop(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    /// Undo a `delete_at`. `index` must be `<= len`.
    pub(crate) fn insert(&mut self, index: usize, entry: Entry) {
        self.entries.insert(index, entry);
    }
}
