use super::model::{DataError, Dataset, Entry};

// ---------------------------------------------------------------------------
// Filter criteria: optional equality predicate per column
// ---------------------------------------------------------------------------

/// Equality criteria over the filterable columns.
/// A `None` field means "no constraint" on that column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterCriteria {
    pub year: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl FilterCriteria {
    /// Whether an entry satisfies every supplied criterion.
    ///
    /// Coordinates use exact floating-point equality: a near-miss such as
    /// `10.000001` does not match `10.0`.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.year.map_or(true, |y| entry.year == y)
            && self.latitude.map_or(true, |lat| entry.latitude == lat)
            && self.longitude.map_or(true, |long| entry.longitude == long)
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.latitude.is_none() && self.longitude.is_none()
    }
}

/// Return positions of entries that pass all criteria, in positional order.
pub fn filtered_indices(dataset: &Dataset, criteria: &FilterCriteria) -> Vec<usize> {
    dataset
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, e)| criteria.matches(e))
        .map(|(i, _)| i)
        .collect()
}

/// Return copies of the matching entries, or `NoMatch` if none survive.
pub fn filter_entries(
    dataset: &Dataset,
    criteria: &FilterCriteria,
) -> Result<Vec<Entry>, DataError> {
    let entries = dataset.entries();
    let matched: Vec<Entry> = filtered_indices(dataset, criteria)
        .into_iter()
        .map(|i| entries[i])
        .collect();
    if matched.is_empty() {
        return Err(DataError::NoMatch);
    }
    Ok(matched)
}
