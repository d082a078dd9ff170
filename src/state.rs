use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;

use crate::config::Config;
use crate::data::filter::{FilterCriteria, filter_entries};
use crate::data::loader;
use crate::data::model::{Dataset, Entry};
use crate::data::stats::{Pm25Stats, pm25_stats};
use crate::error::{ApiError, ApiResult};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

pub type SharedState = Arc<AppState>;

/// The single owned dataset plus where (if anywhere) to persist it.
///
/// Every operation holds the lock for its whole duration, so mutations are
/// serialized and a reader never observes a half-applied write. When a
/// persisted rewrite fails, the in-memory change is rolled back before the
/// lock is released.
pub struct AppState {
    dataset: Mutex<Dataset>,
    storage: Option<PathBuf>,
}

impl AppState {
    pub fn new(dataset: Dataset, storage: Option<PathBuf>) -> Self {
        Self {
            dataset: Mutex::new(dataset),
            storage,
        }
    }

    /// Load the configured dataset; the server cannot start without it.
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let dataset = loader::load_file(&config.data_path).context("loading startup dataset")?;
        let storage = config.persist.then(|| config.data_path.clone());
        Ok(Self::new(dataset, storage))
    }

    pub fn storage(&self) -> Option<&Path> {
        self.storage.as_deref()
    }

    pub(crate) fn lock(&self) -> ApiResult<MutexGuard<'_, Dataset>> {
        self.dataset
            .lock()
            .map_err(|_| ApiError::internal("dataset lock poisoned"))
    }

    fn persist(&self, dataset: &Dataset) -> anyhow::Result<()> {
        match &self.storage {
            Some(path) => loader::save_file(path, dataset),
            None => Ok(()),
        }
    }

    // -- reads --

    pub fn len(&self) -> ApiResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn all(&self) -> ApiResult<Vec<Entry>> {
        Ok(self.lock()?.entries().to_vec())
    }

    pub fn get(&self, position: i64) -> ApiResult<Entry> {
        Ok(*self.lock()?.get(position)?)
    }

    pub fn filter(&self, criteria: &FilterCriteria) -> ApiResult<Vec<Entry>> {
        let dataset = self.lock()?;
        Ok(filter_entries(&dataset, criteria)?)
    }

    pub fn stats(&self) -> ApiResult<Pm25Stats> {
        let dataset = self.lock()?;
        Ok(pm25_stats(&dataset))
    }

    // -- writes --

    /// Append and persist; returns the new entry's position.
    pub fn append(&self, entry: Entry) -> ApiResult<usize> {
        let mut dataset = self.lock()?;
        let position = dataset.append(entry);
        if let Err(err) = self.persist(&dataset) {
            dataset.pop();
            return Err(err.context("persisting appended entry").into());
        }
        Ok(position)
    }

    pub fn update_at(&self, position: i64, entry: Entry) -> ApiResult<()> {
        let mut dataset = self.lock()?;
        let previous = dataset.update_at(position, entry)?;
        if let Err(err) = self.persist(&dataset) {
            dataset.update_at(position, previous)?;
            return Err(err.context(format!("persisting update at {position}")).into());
        }
        Ok(())
    }

    pub fn delete_at(&self, position: i64) -> ApiResult<Entry> {
        let mut dataset = self.lock()?;
        let removed = dataset.delete_at(position)?;
        if let Err(err) = self.persist(&dataset) {
            // delete_at succeeded, so position is a valid index
            dataset.insert(position as usize, removed);
            return Err(err.context(format!("persisting delete at {position}")).into());
        }
        Ok(removed)
    }
}
