use crate::dataset::{Dataset, MergeMode};
use crate::error::AppError;
use crate::models::{MergeStats, ProfileRecord};
use crate::store::DatasetStore;

/// Owns the dataset for the lifetime of a run and checkpoints it to the
/// store after every batch.
///
/// A failed flush is logged and leaves the reconciler dirty; since every
/// flush is a full rewrite, the next batch (or [`finish`](Self::finish))
/// retries it.
pub struct Reconciler<S: DatasetStore> {
    store: S,
    dataset: Dataset,
    dirty: bool,
    totals: MergeStats,
}

impl<S: DatasetStore> Reconciler<S> {
    /// Load the persisted dataset from `store`.
    pub fn open(store: S) -> Result<Self, AppError> {
        let dataset = store.load()?;
        Ok(Self::with_dataset(store, dataset))
    }

    pub fn with_dataset(store: S, dataset: Dataset) -> Self {
        Self {
            store,
            dataset,
            dirty: false,
            totals: MergeStats::default(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn totals(&self) -> MergeStats {
        self.totals
    }

    /// True if the last flush failed and in-memory changes are not on disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Merge one batch and checkpoint the full dataset.
    ///
    /// Returns the batch's tallies and the flush error, if any. The merge
    /// itself always takes effect in memory.
    pub fn apply(
        &mut self,
        batch: Vec<ProfileRecord>,
        mode: MergeMode,
    ) -> (MergeStats, Result<(), AppError>) {
        let stats = self.dataset.merge(batch, mode);
        self.totals.absorb(stats);
        (stats, self.flush())
    }

    /// Rewrite the full dataset to the store.
    pub fn flush(&mut self) -> Result<(), AppError> {
        match self.store.save(&self.dataset) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                tracing::error!(
                    error = %e,
                    records = self.dataset.len(),
                    "Dataset flush failed, will retry"
                );
                Err(e)
            }
        }
    }

    /// Final flush at the end of a run; returns the dataset.
    pub fn finish(mut self) -> Result<Dataset, AppError> {
        self.flush()?;
        Ok(self.dataset)
    }
}
