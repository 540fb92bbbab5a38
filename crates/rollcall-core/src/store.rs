//! Flat-file persistence for the dataset and the input company list.

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::dataset::Dataset;
use crate::error::AppError;
use crate::models::{CompanyRow, ProfileRecord};

/// Fixed header of the persisted dataset.
pub const DATASET_HEADER: [&str; 3] = ["Profile_URL", "Description", "Company"];

/// Loads and checkpoints the full dataset.
pub trait DatasetStore {
    /// Load the persisted dataset. A store that does not exist yet is empty.
    fn load(&self) -> Result<Dataset, AppError>;

    /// Replace the persisted dataset with `dataset`.
    fn save(&self, dataset: &Dataset) -> Result<(), AppError>;
}

/// CSV-backed dataset store with full-rewrite semantics.
///
/// Every save writes the whole dataset, sorted by URL, into a temporary file
/// next to the target and renames it into place.
#[derive(Debug, Clone)]
pub struct CsvDatasetStore {
    path: PathBuf,
}

impl CsvDatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetStore for CsvDatasetStore {
    fn load(&self) -> Result<Dataset, AppError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "No existing dataset, starting empty");
            return Ok(Dataset::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<ProfileRecord>().enumerate() {
            match row {
                Ok(record) if !record.profile_url.is_empty() => records.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(row = line + 1, error = %e, "Skipping unreadable dataset row");
                }
            }
        }

        let dataset = Dataset::from_iter(records);
        tracing::info!(
            path = %self.path.display(),
            records = dataset.len(),
            "Loaded existing dataset"
        );
        Ok(dataset)
    }

    fn save(&self, dataset: &Dataset) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file_mut());
            writer.write_record(DATASET_HEADER)?;
            for record in dataset.records() {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| AppError::Io(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            records = dataset.len(),
            "Dataset written"
        );
        Ok(())
    }
}

/// Read the ordered list of company names from a CSV with a `Name` column.
///
/// Names are trimmed and blank rows skipped.
pub fn load_companies(path: &Path) -> Result<Vec<String>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::Config(format!("Cannot open company list {}: {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let has_name = reader.headers()?.iter().any(|h| h == "Name");
    if !has_name {
        return Err(AppError::Config(format!(
            "Company list {} has no 'Name' column",
            path.display()
        )));
    }

    let mut companies = Vec::new();
    for row in reader.deserialize::<CompanyRow>() {
        let row = row?;
        if !row.name.is_empty() {
            companies.push(row.name);
        }
    }

    tracing::info!(count = companies.len(), "Loaded companies");
    Ok(companies)
}
