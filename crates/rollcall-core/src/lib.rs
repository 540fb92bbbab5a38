pub mod attribution;
pub mod config;
pub mod dataset;
pub mod error;
pub mod harvest;
pub mod models;
pub mod pagination;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use attribution::{assign_company, resolve_company};
pub use config::{HarvestConfig, SessionConfig, SiteConfig};
pub use dataset::{CompletenessPolicy, Dataset, MergeMode};
pub use error::AppError;
pub use harvest::{HarvestEvent, HarvestReporter, HarvestService, TracingHarvestReporter};
pub use models::{MergeStats, ProfileRecord, RunSummary, ScrapedProfile, SessionCookie};
pub use pagination::{PageEnumerator, PageSet, PaginationControl};
pub use reconciler::Reconciler;
pub use session::{CookieJar, SessionOrigin, acquire_session};
pub use store::{CsvDatasetStore, DatasetStore, load_companies};
pub use throttle::ThrottledSource;
pub use traits::{PageSource, Target};
