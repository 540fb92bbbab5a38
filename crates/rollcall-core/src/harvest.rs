use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::attribution::resolve_company;
use crate::config::HarvestConfig;
use crate::dataset::MergeMode;
use crate::error::AppError;
use crate::models::{
    MergeStats, ProfileRecord, RunSummary, ScrapedProfile, normalize_profile_url,
};
use crate::pagination::{PageEnumerator, PageSet};
use crate::reconciler::Reconciler;
use crate::store::DatasetStore;
use crate::traits::{PageSource, Target};

/// Events emitted during a harvest run for monitoring/logging.
#[derive(Debug, Clone)]
pub enum HarvestEvent<'a> {
    RunStarted {
        mode: MergeMode,
        companies: usize,
        known_profiles: usize,
    },
    CompanyStarted {
        index: usize,
        total: usize,
        company: &'a str,
    },
    CompanyLocated {
        company: &'a str,
        url: &'a str,
    },
    PagesEnumerated {
        company: &'a str,
        pages: usize,
        results: Option<&'a str>,
    },
    PageFailed {
        company: &'a str,
        page: usize,
        url: &'a str,
        error: &'a str,
    },
    BatchMerged {
        company: &'a str,
        page: usize,
        pages: usize,
        found: usize,
        stats: MergeStats,
    },
    FlushFailed {
        error: &'a str,
    },
    CompanyFinished {
        company: &'a str,
        profiles: usize,
        stats: MergeStats,
    },
    CompanyFailed {
        company: &'a str,
        error: &'a str,
    },
    Interrupted,
    Finished {
        summary: &'a RunSummary,
    },
}

impl HarvestEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            HarvestEvent::RunStarted { .. } => "run_started",
            HarvestEvent::CompanyStarted { .. } => "company_started",
            HarvestEvent::CompanyLocated { .. } => "company_located",
            HarvestEvent::PagesEnumerated { .. } => "pages_enumerated",
            HarvestEvent::PageFailed { .. } => "page_failed",
            HarvestEvent::BatchMerged { .. } => "batch_merged",
            HarvestEvent::FlushFailed { .. } => "flush_failed",
            HarvestEvent::CompanyFinished { .. } => "company_finished",
            HarvestEvent::CompanyFailed { .. } => "company_failed",
            HarvestEvent::Interrupted => "interrupted",
            HarvestEvent::Finished { .. } => "finished",
        }
    }
}

/// Trait for receiving harvest events (decoupled logging).
pub trait HarvestReporter: Send + Sync {
    fn report(&self, event: HarvestEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHarvestReporter;

impl HarvestReporter for TracingHarvestReporter {
    fn report(&self, event: HarvestEvent<'_>) {
        match event {
            HarvestEvent::RunStarted {
                mode,
                companies,
                known_profiles,
            } => {
                tracing::info!(%mode, %companies, %known_profiles, "Harvest started");
            }
            HarvestEvent::CompanyStarted {
                index,
                total,
                company,
            } => {
                tracing::info!("--- Processing company {index}/{total}: {company} ---");
            }
            HarvestEvent::CompanyLocated { company, url } => {
                tracing::info!(%company, %url, "Company page found");
            }
            HarvestEvent::PagesEnumerated {
                company,
                pages,
                results,
            } => {
                tracing::info!(
                    %company,
                    %pages,
                    results = results.unwrap_or("?"),
                    "Listing enumerated"
                );
            }
            HarvestEvent::PageFailed {
                company,
                page,
                url,
                error,
            } => {
                tracing::warn!(%company, %page, %url, %error, "Page skipped");
            }
            HarvestEvent::BatchMerged {
                company,
                page,
                pages,
                found,
                stats,
            } => {
                tracing::info!(
                    %company,
                    "Page {page}/{pages}: {found} profiles, {} new, {} updated",
                    stats.new,
                    stats.updated
                );
            }
            HarvestEvent::FlushFailed { error } => {
                tracing::error!(%error, "Checkpoint failed, data kept in memory");
            }
            HarvestEvent::CompanyFinished {
                company,
                profiles,
                stats,
            } => {
                tracing::info!(
                    %company,
                    %profiles,
                    new = stats.new,
                    updated = stats.updated,
                    skipped = stats.skipped,
                    "Company done"
                );
            }
            HarvestEvent::CompanyFailed { company, error } => {
                tracing::warn!(%company, %error, "Company skipped");
            }
            HarvestEvent::Interrupted => {
                tracing::warn!("Interrupted, stopping after current step");
            }
            HarvestEvent::Finished { summary } => {
                tracing::info!(
                    processed = summary.companies_processed,
                    failed = summary.companies_failed,
                    pages = summary.pages_visited,
                    pages_failed = summary.pages_failed,
                    new = summary.totals.new,
                    updated = summary.totals.updated,
                    interrupted = summary.interrupted,
                    "Harvest finished"
                );
            }
        }
    }
}

/// Drives the per-company, per-page traversal and feeds every page into
/// the reconciler.
///
/// Failures local to one company or page are reported and skipped; the
/// loop always moves on to the next item.
pub struct HarvestService<P, S>
where
    P: PageSource,
    S: DatasetStore,
{
    source: P,
    reconciler: Reconciler<S>,
    config: HarvestConfig,
    enumerator: PageEnumerator,
}

impl<P, S> HarvestService<P, S>
where
    P: PageSource,
    S: DatasetStore,
{
    pub fn new(source: P, reconciler: Reconciler<S>, config: HarvestConfig) -> Self {
        let enumerator = PageEnumerator::new().with_max_pages(config.max_pages);
        Self {
            source,
            reconciler,
            config,
            enumerator,
        }
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    pub fn into_parts(self) -> (P, Reconciler<S>) {
        (self.source, self.reconciler)
    }

    /// Harvest every company in input order until done or cancelled.
    pub async fn run<R: HarvestReporter>(
        &mut self,
        companies: &[String],
        mode: MergeMode,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> RunSummary {
        let mut summary = RunSummary::start();
        reporter.report(HarvestEvent::RunStarted {
            mode,
            companies: companies.len(),
            known_profiles: self.reconciler.dataset().len(),
        });

        let total = companies.len();
        for (idx, company) in companies.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            reporter.report(HarvestEvent::CompanyStarted {
                index: idx + 1,
                total,
                company,
            });

            match self
                .harvest_company(company, companies, mode, cancel, reporter, &mut summary)
                .await
            {
                Ok(_) => summary.companies_processed += 1,
                Err(e) => {
                    summary.companies_failed += 1;
                    reporter.report(HarvestEvent::CompanyFailed {
                        company,
                        error: &e.to_string(),
                    });
                }
            }

            if idx + 1 < total && !self.config.company_delay.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(self.config.company_delay) => {}
                    () = cancel.cancelled() => {}
                }
            }
        }

        if cancel.is_cancelled() {
            summary.interrupted = true;
            reporter.report(HarvestEvent::Interrupted);
        }
        summary.finished_at = Some(Utc::now());
        reporter.report(HarvestEvent::Finished { summary: &summary });
        summary
    }

    async fn harvest_company<R: HarvestReporter>(
        &mut self,
        company: &str,
        companies: &[String],
        mode: MergeMode,
        cancel: &CancellationToken,
        reporter: &R,
        summary: &mut RunSummary,
    ) -> Result<usize, AppError> {
        let company_url = self.locate_company(company).await?;
        reporter.report(HarvestEvent::CompanyLocated {
            company,
            url: &company_url,
        });

        let listing = self.open_listing(&company_url).await?;
        let results = self.source.text_of(Target::ResultCount).await.ok().flatten();
        let pages = self.enumerate_pages(&listing).await;
        reporter.report(HarvestEvent::PagesEnumerated {
            company,
            pages: pages.len(),
            results: results.as_deref(),
        });

        let limit = self.config.max_profiles_per_company;
        let mut found = 0;
        let mut company_stats = MergeStats::default();

        for (idx, page_url) in pages.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            if found >= limit {
                tracing::debug!(%company, %limit, "Profile limit reached");
                break;
            }

            summary.pages_visited += 1;
            let mut entries = match self.read_page(page_url).await {
                Ok(entries) => entries,
                Err(e) => {
                    summary.pages_failed += 1;
                    reporter.report(HarvestEvent::PageFailed {
                        company,
                        page: idx + 1,
                        url: page_url,
                        error: &e.to_string(),
                    });
                    continue;
                }
            };
            entries.truncate(limit - found);
            found += entries.len();
            if entries.is_empty() {
                continue;
            }

            let (batch, dropped) = self.build_batch(entries, company, companies, mode);
            let (mut stats, flushed) = self.reconciler.apply(batch, mode);
            stats.skipped += dropped;
            if let Err(e) = flushed {
                reporter.report(HarvestEvent::FlushFailed {
                    error: &e.to_string(),
                });
            }

            company_stats.absorb(stats);
            summary.totals.absorb(stats);
            reporter.report(HarvestEvent::BatchMerged {
                company,
                page: idx + 1,
                pages: pages.len(),
                found,
                stats,
            });
        }

        reporter.report(HarvestEvent::CompanyFinished {
            company,
            profiles: found,
            stats: company_stats,
        });

        if found == 0 {
            return Err(AppError::StructureNotFound(
                "no profiles found on listing".into(),
            ));
        }
        Ok(found)
    }

    /// Search for the company and return its normalized page address.
    async fn locate_company(&self, company: &str) -> Result<String, AppError> {
        let search_url = self.config.site.company_search_url(company);
        self.source.navigate(&search_url).await?;

        if !self
            .source
            .wait_for(Target::CompanyResults, self.config.element_timeout)
            .await?
        {
            return Err(AppError::StructureNotFound(format!(
                "no search results for '{company}'"
            )));
        }

        self.source
            .links(Target::CompanyResults)
            .await?
            .iter()
            .find_map(|href| self.config.site.normalize_company_url(href))
            .ok_or_else(|| AppError::StructureNotFound(format!("no company page for '{company}'")))
    }

    /// Open the people listing of a company page; returns the listing address.
    async fn open_listing(&self, company_url: &str) -> Result<String, AppError> {
        let people_url = self.config.site.people_url(company_url);
        self.source.navigate(&people_url).await?;

        if !self
            .source
            .wait_for(Target::Body, self.config.page_load_timeout)
            .await?
        {
            return Err(AppError::Timeout(self.config.page_load_timeout.as_secs()));
        }

        let current = self.source.current_url().await?;
        if !self.config.site.is_people_listing(&current) {
            return Err(AppError::StructureNotFound(format!(
                "not a people listing: {current}"
            )));
        }
        Ok(current)
    }

    /// Page set of the listing; structural problems degrade to one page.
    async fn enumerate_pages(&self, listing: &str) -> PageSet {
        let has_pagination = self
            .source
            .wait_for(Target::PaginationList, self.config.element_timeout)
            .await
            .unwrap_or(false);

        let controls = if has_pagination {
            self.source
                .pagination_controls()
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Could not read pagination controls");
                    Vec::new()
                })
        } else {
            tracing::debug!("No pagination found, single page listing");
            Vec::new()
        };

        self.enumerator.enumerate(listing, &controls)
    }

    async fn read_page(&self, page_url: &str) -> Result<Vec<ScrapedProfile>, AppError> {
        self.source.navigate(page_url).await?;
        if !self
            .source
            .wait_for(Target::ProfileList, self.config.element_timeout)
            .await?
        {
            return Err(AppError::Timeout(self.config.element_timeout.as_secs()));
        }
        self.source.profile_entries().await
    }

    /// Turn scraped rows into records. Returns the batch and the number of
    /// rows dropped because their stored record is already complete.
    fn build_batch(
        &self,
        entries: Vec<ScrapedProfile>,
        listing_company: &str,
        companies: &[String],
        mode: MergeMode,
    ) -> (Vec<ProfileRecord>, usize) {
        let dataset = self.reconciler.dataset();
        let policy = &self.config.completeness;
        let mut dropped = 0;

        let batch = entries
            .into_iter()
            .filter_map(|entry| {
                let url = normalize_profile_url(&entry.url)?;
                if mode == MergeMode::Update && self.config.skip_complete {
                    if let Some(existing) = dataset.get(&url) {
                        if policy.is_complete(existing) {
                            tracing::debug!(%url, "Already complete, skipping");
                            dropped += 1;
                            return None;
                        }
                    }
                }
                let company = resolve_company(&entry.description, companies, listing_company);
                Some(ProfileRecord::new(url, entry.description, company))
            })
            .collect();

        (batch, dropped)
    }
}
