use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use rollcall_client::{BrowserOptions, BrowserPageSource, SiteSelectors};
use rollcall_core::config::DEFAULT_SITE_URL;
use rollcall_core::{
    CompletenessPolicy, CookieJar, CsvDatasetStore, DatasetStore, HarvestConfig,
    HarvestService, MergeMode, Reconciler, RunSummary, SessionConfig, SessionOrigin, SiteConfig,
    ThrottledSource, TracingHarvestReporter, acquire_session, load_companies,
};

#[derive(Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Collect employee profile links for a list of companies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Also append log output to this file
    #[arg(long, global = true, env = "ROLLCALL_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every listed company, adding profiles not yet in the dataset
    Harvest(HarvestArgs),

    /// Revisit listed companies and enrich profiles already in the dataset
    Update(HarvestArgs),

    /// Log in by hand and save the session cookies
    Login {
        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Summarize the dataset without launching a browser
    Stats {
        #[command(flatten)]
        store: StoreArgs,

        /// Descriptions shorter than this count as missing
        #[arg(long, default_value_t = 1)]
        min_description_chars: usize,
    },
}

#[derive(Args)]
struct StoreArgs {
    /// Dataset CSV (Profile_URL, Description, Company)
    #[arg(
        short,
        long,
        env = "ROLLCALL_OUTPUT",
        default_value = "output/employees.csv"
    )]
    output: PathBuf,
}

#[derive(Args)]
struct BrowserArgs {
    /// Session cookie file
    #[arg(long, env = "ROLLCALL_COOKIES", default_value = "rollcall_cookies.json")]
    cookies: PathBuf,

    /// Run the browser without a window
    #[arg(long, env = "ROLLCALL_HEADLESS", default_value_t = false)]
    headless: bool,

    /// Site root
    #[arg(long, env = "ROLLCALL_SITE_URL", default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// Chrome/Chromium binary (defaults to CHROME_BIN or a well-known path)
    #[arg(long, env = "ROLLCALL_CHROME")]
    chrome: Option<PathBuf>,

    /// JSON file overriding page element selectors
    #[arg(long, env = "ROLLCALL_SELECTORS")]
    selectors: Option<PathBuf>,

    /// Seconds to wait for a manual login
    #[arg(long, env = "ROLLCALL_LOGIN_TIMEOUT", default_value_t = 300)]
    login_timeout: u64,

    /// Seconds to wait for a page to load
    #[arg(long, env = "ROLLCALL_PAGE_LOAD_TIMEOUT", default_value_t = 30)]
    page_load_timeout: u64,
}

#[derive(Args)]
struct HarvestArgs {
    /// CSV with a Name column listing the companies
    #[arg(
        short,
        long,
        env = "ROLLCALL_COMPANIES",
        default_value = "companies.csv"
    )]
    companies: PathBuf,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    browser: BrowserArgs,

    /// Seconds to wait for a listing element
    #[arg(long, env = "ROLLCALL_ELEMENT_TIMEOUT", default_value_t = 10)]
    element_timeout: u64,

    /// Minimum seconds between navigations
    #[arg(long, env = "ROLLCALL_ACTION_DELAY", default_value_t = 3)]
    action_delay: u64,

    /// Seconds to pause between companies
    #[arg(long, env = "ROLLCALL_COMPANY_DELAY", default_value_t = 7)]
    company_delay: u64,

    /// Maximum profiles collected per company
    #[arg(long, env = "ROLLCALL_MAX_PROFILES", default_value_t = 1000)]
    max_profiles: usize,

    /// Only visit the first N pages of each listing
    #[arg(long, env = "ROLLCALL_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Descriptions shorter than this count as missing
    #[arg(long, default_value_t = 1)]
    min_description_chars: usize,

    /// In update mode, also revisit profiles that are already complete
    #[arg(long, default_value_t = false)]
    revisit_complete: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Harvest(args) => cmd_harvest(args, MergeMode::Fresh).await,
        Commands::Update(args) => cmd_harvest(args, MergeMode::Update).await,
        Commands::Login { browser } => cmd_login(browser).await,
        Commands::Stats {
            store,
            min_description_chars,
        } => cmd_stats(
            &store.output,
            &CompletenessPolicy {
                min_description_chars,
                ..CompletenessPolicy::default()
            },
        ),
    }
}

async fn cmd_harvest(args: HarvestArgs, requested: MergeMode) -> Result<()> {
    let companies = load_companies(&args.companies)
        .with_context(|| format!("Failed to load companies from {}", args.companies.display()))?;
    if companies.is_empty() {
        tracing::warn!(path = %args.companies.display(), "No companies to process");
        return Ok(());
    }
    tracing::info!(count = companies.len(), "Loaded companies");

    let site = SiteConfig::new(&args.browser.site_url)?;
    let config = harvest_config(&args, site.clone());
    let store = CsvDatasetStore::new(&args.store.output);
    let reconciler = Reconciler::open(store)
        .with_context(|| format!("Failed to load dataset {}", args.store.output.display()))?;

    let mode = if requested == MergeMode::Update && reconciler.dataset().is_empty() {
        tracing::warn!("Dataset is empty, switching to fresh mode");
        MergeMode::Fresh
    } else {
        requested
    };
    if mode == MergeMode::Update {
        tracing::info!(
            records = reconciler.dataset().len(),
            incomplete = reconciler.dataset().incomplete_count(&config.completeness),
            "Updating existing dataset"
        );
    }

    let cancel = CancellationToken::new();
    let watcher = watch_interrupt(cancel.clone());

    let source = launch_browser(&args.browser, args.browser.headless).await?;
    let jar = CookieJar::new(&args.browser.cookies);
    let session = session_config(&args.browser);

    let signed_in = tokio::select! {
        result = acquire_session(&source, &jar, &site, &session) => Some(result),
        () = cancel.cancelled() => None,
    };
    match signed_in {
        Some(Ok(origin)) => tracing::info!(?origin, "Session ready"),
        Some(Err(e)) => {
            close_browser(source).await;
            watcher.abort();
            return Err(e).context("Could not sign in");
        }
        None => {
            close_browser(source).await;
            tracing::warn!("Interrupted before the harvest started");
            return Ok(());
        }
    }

    let throttled = ThrottledSource::new(source, config.action_delay);
    let mut service = HarvestService::new(throttled, reconciler, config);
    let summary = service
        .run(&companies, mode, &cancel, &TracingHarvestReporter)
        .await;
    watcher.abort();

    let (source, reconciler) = service.into_parts();
    close_browser(source.into_inner()).await;

    finish_run(reconciler, &summary, &args.store.output, &mut std::io::stdout())
}

/// Final flush, then the run summary. The summary is printed even when the
/// flush fails.
fn finish_run<S: DatasetStore>(
    reconciler: Reconciler<S>,
    summary: &RunSummary,
    output: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let records = reconciler.dataset().len();
    let saved = reconciler.finish();
    write_summary(out, summary, records, output, saved.is_ok())?;
    saved.with_context(|| format!("Final save to {} failed", output.display()))?;
    Ok(())
}

async fn cmd_login(args: BrowserArgs) -> Result<()> {
    if args.headless {
        tracing::warn!("Ignoring --headless, login needs a browser window");
    }
    let site = SiteConfig::new(&args.site_url)?;
    let source = launch_browser(&args, false).await?;
    let jar = CookieJar::new(&args.cookies);

    let result = acquire_session(&source, &jar, &site, &session_config(&args)).await;
    close_browser(source).await;

    match result.context("Could not sign in")? {
        SessionOrigin::Restored => println!("Saved session in {} is valid", jar.path().display()),
        SessionOrigin::Interactive => {
            println!("Session saved to {}", jar.path().display())
        }
    }
    Ok(())
}

fn cmd_stats(path: &Path, policy: &CompletenessPolicy) -> Result<()> {
    let dataset = CsvDatasetStore::new(path)
        .load()
        .with_context(|| format!("Failed to load dataset {}", path.display()))?;

    if dataset.is_empty() {
        println!("No records in {}", path.display());
        return Ok(());
    }

    let missing_description = dataset
        .records()
        .filter(|r| r.description.chars().count() < policy.min_description_chars.max(1))
        .count();
    let missing_company = dataset.records().filter(|r| r.company.is_empty()).count();

    let mut per_company: BTreeMap<&str, usize> = BTreeMap::new();
    for record in dataset.records() {
        let company = if record.company.is_empty() {
            "(unknown)"
        } else {
            record.company.as_str()
        };
        *per_company.entry(company).or_default() += 1;
    }
    let mut per_company: Vec<_> = per_company.into_iter().collect();
    per_company.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    println!("Dataset {}:\n", path.display());
    println!("  Records:             {}", dataset.len());
    println!("  Missing description: {missing_description}");
    println!("  Missing company:     {missing_company}");
    println!("  Incomplete:          {}", dataset.incomplete_count(policy));
    println!("\nBy company:");
    for (company, count) in per_company {
        println!("  {count:>6}  {company}");
    }

    Ok(())
}

fn harvest_config(args: &HarvestArgs, site: SiteConfig) -> HarvestConfig {
    let mut config = HarvestConfig::new(site);
    config.element_timeout = Duration::from_secs(args.element_timeout);
    config.page_load_timeout = Duration::from_secs(args.browser.page_load_timeout);
    config.action_delay = Duration::from_secs(args.action_delay);
    config.company_delay = Duration::from_secs(args.company_delay);
    config.max_profiles_per_company = args.max_profiles;
    config.max_pages = args.max_pages;
    config.completeness.min_description_chars = args.min_description_chars;
    config.skip_complete = !args.revisit_complete;
    config
}

fn session_config(args: &BrowserArgs) -> SessionConfig {
    SessionConfig {
        login_timeout: Duration::from_secs(args.login_timeout),
        ..SessionConfig::default()
    }
}

async fn launch_browser(args: &BrowserArgs, headless: bool) -> Result<BrowserPageSource> {
    let selectors = match &args.selectors {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read selector file: {}", path.display()))?;
            SiteSelectors::from_json(&raw).context("Invalid JSON in selector file")?
        }
        None => SiteSelectors::default(),
    };

    let options = BrowserOptions {
        headless,
        chrome_binary: args.chrome.clone(),
        page_load_timeout: Duration::from_secs(args.page_load_timeout),
        ..BrowserOptions::default()
    };

    BrowserPageSource::launch(options, selectors.compile()?)
        .await
        .context("Failed to launch browser")
}

async fn close_browser(source: BrowserPageSource) {
    match source.close().await {
        Ok(()) => tracing::info!("Browser closed"),
        Err(e) => tracing::warn!(error = %e, "Browser did not close cleanly"),
    }
}

/// Cancel `token` on Ctrl-C.
fn watch_interrupt(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            token.cancel();
        }
    })
}

fn write_summary(
    out: &mut impl Write,
    summary: &RunSummary,
    records: usize,
    path: &Path,
    saved: bool,
) -> std::io::Result<()> {
    let elapsed = summary
        .finished_at
        .map(|end| (end - summary.started_at).num_seconds())
        .unwrap_or_default();

    writeln!(out, "\n{}", "=".repeat(60))?;
    if summary.interrupted {
        writeln!(out, "Harvest interrupted after {elapsed}s")?;
    } else {
        writeln!(out, "Harvest finished in {elapsed}s")?;
    }
    writeln!(out, "  Companies processed: {}", summary.companies_processed)?;
    writeln!(out, "  Companies failed:    {}", summary.companies_failed)?;
    writeln!(
        out,
        "  Pages visited:       {} ({} failed)",
        summary.pages_visited, summary.pages_failed
    )?;
    writeln!(out, "  New profiles:        {}", summary.totals.new)?;
    writeln!(out, "  Updated profiles:    {}", summary.totals.updated)?;
    writeln!(out, "  Records in dataset:  {records}")?;
    if saved {
        writeln!(out, "  Saved to:            {}", path.display())?;
    } else {
        writeln!(out, "  NOT saved to:        {}", path.display())?;
    }
    writeln!(out, "{}", "=".repeat(60))
}

/// Console logging on stderr, plus an append-only plain-text copy when
/// `log_file` is set.
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("rollcall=info".parse()?);
    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let file = log_file
        .map(|path| -> Result<_> {
            Ok(fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
