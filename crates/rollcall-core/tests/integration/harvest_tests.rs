use rollcall_core::dataset::MergeMode;
use rollcall_core::harvest::{HarvestReporter, HarvestService};
use rollcall_core::reconciler::Reconciler;
use rollcall_core::store::{CsvDatasetStore, DatasetStore};
use tokio_util::sync::CancellationToken;

use crate::common::{FakeSite, instant_config, rec};

struct Silent;

impl HarvestReporter for Silent {}

fn acme() -> FakeSite {
    FakeSite::new().company(
        "acme-corp",
        vec![
            vec![("ann", "Engineer @ Acme Corp"), ("bob", "")],
            vec![("cyd", "Designer at Globex"), ("ann", "duplicate row")],
        ],
    )
}

#[tokio::test]
async fn harvest_then_update_against_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("output").join("employees.csv");
    let companies = vec!["Acme Corp".to_string(), "Globex".to_string()];

    let reconciler = Reconciler::open(CsvDatasetStore::new(&path)).unwrap();
    let mut service = HarvestService::new(acme(), reconciler, instant_config());
    let summary = service
        .run(&companies, MergeMode::Fresh, &CancellationToken::new(), &Silent)
        .await;

    assert_eq!(summary.companies_processed, 1);
    assert_eq!(summary.companies_failed, 1);
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.totals.new, 3);

    let stored = CsvDatasetStore::new(&path).load().unwrap();
    assert_eq!(
        stored.get("https://www.linkedin.com/in/ann"),
        Some(&rec(
            "https://www.linkedin.com/in/ann",
            "Engineer @ Acme Corp",
            "Acme Corp"
        ))
    );
    assert_eq!(
        stored.get("https://www.linkedin.com/in/cyd").map(|r| r.company.as_str()),
        Some("Globex")
    );

    // Second pass: bob now has a headline, nothing new is added.
    let site = FakeSite::new().company(
        "acme-corp",
        vec![vec![("bob", "Accountant"), ("dee", "Intern")]],
    );
    let reconciler = Reconciler::open(CsvDatasetStore::new(&path)).unwrap();
    let mut service = HarvestService::new(site, reconciler, instant_config());
    let summary = service
        .run(&companies, MergeMode::Update, &CancellationToken::new(), &Silent)
        .await;

    assert_eq!(summary.totals.updated, 1);
    assert_eq!(summary.totals.new, 0);

    let stored = CsvDatasetStore::new(&path).load().unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(
        stored.get("https://www.linkedin.com/in/bob"),
        Some(&rec("https://www.linkedin.com/in/bob", "Accountant", "Acme Corp"))
    );
}

#[tokio::test]
async fn max_pages_limits_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("employees.csv");
    let mut config = instant_config();
    config.max_pages = Some(1);

    let reconciler = Reconciler::open(CsvDatasetStore::new(&path)).unwrap();
    let mut service = HarvestService::new(acme(), reconciler, config);
    let summary = service
        .run(
            &["Acme Corp".to_string()],
            MergeMode::Fresh,
            &CancellationToken::new(),
            &Silent,
        )
        .await;

    assert_eq!(summary.pages_visited, 1);
    assert_eq!(CsvDatasetStore::new(&path).load().unwrap().len(), 2);
}
