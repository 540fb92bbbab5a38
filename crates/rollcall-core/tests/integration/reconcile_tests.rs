use rollcall_core::dataset::{Dataset, MergeMode};
use rollcall_core::reconciler::Reconciler;
use rollcall_core::store::{CsvDatasetStore, DatasetStore, load_companies};

use crate::common::{read, rec};

#[test]
fn csv_round_trip_preserves_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvDatasetStore::new(dir.path().join("out").join("employees.csv"));

    let dataset = Dataset::from_iter([
        rec("https://x.test/in/b", "Sales, \"EMEA\"", "Globex"),
        rec("https://x.test/in/a", "Engineer\nat Acme", "Acme Corp"),
        rec("https://x.test/in/c", "", ""),
    ]);
    store.save(&dataset).unwrap();

    assert_eq!(store.load().unwrap(), dataset);
    let text = read(store.path());
    assert_eq!(text.lines().next(), Some("Profile_URL,Description,Company"));
    let a = text.find("/in/a").unwrap();
    let b = text.find("/in/b").unwrap();
    assert!(a < b, "rows are sorted by URL");
}

#[test]
fn fresh_scenario_adds_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvDatasetStore::new(dir.path().join("employees.csv"));
    store
        .save(&Dataset::from_iter([rec("u1", "x", "A")]))
        .unwrap();

    let mut reconciler = Reconciler::open(store.clone()).unwrap();
    let (stats, flushed) = reconciler.apply(
        vec![rec("u1", "y", "B"), rec("u2", "", "")],
        MergeMode::Fresh,
    );
    flushed.unwrap();

    assert_eq!(stats.new, 1);
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.get("u1"), Some(&rec("u1", "x", "A")));
    assert_eq!(reloaded.get("u2"), Some(&rec("u2", "", "")));
}

#[test]
fn update_scenario_enriches_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvDatasetStore::new(dir.path().join("employees.csv"));
    store
        .save(&Dataset::from_iter([rec("u1", "short", "")]))
        .unwrap();

    let mut reconciler = Reconciler::open(store.clone()).unwrap();
    let (stats, flushed) = reconciler.apply(
        vec![rec("u1", "much longer text", "Acme"), rec("u9", "new", "Z")],
        MergeMode::Update,
    );
    flushed.unwrap();
    let dataset = reconciler.finish().unwrap();

    assert_eq!(stats.updated, 1);
    assert_eq!(dataset.len(), 1);
    assert_eq!(
        store.load().unwrap().get("u1"),
        Some(&rec("u1", "much longer text", "Acme"))
    );
}

#[test]
fn update_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvDatasetStore::new(dir.path().join("employees.csv"));
    store
        .save(&Dataset::from_iter([rec("u1", "", ""), rec("u2", "kept", "K")]))
        .unwrap();
    let batch = vec![rec("u1", "filled in", "Acme"), rec("u2", "k", "")];

    let mut reconciler = Reconciler::open(store.clone()).unwrap();
    reconciler.apply(batch.clone(), MergeMode::Update).1.unwrap();
    let once = read(store.path());

    let (stats, flushed) = reconciler.apply(batch, MergeMode::Update);
    flushed.unwrap();
    assert_eq!(stats.updated, 0);
    assert_eq!(read(store.path()), once);
}

#[test]
fn company_list_keeps_order_and_skips_blanks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("companies.csv");
    std::fs::write(&path, "Name,Industry\n  Globex ,x\n,y\nAcme Corp,z\n").unwrap();

    assert_eq!(
        load_companies(&path).unwrap(),
        vec!["Globex".to_string(), "Acme Corp".to_string()]
    );
}
