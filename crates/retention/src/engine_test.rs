//! Retention engine tests

use std::fs;
use std::sync::Arc;

use spool_sinks::ManualClock;
use tempfile::TempDir;

use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Engine whose "today" is 2024-03-10
fn engine(dir: &Path, policy: RetentionPolicy) -> RetentionEngine {
    RetentionEngine::new(dir, policy).with_clock(Arc::new(ManualClock::on_date(date(2024, 3, 10))))
}

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"{}\n").unwrap();
}

fn exists(dir: &Path, name: &str) -> bool {
    dir.join(name).exists()
}

#[test]
fn test_age_in_days() {
    let today = date(2024, 3, 10);
    assert_eq!(age_in_days(date(2024, 2, 1), today), 38);
    assert_eq!(age_in_days(date(2024, 3, 1), today), 9);
    assert_eq!(age_in_days(today, today), 0);
    // future dates count by distance
    assert_eq!(age_in_days(date(2024, 3, 12), today), 2);
}

#[tokio::test]
async fn test_deletes_only_expired_files() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    touch(dir, "app_2024-02-01.log");
    touch(dir, "app_2024-02-01_000.log");
    touch(dir, "app_2024-03-01.log");
    touch(dir, "app_2024-02-09.log"); // exactly 30 days
    touch(dir, "notes.txt");
    touch(dir, "app_2024-02-01.log.gz");

    let report = engine(dir, RetentionPolicy::uniform(30))
        .run_once()
        .await
        .unwrap();

    assert!(!exists(dir, "app_2024-02-01.log"));
    assert!(!exists(dir, "app_2024-02-01_000.log"));
    assert!(exists(dir, "app_2024-03-01.log"));
    assert!(exists(dir, "app_2024-02-09.log"));
    assert!(exists(dir, "notes.txt"));
    assert!(exists(dir, "app_2024-02-01.log.gz"));

    assert_eq!(report.scanned, 6);
    assert_eq!(report.matched, 4);
    assert_eq!(report.expired, 2);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.batches, vec![2]);
}

#[tokio::test]
async fn test_batches_of_five() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    for day in 1..=12 {
        touch(dir, &format!("app_2024-01-{:02}.log", day));
    }

    let report = engine(dir, RetentionPolicy::uniform(30))
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.batches, vec![5, 5, 2]);
    assert_eq!(report.deleted, 12);
    assert_eq!(fs::read_dir(dir).unwrap().count(), 0);
}

#[tokio::test]
async fn test_custom_batch_size() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    for day in 1..=7 {
        touch(dir, &format!("app_2024-01-{:02}.log", day));
    }

    let report = engine(dir, RetentionPolicy::uniform(30))
        .with_batch_size(3)
        .unwrap()
        .run_once()
        .await
        .unwrap();
    assert_eq!(report.batches, vec![3, 3, 1]);
}

#[test]
fn test_zero_batch_size_rejected() {
    let result = RetentionEngine::new("unused", RetentionPolicy::uniform(30)).with_batch_size(0);
    assert!(matches!(result, Err(RetentionError::InvalidSettings(_))));
}

#[tokio::test]
async fn test_missing_directory_is_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("nope");

    let report = engine(&dir, RetentionPolicy::uniform(1))
        .run_once()
        .await
        .unwrap();

    assert_eq!(report, RetentionReport::default());
}

#[tokio::test]
async fn test_failed_deletion_does_not_stop_batch() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    touch(dir, "app_2024-01-01.log");
    touch(dir, "app_2024-01-03.log");
    // remove_file refuses directories
    fs::create_dir(dir.join("app_2024-01-02.log")).unwrap();

    let mut batch = vec![
        dir.join("app_2024-01-01.log"),
        dir.join("app_2024-01-02.log"),
        dir.join("app_2024-01-09.log"), // already gone
        dir.join("app_2024-01-03.log"),
    ];
    let mut report = RetentionReport::default();
    delete_batch(&mut batch, &mut report).await;

    assert!(batch.is_empty());
    assert_eq!(report.deleted, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.batches, vec![4]);
    assert!(!exists(dir, "app_2024-01-01.log"));
    assert!(!exists(dir, "app_2024-01-03.log"));
    assert!(exists(dir, "app_2024-01-02.log"));
}

#[tokio::test]
async fn test_per_stream_policy() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    touch(dir, "api_2024-03-01.log"); // 9 days
    touch(dir, "Audit_2023-01-01.log"); // kept forever
    touch(dir, "web_2024-02-01.log"); // 38 days, default 30
    touch(dir, "web_2024-02-20.log"); // 19 days

    let policy = RetentionPolicy::per_stream([("api", 7), ("audit", 0)], Some(30));
    let report = engine(dir, policy).run_once().await.unwrap();

    assert!(!exists(dir, "api_2024-03-01.log"));
    assert!(exists(dir, "Audit_2023-01-01.log"));
    assert!(!exists(dir, "web_2024-02-01.log"));
    assert!(exists(dir, "web_2024-02-20.log"));
    assert_eq!(report.deleted, 2);
}

#[tokio::test]
async fn test_unlisted_stream_without_default_is_kept() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    touch(dir, "api_2020-01-01.log");
    touch(dir, "web_2020-01-01.log");

    let policy = RetentionPolicy::per_stream([("api", 7)], None);
    let report = engine(dir, policy).run_once().await.unwrap();

    assert!(!exists(dir, "api_2020-01-01.log"));
    assert!(exists(dir, "web_2020-01-01.log"));
    assert_eq!(report.matched, 2);
    assert_eq!(report.expired, 1);
}

#[tokio::test]
async fn test_stream_names_with_underscores() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    touch(dir, "my_app_2024-01-01_002.log");

    let policy = RetentionPolicy::per_stream([("my_app", 7)], None);
    let report = engine(dir, policy).run_once().await.unwrap();

    assert_eq!(report.deleted, 1);
}

#[tokio::test]
async fn test_directories_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir(dir.join("app_2020-01-01.log")).unwrap();

    let report = engine(dir, RetentionPolicy::uniform(1))
        .run_once()
        .await
        .unwrap();

    assert!(exists(dir, "app_2020-01-01.log"));
    assert_eq!(report.matched, 0);
    assert_eq!(report.failed, 0);
}

#[test]
fn test_from_config() {
    let config: Config = "[global]\nbase_dir = \"/tmp/spool-logs\"\n\n[retention]\nbatch_size = 2\nmax_age = 9"
        .parse()
        .unwrap();
    let engine = RetentionEngine::from_config(&config).unwrap();

    assert_eq!(engine.base_dir(), Path::new("/tmp/spool-logs"));
    assert_eq!(engine.policy(), &RetentionPolicy::uniform(9));
    assert_eq!(engine.batch_size, 2);
}
