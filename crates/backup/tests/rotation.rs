use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use proptest::prelude::*;
use swagstock_backup::{BackupConfig, BackupError, BackupManager, BackupReason};
use tempfile::TempDir;

struct Setup {
    dir: TempDir,
    manager: BackupManager,
}

impl Setup {
    fn new(retention: usize) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut config = BackupConfig::new(dir.path().join("stock.db"), dir.path().join("backups"));
        config.retention = retention;
        let manager = BackupManager::new(config);
        Self { dir, manager }
    }

    fn data_file(&self) -> PathBuf {
        self.dir.path().join("stock.db")
    }

    fn write_data(&self, contents: &str) {
        fs::write(self.data_file(), contents).expect("failed to write data file");
    }

    fn read_data(&self) -> String {
        fs::read_to_string(self.data_file()).expect("failed to read data file")
    }

    fn files_in_backup_dir(&self) -> usize {
        fs::read_dir(self.dir.path().join("backups"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[tokio::test]
async fn three_quick_backups_leave_the_two_newest() {
    let setup = Setup::new(2);
    setup.write_data("v1");

    let mut created = Vec::new();
    for _ in 0..3 {
        let snapshot = setup.manager.create_backup(BackupReason::Manual).await.unwrap().unwrap();
        created.push(snapshot.filename);
    }

    let remaining: Vec<_> = setup
        .manager
        .list_backups()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.filename)
        .collect();
    assert_eq!(remaining, vec![created[2].clone(), created[1].clone()]);
    assert_eq!(setup.files_in_backup_dir(), 2);
}

#[tokio::test]
async fn missing_data_file_produces_no_backup() {
    let setup = Setup::new(2);

    assert!(setup.manager.create_backup(BackupReason::Manual).await.unwrap().is_none());
    assert!(setup.manager.latest_backup().await.unwrap().is_none());
    assert_eq!(setup.files_in_backup_dir(), 0);
}

#[tokio::test]
async fn listing_reports_name_reason_and_size() {
    let setup = Setup::new(2);
    setup.write_data("twelve bytes");
    fs::create_dir_all(setup.dir.path().join("backups")).unwrap();
    fs::write(setup.dir.path().join("backups").join("readme.txt"), "not a backup").unwrap();

    let snapshot = setup
        .manager
        .create_backup(BackupReason::custom("Before import"))
        .await
        .unwrap()
        .unwrap();

    assert!(snapshot.filename.starts_with("swagstock_backup_"));
    assert!(snapshot.filename.ends_with("_before_import.db"));
    assert_eq!(snapshot.reason, BackupReason::Custom("before_import".to_string()));
    assert_eq!(snapshot.size, 12);
    assert_eq!(setup.manager.list_backups().await.unwrap(), vec![snapshot]);
    assert_eq!(setup.files_in_backup_dir(), 2, "foreign files are neither listed nor pruned");
}

#[tokio::test]
async fn look_alike_file_with_non_ascii_stamp_does_not_block_backups() {
    let setup = Setup::new(2);
    setup.write_data("v1");
    let backups = setup.dir.path().join("backups");
    fs::create_dir_all(&backups).unwrap();
    fs::write(backups.join("swagstock_backup_20250131_23595é042_manual.db"), "stray").unwrap();

    let snapshot = setup.manager.create_backup(BackupReason::Manual).await.unwrap().unwrap();

    assert_eq!(setup.manager.list_backups().await.unwrap(), vec![snapshot]);
    assert_eq!(setup.files_in_backup_dir(), 2);
}

#[tokio::test]
async fn auto_backup_runs_once_per_interval_unless_forced() {
    let setup = Setup::new(5);
    setup.write_data("v1");

    let first = setup.manager.auto_backup_if_needed(false).await.unwrap().unwrap();
    assert_eq!(first.reason, BackupReason::AutoFirst);
    assert!(setup.manager.auto_backup_if_needed(false).await.unwrap().is_none());

    let forced = setup.manager.auto_backup_if_needed(true).await.unwrap().unwrap();
    assert_eq!(forced.reason, BackupReason::Forced);
    assert_eq!(setup.manager.latest_backup().await.unwrap(), Some(forced));
}

#[tokio::test]
async fn stale_backup_triggers_a_scheduled_one() {
    let dir = TempDir::new().unwrap();
    let mut config = BackupConfig::new(dir.path().join("stock.db"), dir.path().join("backups"));
    config.auto_interval = Duration::ZERO;
    let manager = BackupManager::new(config);
    fs::write(dir.path().join("stock.db"), "v1").unwrap();

    manager.create_backup(BackupReason::Manual).await.unwrap();
    let scheduled = manager.auto_backup_if_needed(false).await.unwrap().unwrap();

    assert_eq!(scheduled.reason, BackupReason::AutoScheduled);
}

#[tokio::test]
async fn restore_keeps_a_safety_copy_of_the_replaced_state() {
    let setup = Setup::new(2);
    setup.write_data("good");
    let good = setup.manager.create_backup(BackupReason::Manual).await.unwrap().unwrap();
    setup.write_data("broken");

    let report = setup.manager.restore_backup(&good.path).await.unwrap();

    assert_eq!(setup.read_data(), "good");
    let safety = report.safety_backup.expect("live file existed");
    assert_eq!(safety.reason, BackupReason::PreRestore);
    assert_eq!(fs::read_to_string(&safety.path).unwrap(), "broken");
}

#[tokio::test]
async fn restoring_a_snapshot_that_pruning_removes_still_succeeds() {
    let setup = Setup::new(2);
    setup.write_data("v1");
    let oldest = setup.manager.create_backup(BackupReason::Manual).await.unwrap().unwrap();
    setup.write_data("v2");
    setup.manager.create_backup(BackupReason::Manual).await.unwrap();
    setup.write_data("v3");

    setup.manager.restore_backup(&oldest.path).await.unwrap();

    assert_eq!(setup.read_data(), "v1");
    assert!(!oldest.path.exists(), "pre_restore is not exempt and pushes the oldest out");
    assert_eq!(setup.files_in_backup_dir(), 2);
}

#[tokio::test]
async fn restoring_a_missing_file_leaves_the_data_untouched() {
    let setup = Setup::new(2);
    setup.write_data("current");

    let err = setup
        .manager
        .restore_backup(&setup.dir.path().join("backups").join("nope.db"))
        .await
        .unwrap_err();

    assert!(matches!(err, BackupError::NotFound(_)));
    assert!(err.data_file_untouched());
    assert_eq!(setup.read_data(), "current");
    assert!(setup.manager.list_backups().await.unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn backup_count_never_exceeds_retention(calls in 1usize..7, retention in 1usize..4) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let setup = Setup::new(retention);
            setup.write_data("data");
            let mut names = Vec::new();
            for _ in 0..calls {
                let snapshot = setup.manager.create_backup(BackupReason::Manual).await.unwrap().unwrap();
                names.push(snapshot.filename);
                assert!(setup.files_in_backup_dir() <= retention);
            }
            let kept: Vec<_> = setup.manager.list_backups().await.unwrap().into_iter().map(|s| s.filename).collect();
            let expected: Vec<_> = names.iter().rev().take(retention).cloned().collect();
            assert_eq!(kept, expected);
        });
    }
}
