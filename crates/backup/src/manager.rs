//! Create, prune, list and restore data-file snapshots.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::error::{BackupError, BackupResult};
use crate::reason::BackupReason;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// `YYYYmmdd_HHMMSS_mmm`
const STAMP_LEN: usize = 19;

/// Where the live file is, where its copies go and how many to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub data_file: PathBuf,
    pub backup_dir: PathBuf,
    /// Snapshots kept after pruning. Values below 1 are treated as 1.
    pub retention: usize,
    /// Age after which startup takes a fresh snapshot.
    pub auto_interval: Duration,
    /// File name prefix; only files carrying it are managed.
    pub prefix: String,
}

impl BackupConfig {
    pub fn new(data_file: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            backup_dir: backup_dir.into(),
            retention: 2,
            auto_interval: Duration::from_secs(60 * 60),
            prefix: "swagstock".to_string(),
        }
    }
}

/// One snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupSnapshot {
    pub path: PathBuf,
    pub filename: String,
    pub reason: BackupReason,
    pub size: u64,
    /// Taken from the file name stamp.
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// What a successful restore did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored_from: PathBuf,
    /// `None` when there was no live file to protect.
    pub safety_backup: Option<BackupSnapshot>,
}

/// Snapshot rotation for one data file.
///
/// All file work runs on the blocking pool; the async methods only await it.
#[derive(Debug, Clone)]
pub struct BackupManager {
    config: BackupConfig,
}

impl BackupManager {
    pub fn new(mut config: BackupConfig) -> Self {
        config.retention = config.retention.max(1);
        Self { config }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Copy the live file into the backup directory, then prune.
    ///
    /// The copy is a plain file copy: no write may be in flight on the live
    /// file while it runs. Callers holding an open connection close it first
    /// (see `Inventory::backup` in the app crate).
    ///
    /// `Ok(None)` when there is no live file yet.
    #[instrument(skip(self), fields(reason = %reason))]
    pub async fn create_backup(&self, reason: BackupReason) -> BackupResult<Option<BackupSnapshot>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || create_blocking(&config, &reason)).await?
    }

    /// Delete all but the `retention` most recently modified snapshots. Returns what was removed.
    #[instrument(skip(self))]
    pub async fn prune_retention(&self) -> BackupResult<Vec<PathBuf>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || prune_blocking(&config)).await?
    }

    /// Snapshots, newest first.
    pub async fn list_backups(&self) -> BackupResult<Vec<BackupSnapshot>> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || list_blocking(&config)).await?
    }

    pub async fn latest_backup(&self) -> BackupResult<Option<BackupSnapshot>> {
        Ok(self.list_backups().await?.into_iter().next())
    }

    /// Take a snapshot when none exists, when the newest is older than the
    /// interval, or when `force` is set. `Ok(None)` when nothing was needed
    /// or there is no live file.
    #[instrument(skip(self))]
    pub async fn auto_backup_if_needed(&self, force: bool) -> BackupResult<Option<BackupSnapshot>> {
        let reason = if force {
            BackupReason::Forced
        } else {
            match self.latest_backup().await? {
                None => BackupReason::AutoFirst,
                Some(latest) => {
                    let age = Utc::now().signed_duration_since(latest.modified);
                    // An interval too large to represent never expires.
                    let due = TimeDelta::from_std(self.config.auto_interval)
                        .map(|interval| age >= interval)
                        .unwrap_or(false);
                    if !due {
                        tracing::debug!(latest = %latest.filename, "recent backup exists; skipping");
                        return Ok(None);
                    }
                    BackupReason::AutoScheduled
                }
            }
        };
        self.create_backup(reason).await
    }

    /// Replace the live file with `snapshot`.
    ///
    /// The snapshot is staged next to the live file first, then a
    /// `pre_restore` copy of the current file is taken, then the staged copy
    /// is renamed over the live file. If anything fails before the rename the
    /// live file is untouched and the error is [`BackupError::RestoreAborted`].
    /// The caller must have closed its connection and must reopen afterwards.
    #[instrument(skip(self), fields(snapshot = %snapshot.display()))]
    pub async fn restore_backup(&self, snapshot: &Path) -> BackupResult<RestoreReport> {
        let config = self.config.clone();
        let snapshot = snapshot.to_path_buf();
        tokio::task::spawn_blocking(move || restore_blocking(&config, &snapshot)).await?
    }
}

fn create_blocking(config: &BackupConfig, reason: &BackupReason) -> BackupResult<Option<BackupSnapshot>> {
    if !config.data_file.is_file() {
        tracing::warn!(data_file = %config.data_file.display(), "no data file to back up");
        return Ok(None);
    }
    fs::create_dir_all(&config.backup_dir)
        .map_err(|e| BackupError::io("create_backup_dir", &config.backup_dir, e))?;

    let existing = list_blocking(config)?;
    let stamp = next_stamp(Utc::now(), existing.iter().map(|s| s.created).max());
    let filename = format!(
        "{}_backup_{}_{:03}_{}.db",
        config.prefix,
        stamp.format(STAMP_FORMAT),
        stamp.timestamp_subsec_millis(),
        reason.as_tag()
    );
    let target = config.backup_dir.join(&filename);

    let size = fs::copy(&config.data_file, &target)
        .map_err(|e| BackupError::io("copy_data_file", &target, e))?;
    tracing::info!(file = %filename, size, "backup created");

    let snapshot = describe(config, &target)?.ok_or_else(|| {
        BackupError::io(
            "describe_backup",
            &target,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "unrecognised backup name"),
        )
    })?;
    prune_blocking(config)?;
    Ok(Some(snapshot))
}

/// Strictly after every existing stamp, so names stay unique and ordered.
fn next_stamp(now: DateTime<Utc>, newest_existing: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
    match newest_existing {
        Some(newest) if newest >= now => newest + TimeDelta::milliseconds(1),
        _ => now,
    }
}

fn prune_blocking(config: &BackupConfig) -> BackupResult<Vec<PathBuf>> {
    let snapshots = list_blocking(config)?;
    let mut removed = Vec::new();
    for stale in snapshots.into_iter().skip(config.retention) {
        fs::remove_file(&stale.path).map_err(|e| BackupError::io("remove_old_backup", &stale.path, e))?;
        tracing::info!(file = %stale.filename, "old backup removed");
        removed.push(stale.path);
    }
    Ok(removed)
}

fn list_blocking(config: &BackupConfig) -> BackupResult<Vec<BackupSnapshot>> {
    let entries = match fs::read_dir(&config.backup_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(BackupError::io("list_backups", &config.backup_dir, e)),
    };

    let mut snapshots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BackupError::io("list_backups", &config.backup_dir, e))?;
        if let Some(snapshot) = describe(config, &entry.path())? {
            snapshots.push(snapshot);
        }
    }
    snapshots.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.filename.cmp(&a.filename))
    });
    Ok(snapshots)
}

/// `Ok(None)` for anything in the directory that is not one of our snapshots.
fn describe(config: &BackupConfig, path: &Path) -> BackupResult<Option<BackupSnapshot>> {
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };
    let Some((created, reason)) = parse_filename(&config.prefix, filename) else {
        return Ok(None);
    };
    let metadata = fs::metadata(path).map_err(|e| BackupError::io("read_backup_metadata", path, e))?;
    if !metadata.is_file() {
        return Ok(None);
    }
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(created);

    Ok(Some(BackupSnapshot {
        path: path.to_path_buf(),
        filename: filename.to_string(),
        reason,
        size: metadata.len(),
        created,
        modified,
    }))
}

fn parse_filename(prefix: &str, filename: &str) -> Option<(DateTime<Utc>, BackupReason)> {
    let rest = filename
        .strip_prefix(prefix)?
        .strip_prefix("_backup_")?
        .strip_suffix(".db")?;
    if rest.len() < STAMP_LEN + 2 || !rest.is_char_boundary(STAMP_LEN) {
        return None;
    }
    let (stamp, tail) = rest.split_at(STAMP_LEN);
    if !stamp.is_ascii() {
        return None;
    }
    let tag = tail.strip_prefix('_').filter(|t| !t.is_empty())?;

    let (seconds, millis) = stamp.split_at(15);
    let naive = NaiveDateTime::parse_from_str(seconds, STAMP_FORMAT).ok()?;
    let millis: i64 = millis.strip_prefix('_')?.parse().ok()?;
    let created = naive.and_utc() + TimeDelta::milliseconds(millis);
    Some((created, BackupReason::from_tag(tag)))
}

fn restore_blocking(config: &BackupConfig, snapshot: &Path) -> BackupResult<RestoreReport> {
    if !snapshot.is_file() {
        tracing::error!(snapshot = %snapshot.display(), "backup to restore does not exist");
        return Err(BackupError::NotFound(snapshot.to_path_buf()));
    }

    // Stage first: pruning after the safety copy may delete the chosen snapshot.
    let staged = sibling(&config.data_file, "restore-staging");
    if let Some(parent) = staged.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| BackupError::RestoreAborted(Box::new(BackupError::io("create_data_dir", parent, e))))?;
    }
    fs::copy(snapshot, &staged)
        .map_err(|e| BackupError::RestoreAborted(Box::new(BackupError::io("stage_restore", &staged, e))))?;

    let safety_backup = match create_blocking(config, &BackupReason::PreRestore) {
        Ok(safety) => safety,
        Err(err) => {
            discard(&staged);
            tracing::error!(error = %err, "pre-restore backup failed; live data file left as is");
            return Err(BackupError::RestoreAborted(Box::new(err)));
        }
    };

    // A leftover rollback journal would be replayed against the restored bytes.
    for suffix in ["journal", "wal", "shm"] {
        let side = sibling(&config.data_file, suffix);
        if side.exists() {
            fs::remove_file(&side).map_err(|e| {
                discard(&staged);
                BackupError::RestoreAborted(Box::new(BackupError::io("remove_journal", &side, e)))
            })?;
        }
    }

    fs::rename(&staged, &config.data_file).map_err(|e| {
        discard(&staged);
        BackupError::io("replace_data_file", &config.data_file, e)
    })?;

    tracing::info!(
        safety_backup = safety_backup.as_ref().map(|s| s.filename.as_str()),
        "data file restored"
    );
    Ok(RestoreReport {
        restored_from: snapshot.to_path_buf(),
        safety_backup,
    })
}

/// `stock.db` -> `stock.db-{suffix}`
fn sibling(data_file: &Path, suffix: &str) -> PathBuf {
    let mut name = data_file.as_os_str().to_owned();
    name.push("-");
    name.push(suffix);
    PathBuf::from(name)
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %err, "failed to remove staged restore file");
    }
}
