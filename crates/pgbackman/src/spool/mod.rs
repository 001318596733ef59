/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Pending-log spool: catalog rows that could not reach the database.
//!
//! When the executor finishes a dump but the catalog is unreachable, it
//! appends the row to a per-node file under
//! `{root_backup_partition}/pending_updates/`. The control daemon drains
//! the spool on startup and on schedule.
//!
//! Two line formats coexist:
//!
//! - **Legacy (v1)**: 24 `::`-separated fields, field 22 a space-separated
//!   role list, empty `def_id` / `snapshot_id` meaning null. Read-only; kept
//!   for one-time drains of files written by older installations.
//! - **v2**: one JSON object per line carrying a version tag. Escape-aware,
//!   so role names and error messages with arbitrary content survive.
//!
//! A file is unlinked only after every line was ingested. A file with any
//! malformed line is never unlinked; ingestion in the catalog is idempotent
//! so re-draining is safe.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::dal::DAL;
use crate::error::{CatalogError, SpoolError, WorkerError};
use crate::models::{ExecutionStatus, NewBackupCatalogEntry, NewRestoreCatalogEntry};

/// Directory under the root backup partition holding spool files.
pub const PENDING_DIR: &str = "pending_updates";

/// Spool file name prefix; the node id is appended.
pub const PENDING_FILE_STEM: &str = "backup_jobs_pending_log_updates_nodeid";

const LEGACY_FIELD_COUNT: usize = 24;

/// One spooled catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum PendingRecord {
    Backup(PendingBackupRecord),
    Restore(PendingRestoreRecord),
}

/// A backup catalog row in spool form. Field order mirrors the legacy
/// 24-field layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBackupRecord {
    pub def_id: Option<i64>,
    pub procpid: i32,
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub duration: String,
    pub pg_dump_file: String,
    pub pg_dump_file_size: i64,
    pub pg_dump_log_file: String,
    pub globals_file: String,
    pub globals_file_size: i64,
    pub globals_log_file: String,
    pub indexes_file: String,
    pub indexes_file_size: i64,
    pub indexes_log_file: String,
    pub execution_status: ExecutionStatus,
    pub execution_return_code: i32,
    pub error_message: String,
    pub pg_dump_release: Option<String>,
    pub snapshot_id: Option<i64>,
    pub role_list: Vec<String>,
    pub extra_info: String,
}

impl PendingBackupRecord {
    /// Converts to a catalog insert. `bck_id` is zero; the idempotent
    /// ingestion path assigns a fresh one from the sequence.
    pub fn to_catalog_entry(&self) -> NewBackupCatalogEntry {
        NewBackupCatalogEntry {
            bck_id: 0,
            def_id: self.def_id,
            snapshot_id: self.snapshot_id,
            procpid: self.procpid,
            backup_server_id: self.backup_server_id,
            pgsql_node_id: self.pgsql_node_id,
            dbname: self.dbname.clone(),
            started: self.started,
            finished: self.finished,
            duration: self.duration.clone(),
            pg_dump_file: self.pg_dump_file.clone(),
            pg_dump_file_size: self.pg_dump_file_size,
            pg_dump_log_file: self.pg_dump_log_file.clone(),
            globals_file: self.globals_file.clone(),
            globals_file_size: self.globals_file_size,
            globals_log_file: self.globals_log_file.clone(),
            indexes_file: self.indexes_file.clone(),
            indexes_file_size: self.indexes_file_size,
            indexes_log_file: self.indexes_log_file.clone(),
            execution_status: self.execution_status,
            execution_return_code: self.execution_return_code,
            error_message: self.error_message.clone(),
            pg_dump_release: self.pg_dump_release.clone(),
            role_list: self.role_list.clone(),
            extra_info: self.extra_info.clone(),
        }
    }
}

/// A restore catalog row in spool form. Only written in v2; the legacy
/// format never carried restores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRestoreRecord {
    pub restore_id: i64,
    pub procpid: i32,
    pub backup_server_id: i32,
    pub target_pgsql_node_id: i32,
    pub bck_id: i64,
    pub target_dbname: String,
    pub renamed_dbname: Option<String>,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub duration: String,
    pub restore_log_file: String,
    pub execution_status: ExecutionStatus,
    pub execution_return_code: i32,
    pub error_message: String,
    pub pg_restore_release: Option<String>,
    pub role_list: Vec<String>,
}

impl PendingRestoreRecord {
    pub fn to_catalog_entry(&self) -> NewRestoreCatalogEntry {
        NewRestoreCatalogEntry {
            restore_id: self.restore_id,
            procpid: self.procpid,
            backup_server_id: self.backup_server_id,
            target_pgsql_node_id: self.target_pgsql_node_id,
            bck_id: self.bck_id,
            target_dbname: self.target_dbname.clone(),
            renamed_dbname: self.renamed_dbname.clone(),
            started: self.started,
            finished: self.finished,
            duration: self.duration.clone(),
            restore_log_file: self.restore_log_file.clone(),
            execution_status: self.execution_status,
            execution_return_code: self.execution_return_code,
            error_message: self.error_message.clone(),
            pg_restore_release: self.pg_restore_release.clone(),
            role_list: self.role_list.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct VersionedLine {
    v: u32,
    #[serde(flatten)]
    record: PendingRecord,
}

/// Serializes a record into one v2 spool line (no trailing newline).
pub fn format_line(record: &PendingRecord) -> String {
    serde_json::to_string(&VersionedLine {
        v: 2,
        record: record.clone(),
    })
    .unwrap_or_default()
}

/// Parses one spool line, auto-detecting the format.
pub fn parse_line(line: &str, line_no: usize) -> Result<PendingRecord, SpoolError> {
    let malformed = |reason: String| SpoolError::Malformed { line_no, reason };

    if line.trim_start().starts_with('{') {
        let versioned: VersionedLine =
            serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
        if versioned.v != 2 {
            return Err(malformed(format!("unknown spool version {}", versioned.v)));
        }
        return Ok(versioned.record);
    }

    parse_legacy_line(line, line_no)
}

/// Parses a legacy 24-field `::`-delimited line into a backup record.
fn parse_legacy_line(line: &str, line_no: usize) -> Result<PendingRecord, SpoolError> {
    let malformed = |reason: String| SpoolError::Malformed { line_no, reason };

    let line = line.trim_end_matches('\n');
    let fields: Vec<&str> = line.split("::").collect();

    if fields.len() != LEGACY_FIELD_COUNT {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            LEGACY_FIELD_COUNT,
            fields.len()
        )));
    }

    let opt_i64 = |raw: &str, name: &str| -> Result<Option<i64>, SpoolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|_| malformed(format!("invalid {}: '{}'", name, raw)))
    };

    let num = |raw: &str, name: &str| -> Result<i64, SpoolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(0);
        }
        raw.parse()
            .map_err(|_| malformed(format!("invalid {}: '{}'", name, raw)))
    };

    let def_id = opt_i64(fields[0], "def_id")?;
    let snapshot_id = opt_i64(fields[21], "snapshot_id")?;

    if def_id.is_some() == snapshot_id.is_some() {
        return Err(malformed(
            "exactly one of def_id / snapshot_id must be set".to_string(),
        ));
    }

    let execution_status: ExecutionStatus = fields[17]
        .parse()
        .map_err(|_| malformed(format!("invalid execution_status: '{}'", fields[17])))?;

    let pg_dump_release = {
        let raw = fields[20].trim();
        if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        }
    };

    let role_list: Vec<String> = fields[22]
        .split(' ')
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    Ok(PendingRecord::Backup(PendingBackupRecord {
        def_id,
        procpid: num(fields[1], "procpid")? as i32,
        backup_server_id: num(fields[2], "backup_server_id")? as i32,
        pgsql_node_id: num(fields[3], "pgsql_node_id")? as i32,
        dbname: fields[4].to_string(),
        started: parse_timestamp(fields[5]).map_err(|e| malformed(e))?,
        finished: parse_timestamp(fields[6]).map_err(|e| malformed(e))?,
        duration: fields[7].to_string(),
        pg_dump_file: fields[8].to_string(),
        pg_dump_file_size: num(fields[9], "pg_dump_file_size")?,
        pg_dump_log_file: fields[10].to_string(),
        globals_file: fields[11].to_string(),
        globals_file_size: num(fields[12], "globals_file_size")?,
        globals_log_file: fields[13].to_string(),
        indexes_file: fields[14].to_string(),
        indexes_file_size: num(fields[15], "indexes_file_size")?,
        indexes_log_file: fields[16].to_string(),
        execution_status,
        execution_return_code: num(fields[18], "return_code")? as i32,
        error_message: fields[19].to_string(),
        pg_dump_release,
        snapshot_id,
        role_list,
        extra_info: fields[23].to_string(),
    }))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("invalid timestamp: '{}'", raw))
}

/// The spool directory for a root backup partition.
pub fn spool_dir(root_backup_partition: &Path) -> PathBuf {
    root_backup_partition.join(PENDING_DIR)
}

/// The spool file for a node.
pub fn spool_file(root_backup_partition: &Path, pgsql_node_id: i32) -> PathBuf {
    spool_dir(root_backup_partition).join(format!("{}{}", PENDING_FILE_STEM, pgsql_node_id))
}

/// Appends a record to the node's spool file, creating the spool directory
/// on first use.
pub fn append(
    root_backup_partition: &Path,
    pgsql_node_id: i32,
    record: &PendingRecord,
) -> Result<(), SpoolError> {
    let dir = spool_dir(root_backup_partition);
    fs::create_dir_all(&dir).map_err(|e| SpoolError::Io {
        path: dir.clone(),
        source: e,
    })?;

    let path = spool_file(root_backup_partition, pgsql_node_id);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| SpoolError::Io {
            path: path.clone(),
            source: e,
        })?;

    let mut line = format_line(record);
    line.push('\n');
    file.write_all(line.as_bytes()).map_err(|e| SpoolError::Io {
        path: path.clone(),
        source: e,
    })?;
    file.sync_all().map_err(|e| SpoolError::Io {
        path,
        source: e,
    })?;

    Ok(())
}

/// Where drained records land. Implemented over the DAL in production and
/// over memory in tests.
#[async_trait]
pub trait CatalogSink: Send + Sync {
    /// Ingests one record; returns whether a row was actually inserted
    /// (false when deduplicated).
    async fn ingest(&self, record: &PendingRecord) -> Result<bool, CatalogError>;
}

/// Production sink: versioned idempotent insertion into the catalog.
pub struct DalCatalogSink {
    pub dal: DAL,
}

#[async_trait]
impl CatalogSink for DalCatalogSink {
    async fn ingest(&self, record: &PendingRecord) -> Result<bool, CatalogError> {
        match record {
            PendingRecord::Backup(r) => {
                self.dal
                    .backup_catalog()
                    .ingest_pending(r.to_catalog_entry())
                    .await
            }
            PendingRecord::Restore(r) => {
                self.dal
                    .restore_catalog()
                    .ingest_pending(r.to_catalog_entry())
                    .await
            }
        }
    }
}

/// Drain outcome counters.
#[derive(Debug, Default, PartialEq)]
pub struct DrainReport {
    pub files_removed: usize,
    pub files_retained: usize,
    pub records_ingested: usize,
    pub lines_failed: usize,
}

/// Drains every spool file under `dir`.
///
/// Each file is all-or-nothing: its lines are parsed up front, and a file
/// containing any malformed line is ingested not at all and kept on disk.
/// Files whose every line was ingested are unlinked. A catalog failure
/// aborts the drain with the current file retained; ingestion idempotency
/// makes the retry safe.
pub async fn drain(dir: &Path, sink: &dyn CatalogSink) -> Result<DrainReport, WorkerError> {
    let mut report = DrainReport::default();

    if !dir.is_dir() {
        return Ok(report);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| WorkerError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PENDING_FILE_STEM))
        })
        .collect();
    paths.sort();

    for path in paths {
        let content = fs::read_to_string(&path).map_err(|e| WorkerError::io(&path, e))?;

        let mut records = Vec::new();
        let mut failed = 0;
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line, idx + 1) {
                Ok(record) => records.push(record),
                Err(e) => {
                    error!(file = %path.display(), "{}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            warn!(
                file = %path.display(),
                failed, "spool file has malformed lines, keeping it on disk"
            );
            report.files_retained += 1;
            report.lines_failed += failed;
            continue;
        }

        for record in &records {
            if sink.ingest(record).await? {
                report.records_ingested += 1;
            }
        }

        fs::remove_file(&path).map_err(|e| WorkerError::io(&path, e))?;
        info!(file = %path.display(), records = records.len(), "spool file drained");
        report.files_removed += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> PendingBackupRecord {
        PendingBackupRecord {
            def_id: Some(7),
            procpid: 4242,
            backup_server_id: 1,
            pgsql_node_id: 3,
            dbname: "salesdb".to_string(),
            started: Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap(),
            finished: Utc.with_ymd_and_hms(2024, 3, 1, 2, 31, 40).unwrap(),
            duration: "00:01:40".to_string(),
            pg_dump_file: "/backups/db01/salesdb/2024/03/01/7_99.dump".to_string(),
            pg_dump_file_size: 1048576,
            pg_dump_log_file: "/backups/db01/salesdb/2024/03/01/7_99.dump.log".to_string(),
            globals_file: "/backups/db01/salesdb/2024/03/01/7_99.globals".to_string(),
            globals_file_size: 2048,
            globals_log_file: "/backups/db01/salesdb/2024/03/01/7_99.globals.log".to_string(),
            indexes_file: String::new(),
            indexes_file_size: 0,
            indexes_log_file: String::new(),
            execution_status: ExecutionStatus::Succeeded,
            execution_return_code: 0,
            error_message: String::new(),
            pg_dump_release: Some("16".to_string()),
            snapshot_id: None,
            role_list: vec!["sales_owner".to_string(), "sales_ro".to_string()],
            extra_info: String::new(),
        }
    }

    fn legacy_line() -> String {
        "7::4242::1::3::salesdb::2024-03-01 02:30:00::2024-03-01 02:31:40::00:01:40\
         ::/b/7_99.dump::1048576::/b/7_99.dump.log::/b/7_99.globals::2048\
         ::/b/7_99.globals.log::::0::::SUCCEEDED::0::::16::::sales_owner sales_ro::"
            .to_string()
    }

    #[test]
    fn v2_round_trip() {
        let record = PendingRecord::Backup(sample_record());
        let line = format_line(&record);
        let parsed = parse_line(&line, 1).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn v2_survives_roles_with_spaces() {
        let mut inner = sample_record();
        inner.role_list = vec!["role with spaces".to_string()];
        inner.error_message = "contains :: delimiter".to_string();
        let record = PendingRecord::Backup(inner);

        let parsed = parse_line(&format_line(&record), 1).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn legacy_line_parses() {
        let parsed = parse_line(&legacy_line(), 1).unwrap();
        let PendingRecord::Backup(record) = parsed else {
            panic!("expected a backup record");
        };

        assert_eq!(record.def_id, Some(7));
        assert_eq!(record.snapshot_id, None);
        assert_eq!(record.dbname, "salesdb");
        assert_eq!(record.pg_dump_file_size, 1048576);
        assert_eq!(record.execution_status, ExecutionStatus::Succeeded);
        assert_eq!(record.role_list, vec!["sales_owner", "sales_ro"]);
    }

    #[test]
    fn legacy_line_with_wrong_field_count_is_rejected() {
        let e = parse_line("1::2::3", 4).unwrap_err();
        assert!(matches!(e, SpoolError::Malformed { line_no: 4, .. }));
    }

    #[test]
    fn legacy_line_requires_exactly_one_owner() {
        // Both def_id and snapshot_id set.
        let line = legacy_line().replacen("::16::::", "::16::8::", 1);
        assert!(parse_line(&line, 1).is_err());
    }

    struct MemorySink {
        records: std::sync::Mutex<Vec<PendingRecord>>,
    }

    #[async_trait]
    impl CatalogSink for MemorySink {
        async fn ingest(&self, record: &PendingRecord) -> Result<bool, CatalogError> {
            let mut records = self.records.lock().unwrap();
            if records.contains(record) {
                return Ok(false);
            }
            records.push(record.clone());
            Ok(true)
        }
    }

    #[tokio::test]
    async fn drain_removes_fully_ingested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        append(root, 3, &PendingRecord::Backup(sample_record())).unwrap();

        let sink = MemorySink {
            records: std::sync::Mutex::new(Vec::new()),
        };
        let report = drain(&spool_dir(root), &sink).await.unwrap();

        assert_eq!(report.files_removed, 1);
        assert_eq!(report.records_ingested, 1);
        assert!(!spool_file(root, 3).exists());

        // Second drain over the now-empty directory is a no-op.
        let report = drain(&spool_dir(root), &sink).await.unwrap();
        assert_eq!(report, DrainReport::default());
    }

    #[tokio::test]
    async fn drain_is_idempotent_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let record = PendingRecord::Backup(sample_record());

        // The same row spooled twice (retry after a partial failure).
        append(root, 3, &record).unwrap();
        append(root, 3, &record).unwrap();

        let sink = MemorySink {
            records: std::sync::Mutex::new(Vec::new()),
        };
        let report = drain(&spool_dir(root), &sink).await.unwrap();

        assert_eq!(report.records_ingested, 1);
        assert_eq!(sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn drain_keeps_files_with_malformed_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let dir = spool_dir(root);
        fs::create_dir_all(&dir).unwrap();

        let path = spool_file(root, 5);
        fs::write(&path, "not::a::valid::line\n").unwrap();

        let sink = MemorySink {
            records: std::sync::Mutex::new(Vec::new()),
        };
        let report = drain(&dir, &sink).await.unwrap();

        assert_eq!(report.files_retained, 1);
        assert_eq!(report.lines_failed, 1);
        assert_eq!(report.records_ingested, 0);
        assert!(path.exists());
    }

    #[test]
    fn spool_paths_follow_the_layout() {
        let root = Path::new("/srv/backups");
        assert_eq!(
            spool_file(root, 12),
            PathBuf::from("/srv/backups/pending_updates/backup_jobs_pending_log_updates_nodeid12")
        );
    }
}
