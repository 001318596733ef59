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

//! Pending-log drain flows over real spool files.

use std::sync::Mutex;

use async_trait::async_trait;

use pgbackman::error::CatalogError;
use pgbackman::models::ExecutionStatus;
use pgbackman::spool::{self, CatalogSink, PendingRecord};

struct MemorySink {
    records: Mutex<Vec<PendingRecord>>,
}

impl MemorySink {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
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

const LEGACY_LINE: &str = "9::1234::1::3::salesdb::2024-03-01 02:30:00::2024-03-01 02:31:40\
::00:01:40::/srv/b/9_77.dump::2048::/srv/b/9_77.dump.log::/srv/b/9_77.globals::128\
::/srv/b/9_77.globals.log::::0::::ERROR::2::pg_dump: connection refused::16\
::::pgowner::\n";

#[tokio::test]
async fn legacy_line_is_ingested_and_file_removed() {
    // A crashed catalog left one legacy-format line behind. On drain the
    // row is ingested with the status recorded in field 18 and the file
    // disappears.
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let dir = spool::spool_dir(root);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(spool::spool_file(root, 3), LEGACY_LINE).unwrap();

    let sink = MemorySink::new();
    let report = spool::drain(&dir, &sink).await.unwrap();

    assert_eq!(report.files_removed, 1);
    assert_eq!(report.records_ingested, 1);
    assert!(!spool::spool_file(root, 3).exists());

    let records = sink.records.lock().unwrap();
    let PendingRecord::Backup(record) = &records[0] else {
        panic!("expected a backup record");
    };
    assert_eq!(record.def_id, Some(9));
    assert_eq!(record.execution_status, ExecutionStatus::Error);
    assert_eq!(record.execution_return_code, 2);
    assert_eq!(record.error_message, "pg_dump: connection refused");
}

#[tokio::test]
async fn drain_twice_converges_to_the_same_state() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let dir = spool::spool_dir(root);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(spool::spool_file(root, 3), LEGACY_LINE).unwrap();

    let sink = MemorySink::new();
    spool::drain(&dir, &sink).await.unwrap();
    let after_first = sink.records.lock().unwrap().clone();

    // Write the same line again (an executor retry) and drain again.
    std::fs::write(spool::spool_file(root, 3), LEGACY_LINE).unwrap();
    spool::drain(&dir, &sink).await.unwrap();

    assert_eq!(*sink.records.lock().unwrap(), after_first);
    assert!(!spool::spool_file(root, 3).exists());
}

#[tokio::test]
async fn mixed_format_files_drain_both_generations() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    // One legacy line already on disk, one v2 record appended by the
    // current executor into the same spool file.
    let dir = spool::spool_dir(root);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(spool::spool_file(root, 3), LEGACY_LINE).unwrap();

    let v2 = {
        let parsed = spool::parse_line(LEGACY_LINE.trim_end(), 1).unwrap();
        let PendingRecord::Backup(mut record) = parsed else {
            panic!("expected a backup record");
        };
        record.def_id = Some(10);
        record.dbname = "webdb".to_string();
        PendingRecord::Backup(record)
    };
    spool::append(root, 3, &v2).unwrap();

    let sink = MemorySink::new();
    let report = spool::drain(&dir, &sink).await.unwrap();

    assert_eq!(report.records_ingested, 2);
    assert_eq!(sink.records.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_file_is_left_for_the_operator() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let dir = spool::spool_dir(root);
    std::fs::create_dir_all(&dir).unwrap();

    let good = spool::spool_file(root, 1);
    let bad = spool::spool_file(root, 2);
    std::fs::write(&good, LEGACY_LINE).unwrap();
    std::fs::write(&bad, "only::five::fields::in::total\n").unwrap();

    let sink = MemorySink::new();
    let report = spool::drain(&dir, &sink).await.unwrap();

    // The good file drains; the bad one survives untouched.
    assert_eq!(report.files_removed, 1);
    assert_eq!(report.files_retained, 1);
    assert!(!good.exists());
    assert!(bad.exists());
}
