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

//! Retention selection against the documented operator expectations.

use chrono::{DateTime, Duration, TimeZone, Utc};

use pgbackman::maintenance::select_expired;
use pgbackman::models::{BackupCatalogEntry, ExecutionStatus};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

fn entry(bck_id: i64, finished_days_ago: i64) -> BackupCatalogEntry {
    BackupCatalogEntry {
        bck_id,
        def_id: Some(1),
        snapshot_id: None,
        procpid: 0,
        backup_server_id: 1,
        pgsql_node_id: 1,
        dbname: "salesdb".to_string(),
        started: now() - Duration::days(finished_days_ago) - Duration::minutes(10),
        finished: now() - Duration::days(finished_days_ago),
        duration: "00:10:00".to_string(),
        pg_dump_file: format!("/srv/pgbackman/db01/salesdb/1_{}.dump", bck_id),
        pg_dump_file_size: 1024,
        pg_dump_log_file: format!("/srv/pgbackman/db01/salesdb/1_{}.dump.log", bck_id),
        globals_file: String::new(),
        globals_file_size: 0,
        globals_log_file: String::new(),
        indexes_file: String::new(),
        indexes_file_size: 0,
        indexes_log_file: String::new(),
        execution_status: ExecutionStatus::Succeeded,
        execution_return_code: 0,
        error_message: String::new(),
        pg_dump_release: Some("16".to_string()),
        role_list: Vec::new(),
        extra_info: String::new(),
        deleted: false,
        alerted_at: None,
        registered: now(),
    }
}

#[test]
fn three_day_period_with_redundancy_two() {
    // Rows finished 1, 2, 4 and 5 days ago, all SUCCEEDED, period 3 days,
    // redundancy 2: the 1d and 2d rows fill the redundancy floor, the 4d
    // and 5d rows are past the period and expire.
    let entries = vec![entry(1, 1), entry(2, 2), entry(3, 4), entry(4, 5)];

    let expired = select_expired(&entries, 2, Duration::days(3), None, now());
    let ids: Vec<i64> = expired.iter().map(|e| e.bck_id).collect();

    assert_eq!(ids, vec![3, 4]);
}

#[test]
fn redundancy_overrides_any_retention_period() {
    // Even a zero-length period never erodes the redundancy floor.
    let entries = vec![entry(1, 100), entry(2, 200), entry(3, 300)];

    let expired = select_expired(&entries, 3, Duration::zero(), None, now());
    assert!(expired.is_empty());
}

#[test]
fn expired_rows_carry_their_artifact_files() {
    // The DELETE_ARTIFACT payload is built from the row's path columns;
    // empty columns must not produce empty unlink targets.
    let entries = vec![entry(1, 1), entry(2, 10)];
    let expired = select_expired(&entries, 1, Duration::days(3), None, now());

    assert_eq!(expired.len(), 1);
    let files = expired[0].artifact_files();
    assert_eq!(
        files,
        vec![
            "/srv/pgbackman/db01/salesdb/1_2.dump".to_string(),
            "/srv/pgbackman/db01/salesdb/1_2.dump.log".to_string(),
        ]
    );
}
