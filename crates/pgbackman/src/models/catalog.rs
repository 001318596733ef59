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

//! Catalog rows: one per executed (or failed) dump or restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::ExecutionStatus;

/// One executed backup, successful or not.
///
/// Append-only from the executor's perspective; only the maintenance loop
/// deletes rows (together with their artifact files) under retention rules.
/// Exactly one of `def_id` / `snapshot_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupCatalogEntry {
    pub bck_id: i64,
    pub def_id: Option<i64>,
    pub snapshot_id: Option<i64>,
    pub procpid: i32,
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    /// `HH:MM:SS` wall-clock duration, as recorded by the executor.
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
    pub role_list: Vec<String>,
    pub extra_info: String,
    /// Artifacts removed by retention; the row stays, marked deleted.
    pub deleted: bool,
    pub alerted_at: Option<DateTime<Utc>>,
    pub registered: DateTime<Utc>,
}

impl BackupCatalogEntry {
    /// All artifact file paths referenced by this row, empty columns skipped.
    pub fn artifact_files(&self) -> Vec<String> {
        [
            &self.pg_dump_file,
            &self.pg_dump_log_file,
            &self.globals_file,
            &self.globals_log_file,
            &self.indexes_file,
            &self.indexes_log_file,
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect()
    }
}

/// Insertion input for a backup catalog row.
///
/// `bck_id` is carried explicitly because the executor reserves it from the
/// catalog sequence before the dump starts - artifact filenames embed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBackupCatalogEntry {
    pub bck_id: i64,
    pub def_id: Option<i64>,
    pub snapshot_id: Option<i64>,
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
    pub role_list: Vec<String>,
    pub extra_info: String,
}

/// One executed restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreCatalogEntry {
    pub rst_id: i64,
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
    pub alerted_at: Option<DateTime<Utc>>,
    pub registered: DateTime<Utc>,
}

/// Insertion input for a restore catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRestoreCatalogEntry {
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
