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

//! One-shot snapshot declarations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::{BackupCode, OneShotStatus};

/// A one-shot dump scheduled at a specific time through the AT queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDefinition {
    pub snapshot_id: i64,
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub at_time: DateTime<Utc>,
    pub backup_code: BackupCode,
    pub encryption: bool,
    pub retention_period: String,
    pub extra_parameters: String,
    pub tag: String,
    /// `None` means "use the source cluster's pg_dump".
    pub pg_dump_release: Option<String>,
    pub status: OneShotStatus,
    pub error_message: Option<String>,
    pub registered: DateTime<Utc>,
}

/// Registration input for a snapshot definition.
#[derive(Debug, Clone)]
pub struct NewSnapshotDefinition {
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub at_time: DateTime<Utc>,
    pub backup_code: BackupCode,
    pub encryption: bool,
    pub retention_period: String,
    pub extra_parameters: String,
    pub tag: String,
    pub pg_dump_release: Option<String>,
}
