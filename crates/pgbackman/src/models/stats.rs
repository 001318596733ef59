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

//! Aggregate statistics surfaced by the show_*_stats operations.

use serde::{Deserialize, Serialize};

/// Installation-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PgbackmanStats {
    pub backup_servers: i64,
    pub backup_servers_running: i64,
    pub backup_servers_stopped: i64,
    pub pgsql_nodes: i64,
    pub pgsql_nodes_running: i64,
    pub pgsql_nodes_down: i64,
    pub backup_definitions: i64,
    pub backup_definitions_active: i64,
    pub backup_definitions_stopped: i64,
    pub snapshot_definitions: i64,
    pub restore_definitions: i64,
    pub catalog_entries: i64,
    pub catalog_entries_succeeded: i64,
    pub catalog_entries_error: i64,
    pub catalog_size_bytes: i64,
    pub jobs_queued: i64,
}

/// Per-backup-server counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupServerStats {
    pub backup_server_id: i32,
    pub backup_definitions: i64,
    pub backup_definitions_active: i64,
    pub catalog_entries: i64,
    pub catalog_entries_succeeded: i64,
    pub catalog_entries_error: i64,
    pub catalog_size_bytes: i64,
    pub jobs_queued: i64,
}

/// Per-PgSQL-node counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PgsqlNodeStats {
    pub pgsql_node_id: i32,
    pub backup_definitions: i64,
    pub backup_definitions_active: i64,
    pub catalog_entries: i64,
    pub catalog_entries_succeeded: i64,
    pub catalog_entries_error: i64,
    pub catalog_size_bytes: i64,
}
