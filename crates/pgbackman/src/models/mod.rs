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

//! Domain models for the backup catalog.
//!
//! These are plain Rust types used by the admin API and the engine
//! components. Diesel row structs live in `dal::models` and are converted
//! to/from these types at the DAL boundary.

pub mod backup_definition;
pub mod backup_server;
pub mod catalog;
pub mod job_queue;
pub mod pg_bin_dir;
pub mod pgsql_node;
pub mod restore_definition;
pub mod snapshot_definition;
pub mod stats;
pub mod status;

pub use backup_definition::{BackupDefinition, NewBackupDefinition};
pub use backup_server::{BackupServer, NewBackupServer, ServerStatus};
pub use catalog::{
    BackupCatalogEntry, NewBackupCatalogEntry, NewRestoreCatalogEntry, RestoreCatalogEntry,
};
pub use job_queue::{
    DeleteArtifactPayload, JobKind, JobQueueEntry, RestorePayload, SnapshotPayload,
};
pub use pg_bin_dir::{DefaultPgBinDir, PgBinDir};
pub use pgsql_node::{NewPgsqlNode, NodeStatus, PgsqlNode};
pub use restore_definition::{NewRestoreDefinition, RestoreDefinition};
pub use snapshot_definition::{NewSnapshotDefinition, SnapshotDefinition};
pub use stats::{BackupServerStats, PgbackmanStats, PgsqlNodeStats};
pub use status::{BackupCode, ExecutionStatus, JobStatus, OneShotStatus};
