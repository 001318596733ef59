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

//! Data access layer for the backup catalog.
//!
//! One DAL struct per entity, each borrowing the central [`DAL`] which owns
//! the connection pool. Mutating operations that must also enqueue job-queue
//! rows do so inside a single transaction, so the queue can never disagree
//! with the definitions.

pub mod backup_definition;
pub mod backup_server;
pub mod catalog;
pub mod catalog_info;
pub mod job_queue;
pub mod models;
pub mod pg_bin_dir;
pub mod pgsql_node;
pub mod restore;
pub mod snapshot;
pub mod stats;

use crate::database::Database;

pub use backup_definition::{BackupDefinitionDAL, DefinitionDeletion};
pub use backup_server::{BackupServerDAL, TopologyDeletion};
pub use catalog::{BackupCatalogDAL, RestoreCatalogDAL};
pub use catalog_info::CatalogInfoDAL;
pub use job_queue::JobQueueDAL;
pub use pg_bin_dir::PgBinDirDAL;
pub use pgsql_node::PgsqlNodeDAL;
pub use restore::RestoreDefinitionDAL;
pub use snapshot::SnapshotDefinitionDAL;
pub use stats::StatsDAL;

/// Central data access layer handle.
///
/// `DAL` is cheap to clone; all clones share the same pool.
#[derive(Clone, Debug)]
pub struct DAL {
    pub database: Database,
}

impl DAL {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn backup_server(&self) -> BackupServerDAL<'_> {
        BackupServerDAL { dal: self }
    }

    pub fn pgsql_node(&self) -> PgsqlNodeDAL<'_> {
        PgsqlNodeDAL { dal: self }
    }

    pub fn backup_definition(&self) -> BackupDefinitionDAL<'_> {
        BackupDefinitionDAL { dal: self }
    }

    pub fn snapshot_definition(&self) -> SnapshotDefinitionDAL<'_> {
        SnapshotDefinitionDAL { dal: self }
    }

    pub fn restore_definition(&self) -> RestoreDefinitionDAL<'_> {
        RestoreDefinitionDAL { dal: self }
    }

    pub fn backup_catalog(&self) -> BackupCatalogDAL<'_> {
        BackupCatalogDAL { dal: self }
    }

    pub fn restore_catalog(&self) -> RestoreCatalogDAL<'_> {
        RestoreCatalogDAL { dal: self }
    }

    pub fn job_queue(&self) -> JobQueueDAL<'_> {
        JobQueueDAL { dal: self }
    }

    pub fn pg_bin_dir(&self) -> PgBinDirDAL<'_> {
        PgBinDirDAL { dal: self }
    }

    pub fn catalog_info(&self) -> CatalogInfoDAL<'_> {
        CatalogInfoDAL { dal: self }
    }

    pub fn stats(&self) -> StatsDAL<'_> {
        StatsDAL { dal: self }
    }
}
