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

//! Diesel row models.
//!
//! Status and code columns are stored as text; conversion to the domain
//! enums happens here, at the DAL boundary. A row that fails to convert is
//! reported as [`CatalogError::CorruptRow`] rather than silently skipped.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::database::schema::*;
use crate::database::schema::job_queue;
use crate::error::CatalogError;
use crate::models::*;
use crate::scheduling::CronSchedule;

fn corrupt<E: std::fmt::Display>(what: &str, e: E) -> CatalogError {
    CatalogError::CorruptRow(format!("{}: {}", what, e))
}

// ============================================================================
// Backup Server Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = backup_servers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgBackupServer {
    pub server_id: i32,
    pub hostname: String,
    pub domain_name: String,
    pub status: String,
    pub remarks: String,
    pub registered: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = backup_servers)]
pub struct NewPgBackupServer {
    pub hostname: String,
    pub domain_name: String,
    pub status: String,
    pub remarks: String,
}

impl TryFrom<PgBackupServer> for BackupServer {
    type Error = CatalogError;

    fn try_from(pg: PgBackupServer) -> Result<Self, Self::Error> {
        Ok(BackupServer {
            server_id: pg.server_id,
            hostname: pg.hostname,
            domain_name: pg.domain_name,
            status: pg
                .status
                .parse()
                .map_err(|e| corrupt("backup_servers.status", e))?,
            remarks: pg.remarks,
            registered: pg.registered,
        })
    }
}

impl From<NewBackupServer> for NewPgBackupServer {
    fn from(new: NewBackupServer) -> Self {
        NewPgBackupServer {
            hostname: new.hostname,
            domain_name: new.domain_name,
            status: new.status.as_str().to_string(),
            remarks: new.remarks,
        }
    }
}

// ============================================================================
// PgSQL Node Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = pgsql_nodes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgPgsqlNode {
    pub node_id: i32,
    pub hostname: String,
    pub domain_name: String,
    pub pgport: i32,
    pub admin_user: String,
    pub status: String,
    pub remarks: String,
    pub registered: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = pgsql_nodes)]
pub struct NewPgPgsqlNode {
    pub hostname: String,
    pub domain_name: String,
    pub pgport: i32,
    pub admin_user: String,
    pub status: String,
    pub remarks: String,
}

impl TryFrom<PgPgsqlNode> for PgsqlNode {
    type Error = CatalogError;

    fn try_from(pg: PgPgsqlNode) -> Result<Self, Self::Error> {
        Ok(PgsqlNode {
            node_id: pg.node_id,
            hostname: pg.hostname,
            domain_name: pg.domain_name,
            pgport: pg.pgport,
            admin_user: pg.admin_user,
            status: pg
                .status
                .parse()
                .map_err(|e| corrupt("pgsql_nodes.status", e))?,
            remarks: pg.remarks,
            registered: pg.registered,
        })
    }
}

impl From<NewPgsqlNode> for NewPgPgsqlNode {
    fn from(new: NewPgsqlNode) -> Self {
        NewPgPgsqlNode {
            hostname: new.hostname,
            domain_name: new.domain_name,
            pgport: new.pgport,
            admin_user: new.admin_user,
            status: new.status.as_str().to_string(),
            remarks: new.remarks,
        }
    }
}

// ============================================================================
// Backup Definition Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = backup_definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgBackupDefinition {
    pub def_id: i64,
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub minutes_cron: String,
    pub hours_cron: String,
    pub day_month_cron: String,
    pub month_cron: String,
    pub weekday_cron: String,
    pub backup_code: String,
    pub encryption: bool,
    pub retention_period: String,
    pub retention_redundancy: i32,
    pub extra_parameters: String,
    pub job_status: String,
    pub remarks: String,
    pub registered: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = backup_definitions)]
pub struct NewPgBackupDefinition {
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub minutes_cron: String,
    pub hours_cron: String,
    pub day_month_cron: String,
    pub month_cron: String,
    pub weekday_cron: String,
    pub backup_code: String,
    pub encryption: bool,
    pub retention_period: String,
    pub retention_redundancy: i32,
    pub extra_parameters: String,
    pub job_status: String,
    pub remarks: String,
}

impl TryFrom<PgBackupDefinition> for BackupDefinition {
    type Error = CatalogError;

    fn try_from(pg: PgBackupDefinition) -> Result<Self, Self::Error> {
        Ok(BackupDefinition {
            def_id: pg.def_id,
            backup_server_id: pg.backup_server_id,
            pgsql_node_id: pg.pgsql_node_id,
            dbname: pg.dbname,
            schedule: CronSchedule {
                minutes: pg.minutes_cron,
                hours: pg.hours_cron,
                day_month: pg.day_month_cron,
                month: pg.month_cron,
                weekday: pg.weekday_cron,
            },
            backup_code: pg
                .backup_code
                .parse()
                .map_err(|e| corrupt("backup_definitions.backup_code", e))?,
            encryption: pg.encryption,
            retention_period: pg.retention_period,
            retention_redundancy: pg.retention_redundancy,
            extra_parameters: pg.extra_parameters,
            job_status: pg
                .job_status
                .parse()
                .map_err(|e| corrupt("backup_definitions.job_status", e))?,
            remarks: pg.remarks,
            registered: pg.registered,
            updated: pg.updated,
        })
    }
}

impl From<NewBackupDefinition> for NewPgBackupDefinition {
    fn from(new: NewBackupDefinition) -> Self {
        NewPgBackupDefinition {
            backup_server_id: new.backup_server_id,
            pgsql_node_id: new.pgsql_node_id,
            dbname: new.dbname,
            minutes_cron: new.schedule.minutes,
            hours_cron: new.schedule.hours,
            day_month_cron: new.schedule.day_month,
            month_cron: new.schedule.month,
            weekday_cron: new.schedule.weekday,
            backup_code: new.backup_code.as_str().to_string(),
            encryption: new.encryption,
            retention_period: new.retention_period,
            retention_redundancy: new.retention_redundancy,
            extra_parameters: new.extra_parameters,
            job_status: new.job_status.as_str().to_string(),
            remarks: new.remarks,
        }
    }
}

// ============================================================================
// Snapshot Definition Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = snapshot_definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgSnapshotDefinition {
    pub snapshot_id: i64,
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub at_time: DateTime<Utc>,
    pub backup_code: String,
    pub encryption: bool,
    pub retention_period: String,
    pub extra_parameters: String,
    pub tag: String,
    pub pg_dump_release: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub registered: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = snapshot_definitions)]
pub struct NewPgSnapshotDefinition {
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub at_time: DateTime<Utc>,
    pub backup_code: String,
    pub encryption: bool,
    pub retention_period: String,
    pub extra_parameters: String,
    pub tag: String,
    pub pg_dump_release: Option<String>,
    pub status: String,
}

impl TryFrom<PgSnapshotDefinition> for SnapshotDefinition {
    type Error = CatalogError;

    fn try_from(pg: PgSnapshotDefinition) -> Result<Self, Self::Error> {
        Ok(SnapshotDefinition {
            snapshot_id: pg.snapshot_id,
            backup_server_id: pg.backup_server_id,
            pgsql_node_id: pg.pgsql_node_id,
            dbname: pg.dbname,
            at_time: pg.at_time,
            backup_code: pg
                .backup_code
                .parse()
                .map_err(|e| corrupt("snapshot_definitions.backup_code", e))?,
            encryption: pg.encryption,
            retention_period: pg.retention_period,
            extra_parameters: pg.extra_parameters,
            tag: pg.tag,
            pg_dump_release: pg.pg_dump_release,
            status: pg
                .status
                .parse()
                .map_err(|e| corrupt("snapshot_definitions.status", e))?,
            error_message: pg.error_message,
            registered: pg.registered,
        })
    }
}

impl From<NewSnapshotDefinition> for NewPgSnapshotDefinition {
    fn from(new: NewSnapshotDefinition) -> Self {
        NewPgSnapshotDefinition {
            backup_server_id: new.backup_server_id,
            pgsql_node_id: new.pgsql_node_id,
            dbname: new.dbname,
            at_time: new.at_time,
            backup_code: new.backup_code.as_str().to_string(),
            encryption: new.encryption,
            retention_period: new.retention_period,
            extra_parameters: new.extra_parameters,
            tag: new.tag,
            pg_dump_release: new.pg_dump_release,
            status: OneShotStatus::Waiting.as_str().to_string(),
        }
    }
}

// ============================================================================
// Restore Definition Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = restore_definitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgRestoreDefinition {
    pub restore_id: i64,
    pub at_time: DateTime<Utc>,
    pub bck_id: i64,
    pub backup_server_id: i32,
    pub target_pgsql_node_id: i32,
    pub target_dbname: String,
    pub renamed_dbname: Option<String>,
    pub extra_parameters: String,
    pub roles_to_restore: Vec<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub registered: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = restore_definitions)]
pub struct NewPgRestoreDefinition {
    pub at_time: DateTime<Utc>,
    pub bck_id: i64,
    pub backup_server_id: i32,
    pub target_pgsql_node_id: i32,
    pub target_dbname: String,
    pub renamed_dbname: Option<String>,
    pub extra_parameters: String,
    pub roles_to_restore: Vec<String>,
    pub status: String,
}

impl TryFrom<PgRestoreDefinition> for RestoreDefinition {
    type Error = CatalogError;

    fn try_from(pg: PgRestoreDefinition) -> Result<Self, Self::Error> {
        Ok(RestoreDefinition {
            restore_id: pg.restore_id,
            at_time: pg.at_time,
            bck_id: pg.bck_id,
            backup_server_id: pg.backup_server_id,
            target_pgsql_node_id: pg.target_pgsql_node_id,
            target_dbname: pg.target_dbname,
            renamed_dbname: pg.renamed_dbname,
            extra_parameters: pg.extra_parameters,
            roles_to_restore: pg.roles_to_restore,
            status: pg
                .status
                .parse()
                .map_err(|e| corrupt("restore_definitions.status", e))?,
            error_message: pg.error_message,
            registered: pg.registered,
        })
    }
}

impl From<NewRestoreDefinition> for NewPgRestoreDefinition {
    fn from(new: NewRestoreDefinition) -> Self {
        NewPgRestoreDefinition {
            at_time: new.at_time,
            bck_id: new.bck_id,
            backup_server_id: new.backup_server_id,
            target_pgsql_node_id: new.target_pgsql_node_id,
            target_dbname: new.target_dbname,
            renamed_dbname: new.renamed_dbname,
            extra_parameters: new.extra_parameters,
            roles_to_restore: new.roles_to_restore,
            status: OneShotStatus::Waiting.as_str().to_string(),
        }
    }
}

// ============================================================================
// Backup Catalog Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = backup_catalog)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgBackupCatalogEntry {
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
    pub execution_status: String,
    pub execution_return_code: i32,
    pub error_message: String,
    pub pg_dump_release: Option<String>,
    pub role_list: Vec<String>,
    pub extra_info: String,
    pub deleted: bool,
    pub alerted_at: Option<DateTime<Utc>>,
    pub registered: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = backup_catalog)]
pub struct NewPgBackupCatalogEntry {
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
    pub execution_status: String,
    pub execution_return_code: i32,
    pub error_message: String,
    pub pg_dump_release: Option<String>,
    pub role_list: Vec<String>,
    pub extra_info: String,
}

impl TryFrom<PgBackupCatalogEntry> for BackupCatalogEntry {
    type Error = CatalogError;

    fn try_from(pg: PgBackupCatalogEntry) -> Result<Self, Self::Error> {
        Ok(BackupCatalogEntry {
            bck_id: pg.bck_id,
            def_id: pg.def_id,
            snapshot_id: pg.snapshot_id,
            procpid: pg.procpid,
            backup_server_id: pg.backup_server_id,
            pgsql_node_id: pg.pgsql_node_id,
            dbname: pg.dbname,
            started: pg.started,
            finished: pg.finished,
            duration: pg.duration,
            pg_dump_file: pg.pg_dump_file,
            pg_dump_file_size: pg.pg_dump_file_size,
            pg_dump_log_file: pg.pg_dump_log_file,
            globals_file: pg.globals_file,
            globals_file_size: pg.globals_file_size,
            globals_log_file: pg.globals_log_file,
            indexes_file: pg.indexes_file,
            indexes_file_size: pg.indexes_file_size,
            indexes_log_file: pg.indexes_log_file,
            execution_status: pg
                .execution_status
                .parse()
                .map_err(|e| corrupt("backup_catalog.execution_status", e))?,
            execution_return_code: pg.execution_return_code,
            error_message: pg.error_message,
            pg_dump_release: pg.pg_dump_release,
            role_list: pg.role_list,
            extra_info: pg.extra_info,
            deleted: pg.deleted,
            alerted_at: pg.alerted_at,
            registered: pg.registered,
        })
    }
}

impl From<NewBackupCatalogEntry> for NewPgBackupCatalogEntry {
    fn from(new: NewBackupCatalogEntry) -> Self {
        NewPgBackupCatalogEntry {
            bck_id: new.bck_id,
            def_id: new.def_id,
            snapshot_id: new.snapshot_id,
            procpid: new.procpid,
            backup_server_id: new.backup_server_id,
            pgsql_node_id: new.pgsql_node_id,
            dbname: new.dbname,
            started: new.started,
            finished: new.finished,
            duration: new.duration,
            pg_dump_file: new.pg_dump_file,
            pg_dump_file_size: new.pg_dump_file_size,
            pg_dump_log_file: new.pg_dump_log_file,
            globals_file: new.globals_file,
            globals_file_size: new.globals_file_size,
            globals_log_file: new.globals_log_file,
            indexes_file: new.indexes_file,
            indexes_file_size: new.indexes_file_size,
            indexes_log_file: new.indexes_log_file,
            execution_status: new.execution_status.as_str().to_string(),
            execution_return_code: new.execution_return_code,
            error_message: new.error_message,
            pg_dump_release: new.pg_dump_release,
            role_list: new.role_list,
            extra_info: new.extra_info,
        }
    }
}

// ============================================================================
// Restore Catalog Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = restore_catalog)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgRestoreCatalogEntry {
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
    pub execution_status: String,
    pub execution_return_code: i32,
    pub error_message: String,
    pub pg_restore_release: Option<String>,
    pub role_list: Vec<String>,
    pub alerted_at: Option<DateTime<Utc>>,
    pub registered: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = restore_catalog)]
pub struct NewPgRestoreCatalogEntry {
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
    pub execution_status: String,
    pub execution_return_code: i32,
    pub error_message: String,
    pub pg_restore_release: Option<String>,
    pub role_list: Vec<String>,
}

impl TryFrom<PgRestoreCatalogEntry> for RestoreCatalogEntry {
    type Error = CatalogError;

    fn try_from(pg: PgRestoreCatalogEntry) -> Result<Self, Self::Error> {
        Ok(RestoreCatalogEntry {
            rst_id: pg.rst_id,
            restore_id: pg.restore_id,
            procpid: pg.procpid,
            backup_server_id: pg.backup_server_id,
            target_pgsql_node_id: pg.target_pgsql_node_id,
            bck_id: pg.bck_id,
            target_dbname: pg.target_dbname,
            renamed_dbname: pg.renamed_dbname,
            started: pg.started,
            finished: pg.finished,
            duration: pg.duration,
            restore_log_file: pg.restore_log_file,
            execution_status: pg
                .execution_status
                .parse()
                .map_err(|e| corrupt("restore_catalog.execution_status", e))?,
            execution_return_code: pg.execution_return_code,
            error_message: pg.error_message,
            pg_restore_release: pg.pg_restore_release,
            role_list: pg.role_list,
            alerted_at: pg.alerted_at,
            registered: pg.registered,
        })
    }
}

impl From<NewRestoreCatalogEntry> for NewPgRestoreCatalogEntry {
    fn from(new: NewRestoreCatalogEntry) -> Self {
        NewPgRestoreCatalogEntry {
            restore_id: new.restore_id,
            procpid: new.procpid,
            backup_server_id: new.backup_server_id,
            target_pgsql_node_id: new.target_pgsql_node_id,
            bck_id: new.bck_id,
            target_dbname: new.target_dbname,
            renamed_dbname: new.renamed_dbname,
            started: new.started,
            finished: new.finished,
            duration: new.duration,
            restore_log_file: new.restore_log_file,
            execution_status: new.execution_status.as_str().to_string(),
            execution_return_code: new.execution_return_code,
            error_message: new.error_message,
            pg_restore_release: new.pg_restore_release,
            role_list: new.role_list,
        }
    }
}

// ============================================================================
// Job Queue Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = job_queue)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgJobQueueEntry {
    pub job_id: i64,
    pub backup_server_id: i32,
    pub pgsql_node_id: Option<i32>,
    pub kind: String,
    pub payload: serde_json::Value,
    pub registered: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = job_queue)]
pub struct NewPgJobQueueEntry {
    pub backup_server_id: i32,
    pub pgsql_node_id: Option<i32>,
    pub kind: String,
    pub payload: serde_json::Value,
}

impl TryFrom<PgJobQueueEntry> for JobQueueEntry {
    type Error = CatalogError;

    fn try_from(pg: PgJobQueueEntry) -> Result<Self, Self::Error> {
        Ok(JobQueueEntry {
            job_id: pg.job_id,
            backup_server_id: pg.backup_server_id,
            pgsql_node_id: pg.pgsql_node_id,
            kind: pg.kind.parse().map_err(|e| corrupt("job_queue.kind", e))?,
            payload: pg.payload,
            registered: pg.registered,
        })
    }
}

// ============================================================================
// Bin Dir Models
// ============================================================================

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = backup_server_pg_bin_dirs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgPgBinDir {
    pub backup_server_id: i32,
    pub pg_version: String,
    pub bin_dir: String,
    pub description: String,
}

impl From<PgPgBinDir> for PgBinDir {
    fn from(pg: PgPgBinDir) -> Self {
        PgBinDir {
            backup_server_id: pg.backup_server_id,
            pg_version: pg.pg_version,
            bin_dir: pg.bin_dir,
            description: pg.description,
        }
    }
}

impl From<PgBinDir> for PgPgBinDir {
    fn from(d: PgBinDir) -> Self {
        PgPgBinDir {
            backup_server_id: d.backup_server_id,
            pg_version: d.pg_version,
            bin_dir: d.bin_dir,
            description: d.description,
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = backup_server_default_pg_bin_dirs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgDefaultPgBinDir {
    pub pg_version: String,
    pub bin_dir: String,
    pub description: String,
}

impl From<PgDefaultPgBinDir> for DefaultPgBinDir {
    fn from(pg: PgDefaultPgBinDir) -> Self {
        DefaultPgBinDir {
            pg_version: pg.pg_version,
            bin_dir: pg.bin_dir,
            description: pg.description,
        }
    }
}

impl From<DefaultPgBinDir> for PgDefaultPgBinDir {
    fn from(d: DefaultPgBinDir) -> Self {
        PgDefaultPgBinDir {
            pg_version: d.pg_version,
            bin_dir: d.bin_dir,
            description: d.description,
        }
    }
}

// ============================================================================
// Config Parameter Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = backup_server_config)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgServerConfigParam {
    pub server_id: i32,
    pub parameter: String,
    pub value: String,
    pub description: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = pgsql_node_config)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgNodeConfigParam {
    pub node_id: i32,
    pub parameter: String,
    pub value: String,
    pub description: String,
}
