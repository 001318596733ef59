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

//! Result-set builders for the show operations.
//!
//! Column names and order are part of the CLI's visible contract.

use crate::models::*;
use crate::output::ResultSet;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%z";

pub fn backup_servers(servers: &[BackupServer]) -> ResultSet {
    let mut rs = ResultSet::new(vec!["SrvID", "FQDN", "Status", "Remarks"]);
    for server in servers {
        rs.push_row(vec![
            server.server_id.to_string(),
            server.fqdn(),
            server.status.to_string(),
            server.remarks.clone(),
        ]);
    }
    rs
}

pub fn pgsql_nodes(nodes: &[PgsqlNode]) -> ResultSet {
    let mut rs = ResultSet::new(vec![
        "NodeID", "FQDN", "Pgport", "Admin user", "Status", "Remarks",
    ]);
    for node in nodes {
        rs.push_row(vec![
            node.node_id.to_string(),
            node.fqdn(),
            node.pgport.to_string(),
            node.admin_user.clone(),
            node.status.to_string(),
            node.remarks.clone(),
        ]);
    }
    rs
}

pub fn backup_definitions(definitions: &[BackupDefinition]) -> ResultSet {
    let mut rs = ResultSet::new(vec![
        "DefID",
        "SrvID",
        "NodeID",
        "DBname",
        "Schedule",
        "Code",
        "Encryption",
        "Retention",
        "Redundancy",
        "Status",
        "Parameters",
    ]);
    for def in definitions {
        rs.push_row(vec![
            def.def_id.to_string(),
            def.backup_server_id.to_string(),
            def.pgsql_node_id.to_string(),
            def.dbname.clone(),
            def.schedule.expression(),
            def.backup_code.to_string(),
            def.encryption.to_string().to_uppercase(),
            def.retention_period.clone(),
            def.retention_redundancy.to_string(),
            def.job_status.to_string(),
            def.extra_parameters.clone(),
        ]);
    }
    rs
}

pub fn snapshot_definitions(snapshots: &[SnapshotDefinition]) -> ResultSet {
    let mut rs = ResultSet::new(vec![
        "SnapshotID",
        "SrvID",
        "NodeID",
        "DBname",
        "AT time",
        "Code",
        "Release",
        "Tag",
        "Status",
    ]);
    for snapshot in snapshots {
        rs.push_row(vec![
            snapshot.snapshot_id.to_string(),
            snapshot.backup_server_id.to_string(),
            snapshot.pgsql_node_id.to_string(),
            snapshot.dbname.clone(),
            snapshot.at_time.format(TIME_FORMAT).to_string(),
            snapshot.backup_code.to_string(),
            snapshot
                .pg_dump_release
                .clone()
                .unwrap_or_else(|| "source".to_string()),
            snapshot.tag.clone(),
            snapshot.status.to_string(),
        ]);
    }
    rs
}

pub fn restore_definitions(restores: &[RestoreDefinition]) -> ResultSet {
    let mut rs = ResultSet::new(vec![
        "RestoreID",
        "AT time",
        "BckID",
        "SrvID",
        "Target NodeID",
        "Target DBname",
        "Renamed DBname",
        "Status",
    ]);
    for restore in restores {
        rs.push_row(vec![
            restore.restore_id.to_string(),
            restore.at_time.format(TIME_FORMAT).to_string(),
            restore.bck_id.to_string(),
            restore.backup_server_id.to_string(),
            restore.target_pgsql_node_id.to_string(),
            restore.target_dbname.clone(),
            restore.renamed_dbname.clone().unwrap_or_default(),
            restore.status.to_string(),
        ]);
    }
    rs
}

pub fn backup_catalog(entries: &[BackupCatalogEntry]) -> ResultSet {
    let mut rs = ResultSet::new(vec![
        "BckID",
        "DefID",
        "SnapshotID",
        "Finished",
        "SrvID",
        "NodeID",
        "DBname",
        "Duration",
        "Size",
        "Code",
        "Status",
    ]);
    for entry in entries {
        rs.push_row(vec![
            entry.bck_id.to_string(),
            entry.def_id.map(|v| v.to_string()).unwrap_or_default(),
            entry.snapshot_id.map(|v| v.to_string()).unwrap_or_default(),
            entry.finished.format(TIME_FORMAT).to_string(),
            entry.backup_server_id.to_string(),
            entry.pgsql_node_id.to_string(),
            entry.dbname.clone(),
            entry.duration.clone(),
            entry.pg_dump_file_size.to_string(),
            entry.extra_info.clone(),
            entry.execution_status.to_string(),
        ]);
    }
    rs
}

pub fn restore_catalog(entries: &[RestoreCatalogEntry]) -> ResultSet {
    let mut rs = ResultSet::new(vec![
        "RstID",
        "RestoreID",
        "BckID",
        "Finished",
        "SrvID",
        "Target NodeID",
        "Target DBname",
        "Duration",
        "Status",
    ]);
    for entry in entries {
        rs.push_row(vec![
            entry.rst_id.to_string(),
            entry.restore_id.to_string(),
            entry.bck_id.to_string(),
            entry.finished.format(TIME_FORMAT).to_string(),
            entry.backup_server_id.to_string(),
            entry.target_pgsql_node_id.to_string(),
            entry.target_dbname.clone(),
            entry.duration.clone(),
            entry.execution_status.to_string(),
        ]);
    }
    rs
}

/// Two-column parameter / value rendering for the detail and config views.
pub fn details(pairs: Vec<(&str, String)>) -> ResultSet {
    let mut rs = ResultSet::new(vec!["Parameter", "Value"]);
    for (parameter, value) in pairs {
        rs.push_row(vec![parameter.to_string(), value]);
    }
    rs
}

pub fn backup_details(entry: &BackupCatalogEntry) -> ResultSet {
    details(vec![
        ("BckID", entry.bck_id.to_string()),
        (
            "DefID",
            entry.def_id.map(|v| v.to_string()).unwrap_or_default(),
        ),
        (
            "SnapshotID",
            entry.snapshot_id.map(|v| v.to_string()).unwrap_or_default(),
        ),
        ("ProcPID", entry.procpid.to_string()),
        ("SrvID", entry.backup_server_id.to_string()),
        ("NodeID", entry.pgsql_node_id.to_string()),
        ("DBname", entry.dbname.clone()),
        ("Started", entry.started.format(TIME_FORMAT).to_string()),
        ("Finished", entry.finished.format(TIME_FORMAT).to_string()),
        ("Duration", entry.duration.clone()),
        ("Dump file", entry.pg_dump_file.clone()),
        ("Dump size", entry.pg_dump_file_size.to_string()),
        ("Dump log", entry.pg_dump_log_file.clone()),
        ("Globals file", entry.globals_file.clone()),
        ("Globals size", entry.globals_file_size.to_string()),
        ("Indexes file", entry.indexes_file.clone()),
        ("Status", entry.execution_status.to_string()),
        ("Return code", entry.execution_return_code.to_string()),
        ("Error", entry.error_message.clone()),
        (
            "pg_dump release",
            entry.pg_dump_release.clone().unwrap_or_default(),
        ),
        ("Roles", entry.role_list.join(", ")),
        ("Deleted", entry.deleted.to_string().to_uppercase()),
    ])
}

pub fn restore_details(entry: &RestoreCatalogEntry) -> ResultSet {
    details(vec![
        ("RstID", entry.rst_id.to_string()),
        ("RestoreID", entry.restore_id.to_string()),
        ("BckID", entry.bck_id.to_string()),
        ("ProcPID", entry.procpid.to_string()),
        ("SrvID", entry.backup_server_id.to_string()),
        ("Target NodeID", entry.target_pgsql_node_id.to_string()),
        ("Target DBname", entry.target_dbname.clone()),
        (
            "Renamed DBname",
            entry.renamed_dbname.clone().unwrap_or_default(),
        ),
        ("Started", entry.started.format(TIME_FORMAT).to_string()),
        ("Finished", entry.finished.format(TIME_FORMAT).to_string()),
        ("Duration", entry.duration.clone()),
        ("Restore log", entry.restore_log_file.clone()),
        ("Status", entry.execution_status.to_string()),
        ("Error", entry.error_message.clone()),
        ("Roles", entry.role_list.join(", ")),
    ])
}

pub fn jobs_queue(jobs: &[JobQueueEntry]) -> ResultSet {
    let mut rs = ResultSet::new(vec![
        "JobID",
        "Registered",
        "SrvID",
        "NodeID",
        "Kind",
        "Payload",
    ]);
    for job in jobs {
        rs.push_row(vec![
            job.job_id.to_string(),
            job.registered.format(TIME_FORMAT).to_string(),
            job.backup_server_id.to_string(),
            job.pgsql_node_id.map(|v| v.to_string()).unwrap_or_default(),
            job.kind.to_string(),
            job.payload.to_string(),
        ]);
    }
    rs
}

pub fn config_parameters(parameters: Vec<(String, String)>) -> ResultSet {
    let mut rs = ResultSet::new(vec!["Parameter", "Value"]);
    for (parameter, value) in parameters {
        rs.push_row(vec![parameter, value]);
    }
    rs
}

pub fn pg_bin_dirs(entries: &[PgBinDir]) -> ResultSet {
    let mut rs = ResultSet::new(vec!["SrvID", "Version", "Bin dir", "Description"]);
    for entry in entries {
        rs.push_row(vec![
            entry.backup_server_id.to_string(),
            entry.pg_version.clone(),
            entry.bin_dir.clone(),
            entry.description.clone(),
        ]);
    }
    rs
}

pub fn default_pg_bin_dirs(entries: &[DefaultPgBinDir]) -> ResultSet {
    let mut rs = ResultSet::new(vec!["Version", "Bin dir", "Description"]);
    for entry in entries {
        rs.push_row(vec![
            entry.pg_version.clone(),
            entry.bin_dir.clone(),
            entry.description.clone(),
        ]);
    }
    rs
}

pub fn pgbackman_stats(stats: &PgbackmanStats) -> ResultSet {
    details(vec![
        ("Backup servers", stats.backup_servers.to_string()),
        ("  running", stats.backup_servers_running.to_string()),
        ("  stopped", stats.backup_servers_stopped.to_string()),
        ("PgSQL nodes", stats.pgsql_nodes.to_string()),
        ("  running", stats.pgsql_nodes_running.to_string()),
        ("  down", stats.pgsql_nodes_down.to_string()),
        ("Backup definitions", stats.backup_definitions.to_string()),
        ("  active", stats.backup_definitions_active.to_string()),
        ("  stopped", stats.backup_definitions_stopped.to_string()),
        ("Snapshot definitions", stats.snapshot_definitions.to_string()),
        ("Restore definitions", stats.restore_definitions.to_string()),
        ("Catalog entries", stats.catalog_entries.to_string()),
        ("  succeeded", stats.catalog_entries_succeeded.to_string()),
        ("  error", stats.catalog_entries_error.to_string()),
        ("Catalog size (bytes)", stats.catalog_size_bytes.to_string()),
        ("Jobs queued", stats.jobs_queued.to_string()),
    ])
}

pub fn backup_server_stats(stats: &BackupServerStats) -> ResultSet {
    details(vec![
        ("SrvID", stats.backup_server_id.to_string()),
        ("Backup definitions", stats.backup_definitions.to_string()),
        ("  active", stats.backup_definitions_active.to_string()),
        ("Catalog entries", stats.catalog_entries.to_string()),
        ("  succeeded", stats.catalog_entries_succeeded.to_string()),
        ("  error", stats.catalog_entries_error.to_string()),
        ("Catalog size (bytes)", stats.catalog_size_bytes.to_string()),
        ("Jobs queued", stats.jobs_queued.to_string()),
    ])
}

pub fn pgsql_node_stats(stats: &PgsqlNodeStats) -> ResultSet {
    details(vec![
        ("NodeID", stats.pgsql_node_id.to_string()),
        ("Backup definitions", stats.backup_definitions.to_string()),
        ("  active", stats.backup_definitions_active.to_string()),
        ("Catalog entries", stats.catalog_entries.to_string()),
        ("  succeeded", stats.catalog_entries_succeeded.to_string()),
        ("  error", stats.catalog_entries_error.to_string()),
        ("Catalog size (bytes)", stats.catalog_size_bytes.to_string()),
    ])
}

pub fn database_list(databases: &[String]) -> ResultSet {
    let mut rs = ResultSet::new(vec!["DBname"]);
    for db in databases {
        rs.push_row(vec![db.clone()]);
    }
    rs
}
