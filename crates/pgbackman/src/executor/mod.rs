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

//! The dump / restore executor, invoked by cron and AT entries.
//!
//! Resolves its parameters from the catalog, runs the PostgreSQL utilities
//! with stdout/stderr captured next to the artifacts, and reports the
//! outcome as a catalog row. When the catalog is unreachable at report
//! time, the row goes to the pending-log spool instead; failures are always
//! catalog-visible one way or the other. The process exit code mirrors the
//! utility's.

pub mod artifact;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::dal::DAL;
use crate::error::WorkerError;
use crate::models::*;
use crate::node::{NodeInspectorFactory, PgNodeInspectorFactory};
use crate::spool::{self, PendingBackupRecord, PendingRecord, PendingRestoreRecord};
use artifact::ArtifactSet;

/// What a dump invocation targets.
#[derive(Debug, Clone, Copy)]
pub enum DumpTarget {
    Definition(i64),
    Snapshot(i64),
}

/// Resolves the backup server this process runs on, by config override or
/// system hostname.
pub async fn resolve_local_server(
    dal: &DAL,
    settings: &Settings,
) -> Result<BackupServer, WorkerError> {
    let fqdn = if settings.agent.backup_server.is_empty() {
        gethostname::gethostname().to_string_lossy().into_owned()
    } else {
        settings.agent.backup_server.clone()
    };

    let (hostname, domain) = fqdn
        .split_once('.')
        .ok_or_else(|| WorkerError::UnknownServer(fqdn.clone()))?;

    dal.backup_server()
        .get_by_fqdn(hostname, domain)
        .await?
        .ok_or(WorkerError::UnknownServer(fqdn))
}

/// Extracts the major version a bin-dir registration is keyed by:
/// "16.2" -> "16", "9.6.24" -> "9.6".
pub fn major_version(server_version: &str) -> String {
    let mut parts = server_version.trim().split('.');
    match (parts.next(), parts.next()) {
        (Some("9"), Some(minor)) => format!("9.{}", minor),
        (Some(major), _) => major.to_string(),
        (None, _) => String::new(),
    }
}

/// Formats a wall-clock duration as HH:MM:SS.
pub fn format_duration(started: DateTime<Utc>, finished: DateTime<Utc>) -> String {
    let seconds = (finished - started).num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

struct CommandOutcome {
    status: i32,
    stderr_tail: String,
}

/// Runs a utility with stderr captured to a log file. The utility writes
/// its artifact itself (`-f`), so stdout is discarded.
async fn run_logged(
    program: &Path,
    args: &[String],
    log_path: &Path,
) -> Result<CommandOutcome, WorkerError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| WorkerError::Spawn {
            command: program.display().to_string(),
            source: e,
        })?;

    std::fs::write(log_path, &output.stderr).map_err(|e| WorkerError::io(log_path, e))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr_tail = stderr
        .lines()
        .rev()
        .take(5)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n");

    Ok(CommandOutcome {
        status: output.status.code().unwrap_or(-1),
        stderr_tail,
    })
}

fn file_size(path: &Path) -> i64 {
    std::fs::metadata(path).map(|m| m.len() as i64).unwrap_or(0)
}

/// The path as a catalog column: empty when the artifact was never
/// produced (e.g. no globals for a DATA dump).
fn existing_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        String::new()
    }
}

struct DumpParams {
    def_id: Option<i64>,
    snapshot_id: Option<i64>,
    node: PgsqlNode,
    dbname: String,
    backup_code: BackupCode,
    encryption: bool,
    extra_parameters: String,
    pg_dump_release: Option<String>,
    tag: String,
}

pub struct DumpRunner {
    dal: DAL,
    settings: Settings,
    server: BackupServer,
    inspectors: Arc<dyn NodeInspectorFactory>,
}

impl DumpRunner {
    pub async fn bootstrap(dal: DAL, settings: Settings) -> Result<Self, WorkerError> {
        let server = resolve_local_server(&dal, &settings).await?;
        Ok(Self {
            dal,
            settings,
            server,
            inspectors: Arc::new(PgNodeInspectorFactory),
        })
    }

    pub fn with_inspectors(mut self, inspectors: Arc<dyn NodeInspectorFactory>) -> Self {
        self.inspectors = inspectors;
        self
    }

    /// Runs one dump. The returned exit code mirrors the worst utility
    /// status and is what the process exits with.
    pub async fn run(&self, target: DumpTarget) -> Result<i32, WorkerError> {
        let params = self.resolve_params(target).await?;

        let root = self
            .dal
            .backup_server()
            .get_config_value(self.server.server_id, "root_backup_partition")
            .await?
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                WorkerError::Invalid(format!(
                    "backup server {} has no root_backup_partition configured",
                    self.server.fqdn()
                ))
            })?;

        let bck_id = self.dal.backup_catalog().reserve_bck_id().await?;

        // Resolve the pg_dump release and its binary directory.
        let inspector = self.inspectors.for_node(&params.node);
        let release = match &params.pg_dump_release {
            Some(release) => release.clone(),
            None => major_version(&inspector.server_version().await?),
        };
        let bin_dir = self
            .dal
            .pg_bin_dir()
            .resolve(self.server.server_id, &release)
            .await?
            .map(PathBuf::from);

        let started = Utc::now();
        let owner_id = params.def_id.or(params.snapshot_id).unwrap_or(bck_id);
        let artifacts = ArtifactSet::new(
            &root,
            &params.node.fqdn(),
            &params.dbname,
            started,
            owner_id,
            bck_id,
            params.encryption,
        );
        std::fs::create_dir_all(&artifacts.dir)
            .map_err(|e| WorkerError::io(&artifacts.dir, e))?;

        // Hot-standby handling: optionally pause WAL replay for the
        // duration of the dump.
        let paused = if self.settings.agent.pause_recovery_process_on_slave
            && inspector.is_in_recovery().await.unwrap_or(false)
        {
            inspector.set_recovery_paused(true).await?;
            info!(node = %params.node.fqdn(), "recovery paused for dump");
            true
        } else {
            false
        };

        let result = self
            .run_utilities(&params, &artifacts, bin_dir.as_deref())
            .await;

        if paused {
            if let Err(e) = inspector.set_recovery_paused(false).await {
                error!(node = %params.node.fqdn(), "cannot resume recovery: {}", e);
            }
        }

        // A utility that could not even be spawned (missing binary, bad
        // bin dir) still ends up in the catalog as an ERROR row.
        let (status, error_message) = match result {
            Ok(pair) => pair,
            Err(WorkerError::Spawn { command, source }) => {
                (127, format!("cannot spawn {}: {}", command, source))
            }
            Err(e) => return Err(e),
        };
        let finished = Utc::now();

        let role_list = inspector.list_roles().await.unwrap_or_default();

        let execution_status = if status == 0 {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Error
        };

        let entry = NewBackupCatalogEntry {
            bck_id,
            def_id: params.def_id,
            snapshot_id: params.snapshot_id,
            procpid: std::process::id() as i32,
            backup_server_id: self.server.server_id,
            pgsql_node_id: params.node.node_id,
            dbname: params.dbname.clone(),
            started,
            finished,
            duration: format_duration(started, finished),
            pg_dump_file: artifacts.dump.display().to_string(),
            pg_dump_file_size: file_size(&artifacts.dump),
            pg_dump_log_file: artifacts.dump_log.display().to_string(),
            globals_file: existing_path(&artifacts.globals),
            globals_file_size: file_size(&artifacts.globals),
            globals_log_file: existing_path(&artifacts.globals_log),
            indexes_file: existing_path(&artifacts.indexes),
            indexes_file_size: file_size(&artifacts.indexes),
            indexes_log_file: existing_path(&artifacts.indexes_log),
            execution_status,
            execution_return_code: status,
            error_message,
            pg_dump_release: Some(release),
            role_list,
            extra_info: params.tag.clone(),
        };

        self.report(&root, params.node.node_id, entry).await?;

        Ok(status)
    }

    async fn resolve_params(&self, target: DumpTarget) -> Result<DumpParams, WorkerError> {
        match target {
            DumpTarget::Definition(def_id) => {
                let def = self
                    .dal
                    .backup_definition()
                    .get_by_id(def_id)
                    .await?
                    .ok_or_else(|| WorkerError::not_found("backup definition", def_id))?;
                let node = self
                    .dal
                    .pgsql_node()
                    .get_by_id(def.pgsql_node_id)
                    .await?
                    .ok_or_else(|| WorkerError::not_found("PgSQL node", def.pgsql_node_id))?;

                Ok(DumpParams {
                    def_id: Some(def.def_id),
                    snapshot_id: None,
                    node,
                    dbname: def.dbname,
                    backup_code: def.backup_code,
                    encryption: def.encryption,
                    extra_parameters: def.extra_parameters,
                    pg_dump_release: None,
                    tag: def.backup_code.as_str().to_string(),
                })
            }
            DumpTarget::Snapshot(snapshot_id) => {
                let snapshot = self
                    .dal
                    .snapshot_definition()
                    .get_by_id(snapshot_id)
                    .await?
                    .ok_or_else(|| WorkerError::not_found("snapshot definition", snapshot_id))?;
                let node = self
                    .dal
                    .pgsql_node()
                    .get_by_id(snapshot.pgsql_node_id)
                    .await?
                    .ok_or_else(|| {
                        WorkerError::not_found("PgSQL node", snapshot.pgsql_node_id)
                    })?;

                Ok(DumpParams {
                    def_id: None,
                    snapshot_id: Some(snapshot.snapshot_id),
                    node,
                    dbname: snapshot.dbname,
                    backup_code: snapshot.backup_code,
                    encryption: snapshot.encryption,
                    extra_parameters: snapshot.extra_parameters,
                    pg_dump_release: snapshot.pg_dump_release,
                    tag: snapshot.tag,
                })
            }
        }
    }

    /// Runs the utility set for the backup code. Returns the worst exit
    /// status and a condensed error message.
    async fn run_utilities(
        &self,
        params: &DumpParams,
        artifacts: &ArtifactSet,
        bin_dir: Option<&Path>,
    ) -> Result<(i32, String), WorkerError> {
        let node = &params.node;
        let binary = |name: &str| -> PathBuf {
            match bin_dir {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            }
        };

        let connection_args = |args: &mut Vec<String>| {
            args.push("-h".to_string());
            args.push(node.fqdn());
            args.push("-p".to_string());
            args.push(node.pgport.to_string());
            args.push("-U".to_string());
            args.push(node.admin_user.clone());
        };

        let mut worst = 0;
        let mut errors: Vec<String> = Vec::new();

        // Encrypted dumps stream through gpg; plain dumps go straight to
        // the artifact path.
        let plain_dump = if params.encryption {
            artifacts.dump.with_extension("")
        } else {
            artifacts.dump.clone()
        };

        let mut args: Vec<String> = Vec::new();
        let program = match params.backup_code {
            BackupCode::Cluster => {
                connection_args(&mut args);
                args.push("-f".to_string());
                args.push(plain_dump.display().to_string());
                binary("pg_dumpall")
            }
            code => {
                connection_args(&mut args);
                args.push("-Fc".to_string());
                match code {
                    BackupCode::Schema => args.push("-s".to_string()),
                    BackupCode::Data => args.push("-a".to_string()),
                    _ => {}
                }
                args.push("-f".to_string());
                args.push(plain_dump.display().to_string());
                for extra in params.extra_parameters.split_whitespace() {
                    args.push(extra.to_string());
                }
                args.push(params.dbname.clone());
                binary("pg_dump")
            }
        };

        let outcome = run_logged(&program, &args, &artifacts.dump_log).await?;
        if outcome.status != 0 {
            worst = outcome.status;
            errors.push(outcome.stderr_tail);
        }

        // Globals accompany every code except DATA; DATA dumps carry the
        // post-data section (indexes, constraints) instead.
        if params.backup_code != BackupCode::Data && params.backup_code != BackupCode::Cluster {
            let mut args: Vec<String> = Vec::new();
            connection_args(&mut args);
            args.push("--globals-only".to_string());
            args.push("-f".to_string());
            args.push(artifacts.globals.display().to_string());

            let outcome =
                run_logged(&binary("pg_dumpall"), &args, &artifacts.globals_log).await?;
            if outcome.status != 0 {
                worst = worst.max(outcome.status);
                errors.push(outcome.stderr_tail);
            }
        }

        if params.backup_code == BackupCode::Data {
            let mut args: Vec<String> = Vec::new();
            connection_args(&mut args);
            args.push("--section=post-data".to_string());
            args.push("-f".to_string());
            args.push(artifacts.indexes.display().to_string());
            args.push(params.dbname.clone());

            let outcome = run_logged(&binary("pg_dump"), &args, &artifacts.indexes_log).await?;
            if outcome.status != 0 {
                worst = worst.max(outcome.status);
                errors.push(outcome.stderr_tail);
            }
        }

        if params.encryption && worst == 0 {
            let recipient = self
                .dal
                .backup_server()
                .get_config_value(self.server.server_id, "gpg_recipient")
                .await?
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    WorkerError::Invalid(
                        "encryption requested but no gpg_recipient configured".to_string(),
                    )
                })?;

            let args = vec![
                "--batch".to_string(),
                "--yes".to_string(),
                "--recipient".to_string(),
                recipient,
                "--output".to_string(),
                artifacts.dump.display().to_string(),
                "--encrypt".to_string(),
                plain_dump.display().to_string(),
            ];

            let outcome = run_logged(Path::new("gpg"), &args, &artifacts.dump_log).await?;
            if outcome.status != 0 {
                worst = worst.max(outcome.status);
                errors.push(outcome.stderr_tail);
            } else {
                let _ = std::fs::remove_file(&plain_dump);
            }
        }

        Ok((worst, errors.join("; ")))
    }

    /// Inserts the catalog row, spooling it when the catalog is down.
    async fn report(
        &self,
        root: &Path,
        pgsql_node_id: i32,
        entry: NewBackupCatalogEntry,
    ) -> Result<(), WorkerError> {
        match self.dal.backup_catalog().insert(entry.clone()).await {
            Ok(row) => {
                info!(bck_id = row.bck_id, status = %row.execution_status, "catalog row registered");
                Ok(())
            }
            Err(e) if e.is_unavailable() => {
                warn!("catalog unreachable, spooling pending-log record: {}", e);
                let record = PendingRecord::Backup(PendingBackupRecord {
                    def_id: entry.def_id,
                    procpid: entry.procpid,
                    backup_server_id: entry.backup_server_id,
                    pgsql_node_id: entry.pgsql_node_id,
                    dbname: entry.dbname,
                    started: entry.started,
                    finished: entry.finished,
                    duration: entry.duration,
                    pg_dump_file: entry.pg_dump_file,
                    pg_dump_file_size: entry.pg_dump_file_size,
                    pg_dump_log_file: entry.pg_dump_log_file,
                    globals_file: entry.globals_file,
                    globals_file_size: entry.globals_file_size,
                    globals_log_file: entry.globals_log_file,
                    indexes_file: entry.indexes_file,
                    indexes_file_size: entry.indexes_file_size,
                    indexes_log_file: entry.indexes_log_file,
                    execution_status: entry.execution_status,
                    execution_return_code: entry.execution_return_code,
                    error_message: entry.error_message,
                    pg_dump_release: entry.pg_dump_release,
                    snapshot_id: entry.snapshot_id,
                    role_list: entry.role_list,
                    extra_info: entry.extra_info,
                });
                spool::append(root, pgsql_node_id, &record)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub struct RestoreRunner {
    dal: DAL,
    settings: Settings,
    server: BackupServer,
}

impl RestoreRunner {
    pub async fn bootstrap(dal: DAL, settings: Settings) -> Result<Self, WorkerError> {
        let server = resolve_local_server(&dal, &settings).await?;
        Ok(Self {
            dal,
            settings,
            server,
        })
    }

    pub async fn run(&self, restore_id: i64) -> Result<i32, WorkerError> {
        let restore = self
            .dal
            .restore_definition()
            .get_by_id(restore_id)
            .await?
            .ok_or_else(|| WorkerError::not_found("restore definition", restore_id))?;
        let entry = self
            .dal
            .backup_catalog()
            .get(restore.bck_id)
            .await?
            .ok_or_else(|| WorkerError::not_found("backup catalog entry", restore.bck_id))?;
        let node = self
            .dal
            .pgsql_node()
            .get_by_id(restore.target_pgsql_node_id)
            .await?
            .ok_or_else(|| {
                WorkerError::not_found("PgSQL node", restore.target_pgsql_node_id)
            })?;

        let root = self
            .dal
            .backup_server()
            .get_config_value(self.server.server_id, "root_backup_partition")
            .await?
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| {
                WorkerError::Invalid(format!(
                    "backup server {} has no root_backup_partition configured",
                    self.server.fqdn()
                ))
            })?;

        let release = entry
            .pg_dump_release
            .clone()
            .unwrap_or_else(|| major_version(""));
        let bin_dir = self
            .dal
            .pg_bin_dir()
            .resolve(self.server.server_id, &release)
            .await?
            .map(PathBuf::from);
        let binary = |name: &str| -> PathBuf {
            match &bin_dir {
                Some(dir) => dir.join(name),
                None => PathBuf::from(name),
            }
        };

        let started = Utc::now();
        let target_dbname = restore
            .renamed_dbname
            .clone()
            .unwrap_or_else(|| restore.target_dbname.clone());

        let log_dir = artifact::artifact_dir(&root, &node.fqdn(), &target_dbname, started);
        std::fs::create_dir_all(&log_dir).map_err(|e| WorkerError::io(&log_dir, e))?;
        let log_path = log_dir.join(format!("restore_{}_{}.log", restore_id, restore.bck_id));

        let connection_args = |args: &mut Vec<String>| {
            args.push("-h".to_string());
            args.push(node.fqdn());
            args.push("-p".to_string());
            args.push(node.pgport.to_string());
            args.push("-U".to_string());
            args.push(node.admin_user.clone());
        };

        let mut worst = 0;
        let mut errors: Vec<String> = Vec::new();

        // Recreate the requested roles from the globals artifact before the
        // data goes in.
        if !restore.roles_to_restore.is_empty() && !entry.globals_file.is_empty() {
            match extract_role_statements(
                Path::new(&entry.globals_file),
                &restore.roles_to_restore,
            ) {
                Ok(statements) if !statements.is_empty() => {
                    let roles_file = self
                        .settings
                        .agent
                        .tmp_dir
                        .join(format!("pgbackman_restore_{}_roles.sql", restore_id));
                    std::fs::write(&roles_file, statements.join("\n"))
                        .map_err(|e| WorkerError::io(&roles_file, e))?;

                    let mut args: Vec<String> = Vec::new();
                    connection_args(&mut args);
                    args.push("-d".to_string());
                    args.push("postgres".to_string());
                    args.push("-f".to_string());
                    args.push(roles_file.display().to_string());

                    let outcome = run_logged(&binary("psql"), &args, &log_path).await?;
                    let _ = std::fs::remove_file(&roles_file);
                    if outcome.status != 0 {
                        worst = outcome.status;
                        errors.push(outcome.stderr_tail);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("cannot extract role statements: {}", e);
                }
            }
        }

        if worst == 0 {
            if restore.renamed_dbname.is_some() {
                let mut args: Vec<String> = Vec::new();
                connection_args(&mut args);
                args.push(target_dbname.clone());

                let outcome = run_logged(&binary("createdb"), &args, &log_path).await?;
                if outcome.status != 0 {
                    worst = outcome.status;
                    errors.push(outcome.stderr_tail);
                }
            }

            if worst == 0 {
                let mut args: Vec<String> = Vec::new();
                connection_args(&mut args);
                if restore.renamed_dbname.is_some() {
                    args.push("-d".to_string());
                    args.push(target_dbname.clone());
                } else {
                    args.push("-C".to_string());
                    args.push("-d".to_string());
                    args.push("postgres".to_string());
                }
                for extra in restore.extra_parameters.split_whitespace() {
                    args.push(extra.to_string());
                }
                args.push(entry.pg_dump_file.clone());

                let outcome = run_logged(&binary("pg_restore"), &args, &log_path).await?;
                if outcome.status != 0 {
                    worst = outcome.status;
                    errors.push(outcome.stderr_tail);
                }
            }
        }

        let finished = Utc::now();
        let execution_status = if worst == 0 {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Error
        };

        let new_entry = NewRestoreCatalogEntry {
            restore_id,
            procpid: std::process::id() as i32,
            backup_server_id: self.server.server_id,
            target_pgsql_node_id: node.node_id,
            bck_id: restore.bck_id,
            target_dbname: restore.target_dbname.clone(),
            renamed_dbname: restore.renamed_dbname.clone(),
            started,
            finished,
            duration: format_duration(started, finished),
            restore_log_file: log_path.display().to_string(),
            execution_status,
            execution_return_code: worst,
            error_message: errors.join("; "),
            pg_restore_release: Some(release),
            role_list: restore.roles_to_restore.clone(),
        };

        match self.dal.restore_catalog().insert(new_entry.clone()).await {
            Ok(row) => {
                info!(rst_id = row.rst_id, status = %row.execution_status, "restore catalog row registered");
            }
            Err(e) if e.is_unavailable() => {
                warn!("catalog unreachable, spooling restore record: {}", e);
                let record = PendingRecord::Restore(PendingRestoreRecord {
                    restore_id,
                    procpid: new_entry.procpid,
                    backup_server_id: new_entry.backup_server_id,
                    target_pgsql_node_id: new_entry.target_pgsql_node_id,
                    bck_id: new_entry.bck_id,
                    target_dbname: new_entry.target_dbname,
                    renamed_dbname: new_entry.renamed_dbname,
                    started,
                    finished,
                    duration: new_entry.duration,
                    restore_log_file: new_entry.restore_log_file,
                    execution_status,
                    execution_return_code: worst,
                    error_message: new_entry.error_message,
                    pg_restore_release: new_entry.pg_restore_release,
                    role_list: new_entry.role_list,
                });
                spool::append(&root, node.node_id, &record)?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(worst)
    }
}

/// Pulls CREATE ROLE / ALTER ROLE statements for the requested roles out of
/// a globals dump.
fn extract_role_statements(
    globals_file: &Path,
    roles: &[String],
) -> Result<Vec<String>, WorkerError> {
    let content =
        std::fs::read_to_string(globals_file).map_err(|e| WorkerError::io(globals_file, e))?;

    let mut statements = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        let is_role_statement =
            trimmed.starts_with("CREATE ROLE ") || trimmed.starts_with("ALTER ROLE ");
        if !is_role_statement {
            continue;
        }

        let named = roles.iter().any(|role| {
            trimmed
                .strip_prefix("CREATE ROLE ")
                .or_else(|| trimmed.strip_prefix("ALTER ROLE "))
                .is_some_and(|rest| {
                    rest.trim_start_matches('"')
                        .starts_with(role.as_str())
                        && rest
                            .trim_start_matches('"')
                            .trim_start_matches(role.as_str())
                            .trim_start_matches('"')
                            .starts_with([' ', ';'])
                })
        });

        if named {
            statements.push(trimmed.to_string());
        }
    }

    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn major_version_extraction() {
        assert_eq!(major_version("16.2"), "16");
        assert_eq!(major_version("10.21"), "10");
        assert_eq!(major_version("9.6.24"), "9.6");
        assert_eq!(major_version("17"), "17");
    }

    #[test]
    fn duration_formatting() {
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap();
        let finished = Utc.with_ymd_and_hms(2024, 3, 1, 3, 31, 40).unwrap();
        assert_eq!(format_duration(started, finished), "01:01:40");

        // Clock skew never yields a negative duration.
        assert_eq!(format_duration(finished, started), "00:00:00");
    }

    #[test]
    fn role_statements_are_filtered_by_name() {
        let tmp = tempfile::tempdir().unwrap();
        let globals = tmp.path().join("globals");
        std::fs::write(
            &globals,
            "CREATE ROLE sales_owner;\n\
             ALTER ROLE sales_owner WITH LOGIN;\n\
             CREATE ROLE unrelated;\n\
             CREATE ROLE sales_owner_archive;\n",
        )
        .unwrap();

        let statements =
            extract_role_statements(&globals, &["sales_owner".to_string()]).unwrap();
        assert_eq!(
            statements,
            vec![
                "CREATE ROLE sales_owner;".to_string(),
                "ALTER ROLE sales_owner WITH LOGIN;".to_string(),
            ]
        );
    }
}
