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

//! Error types, layered by origin.
//!
//! - [`ValidationError`]: bad input at the admin API boundary. No state change.
//! - [`CatalogError`]: database access failures (pool, query, corrupt rows).
//! - [`AdminError`]: admin operations - validation, not-found, constraint
//!   violations and catalog failures.
//! - [`WorkerError`]: daemon / executor / maintenance / alerts side - catalog,
//!   filesystem, external process and spool failures.
//! - [`MigrationError`]: software / catalog schema version handling.

use std::path::PathBuf;

use thiserror::Error;

/// Input validation failures at the admin API boundary.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid cron {field} field '{value}': {reason}")]
    CronField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid backup code '{0}', expected CLUSTER, FULL, SCHEMA or DATA")]
    BackupCode(String),

    #[error("invalid job status '{0}', expected ACTIVE or STOPPED")]
    JobStatus(String),

    #[error("invalid backup server status '{0}', expected RUNNING or STOPPED")]
    ServerStatus(String),

    #[error("invalid PgSQL node status '{0}', expected RUNNING or DOWN")]
    NodeStatus(String),

    #[error("invalid one-shot status '{0}', expected WAITING, DEFINED or ERROR")]
    OneShotStatus(String),

    #[error("invalid execution status '{0}', expected SUCCEEDED or ERROR")]
    ExecutionStatus(String),

    #[error("invalid job kind '{0}'")]
    JobKind(String),

    #[error("invalid boolean '{0}', expected TRUE or FALSE")]
    Boolean(String),

    #[error("invalid interval '{0}'")]
    Interval(String),

    #[error("unknown pg_dump release '{0}'")]
    PgDumpRelease(String),

    #[error("invalid timestamp '{0}'")]
    Timestamp(String),

    #[error("invalid output format '{0}', expected table, csv or json")]
    OutputFormat(String),

    #[error("unsupported dbname specifier '{got}', did you mean '{expected}'?")]
    DbnameSpecifier { got: String, expected: &'static str },

    #[error("{0}")]
    Invalid(String),
}

/// Catalog database access failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("connection pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    Query(#[from] diesel::result::Error),

    #[error("corrupt catalog row: {0}")]
    CorruptRow(String),
}

impl CatalogError {
    /// Whether the failure is a transient connectivity problem.
    ///
    /// Transient failures are retried with backoff by the daemons and cause
    /// the executor to spool its catalog row instead of failing the run.
    pub fn is_unavailable(&self) -> bool {
        match self {
            CatalogError::Pool(_) => true,
            CatalogError::Query(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ClosedConnection,
                _,
            )) => true,
            CatalogError::Query(diesel::result::Error::BrokenTransactionManager) => true,
            _ => false,
        }
    }
}

impl From<deadpool_diesel::InteractError> for CatalogError {
    fn from(e: deadpool_diesel::InteractError) -> Self {
        CatalogError::Pool(e.to_string())
    }
}

/// Failures of admin API operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {ident}")]
    NotFound { entity: &'static str, ident: String },

    #[error("{0}")]
    Constraint(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("PgSQL node error: {0}")]
    Node(String),
}

impl AdminError {
    pub fn not_found(entity: &'static str, ident: impl Into<String>) -> Self {
        AdminError::NotFound {
            entity,
            ident: ident.into(),
        }
    }
}

/// Pending-log spool failures.
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("malformed pending-log line {line_no}: {reason}")]
    Malformed { line_no: usize, reason: String },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures on the execution side: control daemon, executors, maintenance
/// and alerts loops.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("command '{command}' failed with status {status}: {stderr}")]
    Process {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("command '{command}' could not be spawned: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Spool(#[from] SpoolError),

    #[error("backup server '{0}' is not registered in the catalog")]
    UnknownServer(String),

    #[error("{entity} not found: {ident}")]
    NotFound { entity: &'static str, ident: String },

    #[error("alert delivery failed: {0}")]
    Alert(String),

    #[error("{0}")]
    Invalid(String),
}

impl WorkerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(entity: &'static str, ident: impl ToString) -> Self {
        WorkerError::NotFound {
            entity,
            ident: ident.to_string(),
        }
    }

    /// Whether the underlying cause is a transient catalog outage.
    pub fn is_catalog_unavailable(&self) -> bool {
        matches!(self, WorkerError::Catalog(e) if e.is_unavailable())
    }
}

/// Schema migration failures.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(
        "software catalog version {software} is older than database version {database}, \
         refusing to run"
    )]
    SoftwareTooOld { software: i32, database: i32 },

    #[error("database schema is at version {database}, software requires {software}")]
    UpgradePending { software: i32, database: i32 },

    #[error("missing upgrade script: {path}")]
    MissingScript { path: PathBuf },

    #[error("upgrade script {path} failed: {reason}")]
    ScriptFailed { path: PathBuf, reason: String },

    #[error("catalog has no version metadata")]
    NoVersion,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Spool(#[from] SpoolError),
}
