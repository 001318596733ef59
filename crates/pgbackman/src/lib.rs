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

//! # PgBackMan
//!
//! Centralized backup orchestration for fleets of PostgreSQL clusters.
//!
//! A shared relational catalog is the single source of truth: backup
//! servers, PgSQL nodes, recurring backup definitions, one-shot snapshots
//! and restores, and the execution catalog. Definition mutations enqueue
//! work in a per-server job queue; a control daemon on each backup server
//! materializes that work into crontab files and AT jobs; scheduler-invoked
//! executors run the PostgreSQL dump/restore utilities and report back into
//! the catalog, spooling results on disk whenever the catalog is
//! unreachable.
//!
//! ## Components
//!
//! - [`admin`]: the operation surface the CLI calls
//! - [`daemon`]: the per-backup-server control daemon
//! - [`executor`]: the cron/AT-invoked dump and restore runners
//! - [`maintenance`]: retention enforcement and catalog hygiene
//! - [`alerts`]: ERROR-row notification loop
//! - [`migrator`]: catalog schema version management
//! - [`spool`]: the pending-log on-disk queue
//! - [`crontab`]: idempotent crontab materialization

pub mod admin;
pub mod alerts;
pub mod config;
pub mod crontab;
pub mod dal;
pub mod database;
pub mod daemon;
pub mod error;
pub mod executor;
pub mod maintenance;
pub mod migrator;
pub mod models;
pub mod node;
pub mod output;
pub mod scheduling;
pub mod spool;
pub mod version;

pub use admin::AdminApi;
pub use config::Settings;
pub use dal::DAL;
pub use database::Database;
pub use output::{OutputFormat, ResultSet};
pub use version::{CATALOG_VERSION, SOFTWARE_VERSION};

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initializes tracing for a binary: env-filter seeded from the config's
/// log level (overridable via `RUST_LOG`), optionally writing to a file.
pub fn init_logging(level: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path);

            match file {
                Ok(file) => {
                    tracing_subscriber::fmt()
                        .with_env_filter(filter)
                        .with_writer(std::sync::Arc::new(file))
                        .with_ansi(false)
                        .init();
                }
                Err(e) => {
                    tracing_subscriber::fmt().with_env_filter(filter).init();
                    tracing::warn!("cannot open log file {}: {}", path.display(), e);
                }
            }
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
