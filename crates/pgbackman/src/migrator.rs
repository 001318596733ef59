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

//! The schema migrator.
//!
//! Every long-running process and the CLI compare the compiled-in
//! [`CATALOG_VERSION`] against the catalog's recorded version on startup.
//! Daemons refuse to run on any mismatch. The CLI may authorize an
//! upgrade, which first drains local pending-log files (in the current
//! on-disk format), then applies `pgbackman_{n}.sql` for every n in
//! `(database, software]` in ascending order, each script in its own
//! transaction. All scripts are located before any is applied; a missing
//! one aborts the whole upgrade up front.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::dal::DAL;
use crate::error::MigrationError;
use crate::spool::{self, CatalogSink};
use crate::version::{upgrade_script_name, CATALOG_VERSION};

/// Outcome of the startup version comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    UpToDate {
        version: i32,
    },
    /// The catalog is older than the software; an upgrade would apply
    /// scripts `(database, software]`.
    UpgradePending {
        database: i32,
        software: i32,
    },
    /// The catalog is newer than the software; never runnable.
    SoftwareTooOld {
        database: i32,
        software: i32,
    },
    /// No version metadata at all: a fresh database, bootstrapped by
    /// applying every script from 1.
    Uninitialized,
}

/// Locates the upgrade scripts for versions `(from, to]`, refusing when
/// any is missing. Returns them in ascending version order.
pub fn collect_upgrade_scripts(
    dir: &Path,
    from: i32,
    to: i32,
) -> Result<Vec<(i32, PathBuf)>, MigrationError> {
    let mut scripts = Vec::new();

    for version in (from + 1)..=to {
        let path = dir.join(upgrade_script_name(version));
        if !path.is_file() {
            return Err(MigrationError::MissingScript { path });
        }
        scripts.push((version, path));
    }

    Ok(scripts)
}

pub struct Migrator {
    dal: DAL,
    database_source_dir: PathBuf,
}

impl Migrator {
    pub fn new(dal: DAL, database_source_dir: PathBuf) -> Self {
        Self {
            dal,
            database_source_dir,
        }
    }

    pub async fn check(&self) -> Result<VersionCheck, MigrationError> {
        let database = self.dal.catalog_info().current_version().await?;

        Ok(match database {
            None => VersionCheck::Uninitialized,
            Some(database) if database == CATALOG_VERSION => {
                VersionCheck::UpToDate { version: database }
            }
            Some(database) if database < CATALOG_VERSION => VersionCheck::UpgradePending {
                database,
                software: CATALOG_VERSION,
            },
            Some(database) => VersionCheck::SoftwareTooOld {
                database,
                software: CATALOG_VERSION,
            },
        })
    }

    /// Startup gate for the daemons: anything but up-to-date is fatal.
    pub async fn ensure_current(&self) -> Result<(), MigrationError> {
        match self.check().await? {
            VersionCheck::UpToDate { .. } => Ok(()),
            VersionCheck::UpgradePending { database, software } => {
                Err(MigrationError::UpgradePending { database, software })
            }
            VersionCheck::SoftwareTooOld { database, software } => {
                Err(MigrationError::SoftwareTooOld { database, software })
            }
            VersionCheck::Uninitialized => Err(MigrationError::NoVersion),
        }
    }

    /// Runs an authorized upgrade.
    ///
    /// `spool_dir` is this backup server's pending-log directory when the
    /// upgrade runs on one; its files are drained with the pre-upgrade
    /// insertion path before any DDL is applied.
    pub async fn upgrade(
        &self,
        spool_dir: Option<&Path>,
        sink: Option<&dyn CatalogSink>,
    ) -> Result<i32, MigrationError> {
        let from = match self.check().await? {
            VersionCheck::UpToDate { version } => {
                info!(version, "catalog already current");
                return Ok(version);
            }
            VersionCheck::SoftwareTooOld { database, software } => {
                return Err(MigrationError::SoftwareTooOld { database, software });
            }
            VersionCheck::UpgradePending { database, .. } => database,
            VersionCheck::Uninitialized => 0,
        };

        let scripts = collect_upgrade_scripts(&self.database_source_dir, from, CATALOG_VERSION)?;

        if let (Some(dir), Some(sink)) = (spool_dir, sink) {
            info!(dir = %dir.display(), "draining pending-log files before upgrade");
            match spool::drain(dir, sink).await {
                Ok(report) => {
                    if report.files_retained > 0 {
                        warn!(
                            retained = report.files_retained,
                            "some pending-log files could not be drained"
                        );
                    }
                }
                Err(e) => warn!("pending-log drain failed before upgrade: {}", e),
            }
        }

        for (version, path) in scripts {
            info!(version, script = %path.display(), "applying upgrade script");

            let script = std::fs::read_to_string(&path).map_err(|e| MigrationError::Io {
                path: path.clone(),
                source: e,
            })?;

            self.dal
                .catalog_info()
                .apply_upgrade_script(version, script)
                .await
                .map_err(|e| MigrationError::ScriptFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
        }

        info!(version = CATALOG_VERSION, "catalog upgraded");
        Ok(CATALOG_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scripts_are_collected_in_ascending_order() {
        let tmp = tempfile::tempdir().unwrap();
        for n in [4, 5] {
            fs::write(tmp.path().join(format!("pgbackman_{}.sql", n)), "SELECT 1;").unwrap();
        }

        let scripts = collect_upgrade_scripts(tmp.path(), 3, 5).unwrap();
        let versions: Vec<i32> = scripts.iter().map(|(v, _)| *v).collect();
        assert_eq!(versions, vec![4, 5]);
    }

    #[test]
    fn missing_script_aborts_before_any_is_returned() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("pgbackman_4.sql"), "SELECT 1;").unwrap();
        // pgbackman_5.sql is absent.

        let e = collect_upgrade_scripts(tmp.path(), 3, 5).unwrap_err();
        match e {
            MigrationError::MissingScript { path } => {
                assert!(path.ends_with("pgbackman_5.sql"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn no_scripts_needed_when_current() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(collect_upgrade_scripts(tmp.path(), 3, 3).unwrap().is_empty());
    }
}
