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

//! The maintenance loop: retention enforcement and catalog hygiene.
//!
//! Retention never touches the most recent `retention_redundancy` SUCCEEDED
//! rows of a definition, whatever their age. Beyond that floor, a row
//! expires once it is older than `retention_period` plus the node's
//! `automatic_deletion_retention` grace window. Expired rows become
//! DELETE_ARTIFACT jobs addressed to the backup server owning the files;
//! the rows themselves are only marked deleted when the daemon has unlinked
//! the artifacts.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::admin::validation::parse_interval;
use crate::config::Settings;
use crate::dal::DAL;
use crate::error::WorkerError;
use crate::models::{
    BackupCatalogEntry, BackupServer, DeleteArtifactPayload, ExecutionStatus, JobKind,
};

/// Restore catalog rows older than this are purged.
const RESTORE_CATALOG_WINDOW_DAYS: i64 = 30;

/// Selects the catalog rows of one definition that retention has expired.
///
/// `entries` may arrive in any order. The redundancy floor counts SUCCEEDED
/// rows only; ERROR rows and rows already marked deleted never consume it.
pub fn select_expired<'a>(
    entries: &'a [BackupCatalogEntry],
    retention_redundancy: i32,
    retention_period: Duration,
    grace: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<&'a BackupCatalogEntry> {
    let mut sorted: Vec<&BackupCatalogEntry> = entries.iter().filter(|e| !e.deleted).collect();
    sorted.sort_by(|a, b| b.finished.cmp(&a.finished));

    let cutoff = retention_period + grace.unwrap_or_else(Duration::zero);

    let mut kept_succeeded = 0;
    let mut expired = Vec::new();

    for entry in sorted {
        if entry.execution_status == ExecutionStatus::Succeeded
            && kept_succeeded < retention_redundancy
        {
            kept_succeeded += 1;
            continue;
        }

        if now - entry.finished > cutoff {
            expired.push(entry);
        }
    }

    expired
}

pub struct MaintenanceLoop {
    dal: DAL,
    settings: Settings,
    server: BackupServer,
    shutdown: broadcast::Sender<()>,
}

impl MaintenanceLoop {
    pub fn new(dal: DAL, settings: Settings, server: BackupServer) -> Self {
        Self {
            dal,
            settings,
            server,
            shutdown: broadcast::channel(1).0,
        }
    }

    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    pub async fn run(&self) -> Result<(), WorkerError> {
        let mut shutdown = self.shutdown.subscribe();
        let mut cycle: u32 = 0;

        loop {
            cycle = cycle.wrapping_add(1);

            if let Err(e) = self.run_cycle(cycle).await {
                error!("maintenance cycle failed: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.agent.maintenance_interval()) => {}
                _ = shutdown.recv() => break,
            }
        }

        info!("maintenance loop stopped");
        Ok(())
    }

    /// One maintenance pass: retention, queue pruning, restore catalog
    /// purge, and the occasional vacuum.
    pub async fn run_cycle(&self, cycle: u32) -> Result<(), WorkerError> {
        self.enforce_retention().await?;

        let pruned = self.dal.job_queue().prune_orphans().await?;
        if pruned > 0 {
            info!(pruned, "orphaned queue jobs removed");
        }

        let purged = self
            .dal
            .restore_catalog()
            .purge_older_than(Utc::now(), Duration::days(RESTORE_CATALOG_WINDOW_DAYS))
            .await?;
        if purged > 0 {
            info!(purged, "old restore catalog rows purged");
        }

        if self.settings.agent.vacuum_every_n_cycles > 0
            && cycle % self.settings.agent.vacuum_every_n_cycles == 0
        {
            debug!("vacuuming catalog tables");
            self.dal.catalog_info().vacuum().await?;
        }

        Ok(())
    }

    async fn enforce_retention(&self) -> Result<(), WorkerError> {
        let definitions = self
            .dal
            .backup_definition()
            .list(Some(self.server.server_id), None, None)
            .await?;
        let now = Utc::now();

        for def in definitions {
            let period = match parse_interval(&def.retention_period) {
                Ok(period) => period,
                Err(e) => {
                    warn!(
                        def_id = def.def_id,
                        "unparseable retention period, skipping: {}", e
                    );
                    continue;
                }
            };

            let grace = self
                .dal
                .pgsql_node()
                .get_config_value(def.pgsql_node_id, "automatic_deletion_retention")
                .await?
                .and_then(|raw| parse_interval(&raw).ok());

            let entries = self
                .dal
                .backup_catalog()
                .entries_for_definition(def.def_id)
                .await?;

            let expired = select_expired(
                &entries,
                def.retention_redundancy,
                period,
                grace,
                now,
            );

            for entry in expired {
                let payload = DeleteArtifactPayload {
                    bck_id: entry.bck_id,
                    files: entry.artifact_files(),
                    purge_row: false,
                };

                self.dal
                    .job_queue()
                    .enqueue(
                        entry.backup_server_id,
                        Some(entry.pgsql_node_id),
                        JobKind::DeleteArtifact,
                        serde_json::json!(payload),
                    )
                    .await?;

                debug!(
                    bck_id = entry.bck_id,
                    def_id = def.def_id,
                    "catalog entry expired, DELETE_ARTIFACT queued"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(bck_id: i64, finished_days_ago: i64, status: ExecutionStatus) -> BackupCatalogEntry {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        BackupCatalogEntry {
            bck_id,
            def_id: Some(1),
            snapshot_id: None,
            procpid: 0,
            backup_server_id: 1,
            pgsql_node_id: 2,
            dbname: "salesdb".to_string(),
            started: now - Duration::days(finished_days_ago) - Duration::minutes(5),
            finished: now - Duration::days(finished_days_ago),
            duration: "00:05:00".to_string(),
            pg_dump_file: format!("/b/{}.dump", bck_id),
            pg_dump_file_size: 1,
            pg_dump_log_file: format!("/b/{}.dump.log", bck_id),
            globals_file: String::new(),
            globals_file_size: 0,
            globals_log_file: String::new(),
            indexes_file: String::new(),
            indexes_file_size: 0,
            indexes_log_file: String::new(),
            execution_status: status,
            execution_return_code: 0,
            error_message: String::new(),
            pg_dump_release: None,
            role_list: Vec::new(),
            extra_info: String::new(),
            deleted: false,
            alerted_at: None,
            registered: now,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn redundancy_floor_is_kept_regardless_of_age() {
        // Rows finished 1, 2, 4 and 5 days ago; period 3 days, redundancy 2.
        let entries = vec![
            entry(1, 1, ExecutionStatus::Succeeded),
            entry(2, 2, ExecutionStatus::Succeeded),
            entry(3, 4, ExecutionStatus::Succeeded),
            entry(4, 5, ExecutionStatus::Succeeded),
        ];

        let expired = select_expired(&entries, 2, Duration::days(3), None, now());
        let ids: Vec<i64> = expired.iter().map(|e| e.bck_id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn old_rows_survive_while_redundancy_needs_them() {
        // Both rows are far beyond the period but fill the redundancy floor.
        let entries = vec![
            entry(1, 30, ExecutionStatus::Succeeded),
            entry(2, 40, ExecutionStatus::Succeeded),
        ];

        let expired = select_expired(&entries, 2, Duration::days(3), None, now());
        assert!(expired.is_empty());
    }

    #[test]
    fn error_rows_do_not_consume_the_floor() {
        let entries = vec![
            entry(1, 1, ExecutionStatus::Error),
            entry(2, 5, ExecutionStatus::Succeeded),
        ];

        // Redundancy 1: the SUCCEEDED row is kept even though the newer
        // ERROR row sits above it; the ERROR row itself expires by age.
        let expired = select_expired(&entries, 1, Duration::days(3), None, now());
        assert!(expired.is_empty());

        let entries = vec![
            entry(1, 4, ExecutionStatus::Error),
            entry(2, 5, ExecutionStatus::Succeeded),
        ];
        let expired = select_expired(&entries, 1, Duration::days(3), None, now());
        let ids: Vec<i64> = expired.iter().map(|e| e.bck_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn grace_window_extends_the_period() {
        let entries = vec![
            entry(1, 1, ExecutionStatus::Succeeded),
            entry(2, 4, ExecutionStatus::Succeeded),
        ];

        // Without grace the 4-day-old row expires; a 2-day grace saves it.
        assert_eq!(
            select_expired(&entries, 1, Duration::days(3), None, now()).len(),
            1
        );
        assert!(select_expired(
            &entries,
            1,
            Duration::days(3),
            Some(Duration::days(2)),
            now()
        )
        .is_empty());
    }

    #[test]
    fn already_deleted_rows_are_ignored() {
        let mut deleted = entry(1, 10, ExecutionStatus::Succeeded);
        deleted.deleted = true;
        let entries = vec![deleted, entry(2, 1, ExecutionStatus::Succeeded)];

        let expired = select_expired(&entries, 0, Duration::days(3), None, now());
        assert!(expired.is_empty());
    }

    #[test]
    fn unsorted_input_is_handled() {
        let entries = vec![
            entry(3, 4, ExecutionStatus::Succeeded),
            entry(1, 1, ExecutionStatus::Succeeded),
            entry(4, 5, ExecutionStatus::Succeeded),
            entry(2, 2, ExecutionStatus::Succeeded),
        ];

        let expired = select_expired(&entries, 2, Duration::days(3), None, now());
        let ids: Vec<i64> = expired.iter().map(|e| e.bck_id).collect();
        assert_eq!(ids, vec![3, 4]);
    }
}
