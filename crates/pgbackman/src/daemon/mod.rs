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

//! The control daemon: one instance per backup server.
//!
//! On startup it resolves its own backup server row by FQDN, drains the
//! pending-log spool, then polls the job queue. Jobs are grouped per PgSQL
//! node; groups run on parallel workers while jobs inside a group keep
//! registration order. A session advisory lock keyed (backup_server,
//! pgsql_node) serializes crontab rewrites across daemons.
//!
//! Delivery is at-least-once: a queue row is deleted only after its local
//! effect has been applied, and every effect (full-file crontab rewrite,
//! atq-probed AT install, unlink of named files) is idempotent.

pub mod at;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::crontab::{self, CrontabContext};
use crate::dal::DAL;
use crate::database::{advisory_unlock, try_advisory_lock};
use crate::error::WorkerError;
use crate::models::job_queue::coalesce_crontab_jobs;
use crate::models::{
    BackupServer, DeleteArtifactPayload, JobKind, JobQueueEntry, OneShotStatus, RestorePayload,
    SnapshotPayload,
};
use crate::spool::{self, DalCatalogSink};
use at::AtScheduler;

pub struct ControlDaemon {
    dal: DAL,
    settings: Settings,
    server: BackupServer,
    at: Arc<dyn AtScheduler>,
    shutdown: broadcast::Sender<()>,
}

impl ControlDaemon {
    /// Resolves this backup server by FQDN and drains the pending-log
    /// spool. Aborts when the server is not registered.
    pub async fn bootstrap(
        dal: DAL,
        settings: Settings,
        at: Arc<dyn AtScheduler>,
    ) -> Result<Self, WorkerError> {
        let fqdn = if settings.agent.backup_server.is_empty() {
            gethostname::gethostname().to_string_lossy().into_owned()
        } else {
            settings.agent.backup_server.clone()
        };

        let (hostname, domain) = fqdn
            .split_once('.')
            .ok_or_else(|| WorkerError::UnknownServer(fqdn.clone()))?;

        let server = dal
            .backup_server()
            .get_by_fqdn(hostname, domain)
            .await?
            .ok_or_else(|| WorkerError::UnknownServer(fqdn.clone()))?;

        info!(server_id = server.server_id, fqdn = %server.fqdn(), "control daemon starting");

        let daemon = Self {
            dal,
            settings,
            server,
            at,
            shutdown: broadcast::channel(1).0,
        };

        daemon.drain_spool().await?;

        Ok(daemon)
    }

    /// Sender half of the shutdown channel; dropping a `()` into it makes
    /// the poll loop exit after the in-flight cycle.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    pub fn server(&self) -> &BackupServer {
        &self.server
    }

    /// Drains the pending-log spool for this server, if a root backup
    /// partition is configured and present.
    pub async fn drain_spool(&self) -> Result<(), WorkerError> {
        let Some(root) = self.root_backup_partition().await? else {
            return Ok(());
        };

        let sink = DalCatalogSink {
            dal: self.dal.clone(),
        };
        let report = spool::drain(&spool::spool_dir(&root), &sink).await?;

        if report.records_ingested > 0 || report.files_retained > 0 {
            info!(
                ingested = report.records_ingested,
                retained = report.files_retained,
                "pending-log drain finished"
            );
        }

        Ok(())
    }

    async fn root_backup_partition(&self) -> Result<Option<PathBuf>, WorkerError> {
        Ok(self
            .dal
            .backup_server()
            .get_config_value(self.server.server_id, "root_backup_partition")
            .await?
            .filter(|v| !v.is_empty())
            .map(PathBuf::from))
    }

    /// The poll loop. Returns on shutdown.
    pub async fn run(&self) -> Result<(), WorkerError> {
        let mut shutdown = self.shutdown.subscribe();
        let mut backoff = Duration::from_secs(1);
        let retry_cap = self.settings.database.connect_retry_interval();

        loop {
            match self.process_cycle().await {
                Ok(processed) => {
                    backoff = Duration::from_secs(1);
                    if processed > 0 {
                        debug!(processed, "job queue cycle finished");
                    }
                }
                Err(e) if e.is_catalog_unavailable() => {
                    warn!(
                        "catalog unreachable, retrying in {}s: {}",
                        backoff.as_secs(),
                        e
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = shutdown.recv() => break,
                    }
                    backoff = (backoff * 2).min(retry_cap);
                    continue;
                }
                Err(e) => error!("job queue cycle failed: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.agent.poll_interval()) => {}
                _ = shutdown.recv() => break,
            }
        }

        info!("control daemon stopped");
        Ok(())
    }

    /// One queue poll: fetch, coalesce, dispatch per-node workers.
    pub async fn process_cycle(&self) -> Result<usize, WorkerError> {
        let jobs = self
            .dal
            .job_queue()
            .fetch_for_server(self.server.server_id)
            .await?;

        if jobs.is_empty() {
            return Ok(0);
        }

        let (keep, superseded) = coalesce_crontab_jobs(&jobs);
        if !superseded.is_empty() {
            debug!(count = superseded.len(), "coalesced superseded CRONTAB jobs");
            self.dal.job_queue().delete_many(superseded).await?;
        }

        // Group per node, preserving job order inside each group.
        let mut groups: Vec<(Option<i32>, Vec<JobQueueEntry>)> = Vec::new();
        for job in keep {
            match groups.iter_mut().find(|(node, _)| *node == job.pgsql_node_id) {
                Some((_, group)) => group.push(job.clone()),
                None => groups.push((job.pgsql_node_id, vec![job.clone()])),
            }
        }

        let processed = groups.iter().map(|(_, g)| g.len()).sum();

        let mut workers = Vec::with_capacity(groups.len());
        for (node_id, group) in groups {
            let worker = NodeWorker {
                dal: self.dal.clone(),
                settings: self.settings.clone(),
                server: self.server.clone(),
                at: Arc::clone(&self.at),
            };
            workers.push(tokio::spawn(async move {
                worker.process_group(node_id, group).await
            }));
        }

        for handle in workers {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_catalog_unavailable() => return Err(e),
                Ok(Err(e)) => error!("node worker failed: {}", e),
                Err(e) => error!("node worker panicked: {}", e),
            }
        }

        Ok(processed)
    }
}

/// Per-node job processor, spawned once per (cycle, node) group.
struct NodeWorker {
    dal: DAL,
    settings: Settings,
    server: BackupServer,
    at: Arc<dyn AtScheduler>,
}

impl NodeWorker {
    async fn process_group(
        &self,
        node_id: Option<i32>,
        jobs: Vec<JobQueueEntry>,
    ) -> Result<(), WorkerError> {
        // The advisory lock pins crontab regeneration for this node to one
        // worker across all daemons. A held lock skips the group; the rows
        // stay queued for the next cycle.
        let lock_conn = match node_id {
            Some(node) => {
                let conn = self.dal.database.get_connection().await?;
                if !try_advisory_lock(&conn, self.server.server_id, node).await? {
                    debug!(node, "node is locked by another worker, skipping");
                    return Ok(());
                }
                Some((conn, node))
            }
            None => None,
        };

        let mut result = Ok(());
        for job in jobs {
            if let Err(e) = self.process_job(&job).await {
                // Permanent AT failures were already turned into ERROR
                // status inside the handler; anything surfacing here keeps
                // the row queued. Stop the group to preserve ordering.
                result = Err(e);
                break;
            }
        }

        if let Some((conn, node)) = lock_conn {
            advisory_unlock(&conn, self.server.server_id, node).await?;
        }

        result
    }

    async fn process_job(&self, job: &JobQueueEntry) -> Result<(), WorkerError> {
        debug!(job_id = job.job_id, kind = %job.kind, "processing job");

        match job.kind {
            JobKind::Crontab => {
                let node_id = job.pgsql_node_id.ok_or_else(|| {
                    WorkerError::Invalid("CRONTAB job without pgsql_node_id".to_string())
                })?;
                self.regenerate_crontab(node_id).await?;
            }
            JobKind::AtSnapshot => {
                let payload: SnapshotPayload = parse_payload(job)?;
                self.install_snapshot(payload.snapshot_id).await?;
            }
            JobKind::AtRestore => {
                let payload: RestorePayload = parse_payload(job)?;
                self.install_restore(payload.restore_id).await?;
            }
            JobKind::DeleteArtifact => {
                let payload: DeleteArtifactPayload = parse_payload(job)?;
                self.delete_artifacts(payload).await?;
            }
        }

        self.dal.job_queue().delete(job.job_id).await?;
        Ok(())
    }

    async fn regenerate_crontab(&self, node_id: i32) -> Result<(), WorkerError> {
        let Some(node) = self.dal.pgsql_node().get_by_id(node_id).await? else {
            // Node vanished after the job was queued; the definitions went
            // with it and an earlier regeneration already emptied the file.
            return Ok(());
        };

        let definitions = self
            .dal
            .backup_definition()
            .active_for_pair(self.server.server_id, node_id)
            .await?;

        let crontab_file = self
            .dal
            .pgsql_node()
            .get_config_value(node_id, "pgnode_crontab_file")
            .await?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                WorkerError::Invalid(format!(
                    "node {} has no pgnode_crontab_file configured",
                    node.fqdn()
                ))
            })?;

        let dump_command = self
            .dal
            .backup_server()
            .get_config_value(self.server.server_id, "pgbackman_dump")
            .await?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "/usr/bin/pgbackman-dump".to_string());

        let ctx = CrontabContext {
            server_fqdn: self.server.fqdn(),
            node_fqdn: node.fqdn(),
            user: self.settings.agent.cron_user.clone(),
            dump_command: format!("{} --def-id", dump_command),
        };

        let path = PathBuf::from(crontab_file);
        let written = crontab::install(&path, &ctx, &definitions, Utc::now())?;

        if written {
            info!(
                node = %node.fqdn(),
                definitions = definitions.len(),
                file = %path.display(),
                "crontab regenerated"
            );
        } else {
            debug!(node = %node.fqdn(), "crontab unchanged, write skipped");
        }

        Ok(())
    }

    async fn install_snapshot(&self, snapshot_id: i64) -> Result<(), WorkerError> {
        let Some(snapshot) = self.dal.snapshot_definition().get_by_id(snapshot_id).await? else {
            warn!(snapshot_id, "AT_SNAPSHOT job for unknown snapshot, dropping");
            return Ok(());
        };

        let dump_command = self
            .dal
            .backup_server()
            .get_config_value(self.server.server_id, "pgbackman_dump")
            .await?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "/usr/bin/pgbackman-dump".to_string());
        let command = format!("{} --snapshot-id {}", dump_command, snapshot_id);

        match self.install_at_job(snapshot.at_time, &command).await {
            Ok(()) => {
                self.dal
                    .snapshot_definition()
                    .set_status(snapshot_id, OneShotStatus::Defined, None)
                    .await?;
                info!(snapshot_id, "AT job installed, snapshot DEFINED");
                Ok(())
            }
            Err(e) if e.is_catalog_unavailable() => Err(e),
            Err(e) => {
                // Permanent local failure: bad timestamp, missing at(1).
                self.dal
                    .snapshot_definition()
                    .set_status(snapshot_id, OneShotStatus::Error, Some(e.to_string()))
                    .await?;
                warn!(snapshot_id, "AT install failed, snapshot ERROR: {}", e);
                Ok(())
            }
        }
    }

    async fn install_restore(&self, restore_id: i64) -> Result<(), WorkerError> {
        let Some(restore) = self.dal.restore_definition().get_by_id(restore_id).await? else {
            warn!(restore_id, "AT_RESTORE job for unknown restore, dropping");
            return Ok(());
        };

        let restore_command = self
            .dal
            .backup_server()
            .get_config_value(self.server.server_id, "pgbackman_restore")
            .await?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "/usr/bin/pgbackman-restore".to_string());
        let command = format!("{} --restore-id {}", restore_command, restore_id);

        match self.install_at_job(restore.at_time, &command).await {
            Ok(()) => {
                self.dal
                    .restore_definition()
                    .set_status(restore_id, OneShotStatus::Defined, None)
                    .await?;
                info!(restore_id, "AT job installed, restore DEFINED");
                Ok(())
            }
            Err(e) if e.is_catalog_unavailable() => Err(e),
            Err(e) => {
                self.dal
                    .restore_definition()
                    .set_status(restore_id, OneShotStatus::Error, Some(e.to_string()))
                    .await?;
                warn!(restore_id, "AT install failed, restore ERROR: {}", e);
                Ok(())
            }
        }
    }

    /// atq probe before install keeps redelivery idempotent.
    async fn install_at_job(
        &self,
        when: chrono::DateTime<Utc>,
        command: &str,
    ) -> Result<(), WorkerError> {
        if self.at.installed(command).await? {
            debug!(command, "AT job already present");
            return Ok(());
        }
        self.at.install(when, command).await
    }

    async fn delete_artifacts(&self, payload: DeleteArtifactPayload) -> Result<(), WorkerError> {
        for file in &payload.files {
            match std::fs::remove_file(file) {
                Ok(()) => debug!(file, "artifact removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(WorkerError::io(file, e)),
            }
        }

        if payload.purge_row {
            self.dal.backup_catalog().purge_row(payload.bck_id).await?;
        } else {
            self.dal.backup_catalog().mark_deleted(payload.bck_id).await?;
        }

        info!(
            bck_id = payload.bck_id,
            files = payload.files.len(),
            "artifacts deleted"
        );
        Ok(())
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(job: &JobQueueEntry) -> Result<T, WorkerError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| {
        WorkerError::Invalid(format!(
            "job {} has malformed {} payload: {}",
            job.job_id, job.kind, e
        ))
    })
}
