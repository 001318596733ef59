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

//! Job queue data access.
//!
//! Rows are consumed by the control daemon of the addressed backup server
//! and deleted on success. Consumption preserves per-(backup_server,
//! pgsql_node) registration order; the daemon coalesces CRONTAB rows with
//! [`crate::models::job_queue::coalesce_crontab_jobs`].

use diesel::prelude::*;

use super::models::{NewPgJobQueueEntry, PgJobQueueEntry};
use super::DAL;
use crate::database::schema::job_queue;
use crate::error::CatalogError;
use crate::models::{JobKind, JobQueueEntry};

/// Inserts a queue row on an open connection.
///
/// Used by the definition DALs inside their mutating transactions.
pub(crate) fn enqueue_on(
    conn: &mut PgConnection,
    backup_server_id: i32,
    pgsql_node_id: Option<i32>,
    kind: JobKind,
    payload: serde_json::Value,
) -> QueryResult<()> {
    diesel::insert_into(job_queue::table)
        .values(&NewPgJobQueueEntry {
            backup_server_id,
            pgsql_node_id,
            kind: kind.as_str().to_string(),
            payload,
        })
        .execute(conn)?;
    Ok(())
}

pub struct JobQueueDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> JobQueueDAL<'a> {
    /// Enqueues a standalone job outside any definition transaction.
    ///
    /// The maintenance loop uses this for DELETE_ARTIFACT work.
    pub async fn enqueue(
        &self,
        backup_server_id: i32,
        pgsql_node_id: Option<i32>,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| enqueue_on(conn, backup_server_id, pgsql_node_id, kind, payload))
            .await
            .map_err(CatalogError::from)??;
        Ok(())
    }

    /// All rows addressed to one backup server, in registration order.
    pub async fn fetch_for_server(
        &self,
        backup_server_id: i32,
    ) -> Result<Vec<JobQueueEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgJobQueueEntry> = conn
            .interact(move |conn| {
                job_queue::table
                    .filter(job_queue::backup_server_id.eq(backup_server_id))
                    .order(job_queue::job_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every queued row, for show_jobs_queue.
    pub async fn list(&self) -> Result<Vec<JobQueueEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgJobQueueEntry> = conn
            .interact(|conn| job_queue::table.order(job_queue::job_id.asc()).load(conn))
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Deletes a processed (or superseded) row.
    pub async fn delete(&self, job_id: i64) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            diesel::delete(job_queue::table.find(job_id)).execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;
        Ok(())
    }

    /// Deletes a batch of superseded rows.
    pub async fn delete_many(&self, job_ids: Vec<i64>) -> Result<(), CatalogError> {
        if job_ids.is_empty() {
            return Ok(());
        }

        let conn = self.dal.database.get_connection().await?;
        conn.interact(move |conn| {
            diesel::delete(job_queue::table.filter(job_queue::job_id.eq_any(job_ids)))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;
        Ok(())
    }

    /// Removes AT jobs whose snapshot or restore definition no longer
    /// exists. Run by the maintenance loop.
    pub async fn prune_orphans(&self) -> Result<usize, CatalogError> {
        use crate::database::schema::{restore_definitions, snapshot_definitions};

        let conn = self.dal.database.get_connection().await?;

        let pruned = conn
            .interact(|conn| {
                let snapshot_ids: Vec<i64> = snapshot_definitions::table
                    .select(snapshot_definitions::snapshot_id)
                    .load(conn)?;
                let restore_ids: Vec<i64> = restore_definitions::table
                    .select(restore_definitions::restore_id)
                    .load(conn)?;

                let jobs: Vec<PgJobQueueEntry> = job_queue::table
                    .filter(job_queue::kind.eq_any(vec!["AT_SNAPSHOT", "AT_RESTORE"]))
                    .load(conn)?;

                let mut orphaned = Vec::new();
                for job in jobs {
                    let target = job
                        .payload
                        .get("snapshot_id")
                        .or_else(|| job.payload.get("restore_id"))
                        .and_then(|v| v.as_i64());

                    let exists = match (job.kind.as_str(), target) {
                        ("AT_SNAPSHOT", Some(id)) => snapshot_ids.contains(&id),
                        ("AT_RESTORE", Some(id)) => restore_ids.contains(&id),
                        _ => false,
                    };

                    if !exists {
                        orphaned.push(job.job_id);
                    }
                }

                let count = orphaned.len();
                if !orphaned.is_empty() {
                    diesel::delete(job_queue::table.filter(job_queue::job_id.eq_any(orphaned)))
                        .execute(conn)?;
                }
                Ok::<_, diesel::result::Error>(count)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(pruned)
    }

    pub async fn count(&self) -> Result<i64, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let count = conn
            .interact(|conn| job_queue::table.count().first(conn))
            .await
            .map_err(CatalogError::from)??;
        Ok(count)
    }
}
