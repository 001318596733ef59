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

//! Backup definition data access.
//!
//! Every mutation runs in one transaction together with the CRONTAB
//! job-queue rows it implies, so a definition change can never be observed
//! without its pending crontab regeneration.

use diesel::prelude::*;

use super::job_queue::enqueue_on;
use super::models::{NewPgBackupDefinition, PgBackupCatalogEntry, PgBackupDefinition};
use super::DAL;
use crate::database::schema::{backup_catalog, backup_definitions};
use crate::error::CatalogError;
use crate::models::{
    BackupDefinition, DeleteArtifactPayload, JobKind, JobStatus, NewBackupDefinition,
};
use crate::models::backup_definition::BackupDefinitionChanges;

/// Outcome of a definition deletion.
#[derive(Debug)]
pub enum DefinitionDeletion {
    /// Definition rows removed; for force-deletion, one DELETE_ARTIFACT job
    /// was scheduled per removed catalog row.
    Deleted {
        def_ids: Vec<i64>,
        artifacts_scheduled: usize,
    },
    /// Refused: catalog rows exist and force-deletion was not asserted.
    HasCatalogRows { count: i64 },
}

pub struct BackupDefinitionDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> BackupDefinitionDAL<'a> {
    /// Inserts a definition and enqueues the CRONTAB regeneration for its
    /// backup server, in one transaction.
    ///
    /// The partial unique index on (server, node, dbname, code) surfaces
    /// duplicates as a `UniqueViolation`.
    pub async fn register(
        &self,
        new: NewBackupDefinition,
    ) -> Result<BackupDefinition, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgBackupDefinition = new.into();

        let row: PgBackupDefinition = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let row: PgBackupDefinition = diesel::insert_into(backup_definitions::table)
                        .values(&pg_new)
                        .get_result(conn)?;

                    enqueue_on(
                        conn,
                        row.backup_server_id,
                        Some(row.pgsql_node_id),
                        JobKind::Crontab,
                        serde_json::json!({}),
                    )?;

                    Ok::<_, diesel::result::Error>(row)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    pub async fn get_by_id(&self, def_id: i64) -> Result<Option<BackupDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgBackupDefinition> = conn
            .interact(move |conn| {
                backup_definitions::table.find(def_id).first(conn).optional()
            })
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    /// Applies field changes and enqueues CRONTAB regeneration. Returns
    /// `None` when the definition does not exist.
    pub async fn update(
        &self,
        def_id: i64,
        changes: BackupDefinitionChanges,
    ) -> Result<Option<BackupDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgBackupDefinition> = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let existing: Option<PgBackupDefinition> = backup_definitions::table
                        .find(def_id)
                        .first(conn)
                        .optional()?;

                    let Some(existing) = existing else {
                        return Ok(None);
                    };

                    let schedule = changes.schedule;
                    diesel::update(backup_definitions::table.find(def_id))
                        .set((
                            backup_definitions::minutes_cron.eq(schedule
                                .as_ref()
                                .map(|s| s.minutes.clone())
                                .unwrap_or(existing.minutes_cron)),
                            backup_definitions::hours_cron.eq(schedule
                                .as_ref()
                                .map(|s| s.hours.clone())
                                .unwrap_or(existing.hours_cron)),
                            backup_definitions::day_month_cron.eq(schedule
                                .as_ref()
                                .map(|s| s.day_month.clone())
                                .unwrap_or(existing.day_month_cron)),
                            backup_definitions::month_cron.eq(schedule
                                .as_ref()
                                .map(|s| s.month.clone())
                                .unwrap_or(existing.month_cron)),
                            backup_definitions::weekday_cron.eq(schedule
                                .as_ref()
                                .map(|s| s.weekday.clone())
                                .unwrap_or(existing.weekday_cron)),
                            backup_definitions::backup_code.eq(changes
                                .backup_code
                                .map(|c| c.as_str().to_string())
                                .unwrap_or(existing.backup_code)),
                            backup_definitions::encryption
                                .eq(changes.encryption.unwrap_or(existing.encryption)),
                            backup_definitions::retention_period.eq(changes
                                .retention_period
                                .unwrap_or(existing.retention_period)),
                            backup_definitions::retention_redundancy.eq(changes
                                .retention_redundancy
                                .unwrap_or(existing.retention_redundancy)),
                            backup_definitions::extra_parameters.eq(changes
                                .extra_parameters
                                .unwrap_or(existing.extra_parameters)),
                            backup_definitions::job_status.eq(changes
                                .job_status
                                .map(|s| s.as_str().to_string())
                                .unwrap_or(existing.job_status)),
                            backup_definitions::remarks
                                .eq(changes.remarks.unwrap_or(existing.remarks)),
                            backup_definitions::updated.eq(diesel::dsl::now),
                        ))
                        .execute(conn)?;

                    enqueue_on(
                        conn,
                        existing.backup_server_id,
                        Some(existing.pgsql_node_id),
                        JobKind::Crontab,
                        serde_json::json!({}),
                    )?;

                    backup_definitions::table.find(def_id).first(conn).map(Some)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    /// Deletes one definition by id. See [`Self::delete_matching`].
    pub async fn delete(
        &self,
        def_id: i64,
        force: bool,
    ) -> Result<Option<DefinitionDeletion>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let outcome = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let rows: Vec<PgBackupDefinition> = backup_definitions::table
                        .filter(backup_definitions::def_id.eq(def_id))
                        .load(conn)?;
                    delete_rows(conn, rows, force)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(outcome)
    }

    /// Deletes every definition of a database on a (server, node) pair.
    pub async fn delete_by_dbname(
        &self,
        backup_server_id: i32,
        pgsql_node_id: i32,
        dbname: String,
        force: bool,
    ) -> Result<Option<DefinitionDeletion>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let outcome = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let rows: Vec<PgBackupDefinition> = backup_definitions::table
                        .filter(backup_definitions::backup_server_id.eq(backup_server_id))
                        .filter(backup_definitions::pgsql_node_id.eq(pgsql_node_id))
                        .filter(backup_definitions::dbname.eq(&dbname))
                        .load(conn)?;
                    delete_rows(conn, rows, force)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(outcome)
    }

    /// Reassigns definitions from one backup server to another and enqueues
    /// CRONTAB regeneration on both sides for every affected node.
    pub async fn move_definitions(
        &self,
        from_server_id: i32,
        to_server_id: i32,
        pgsql_node_id: Option<i32>,
        dbname: Option<String>,
        def_id: Option<i64>,
    ) -> Result<Vec<i64>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let moved = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let mut query = backup_definitions::table
                        .filter(backup_definitions::backup_server_id.eq(from_server_id))
                        .into_boxed();

                    if let Some(node) = pgsql_node_id {
                        query = query.filter(backup_definitions::pgsql_node_id.eq(node));
                    }
                    if let Some(ref db) = dbname {
                        query = query.filter(backup_definitions::dbname.eq(db.clone()));
                    }
                    if let Some(id) = def_id {
                        query = query.filter(backup_definitions::def_id.eq(id));
                    }

                    let rows: Vec<PgBackupDefinition> = query.load(conn)?;
                    if rows.is_empty() {
                        return Ok(Vec::new());
                    }

                    let ids: Vec<i64> = rows.iter().map(|r| r.def_id).collect();
                    diesel::update(
                        backup_definitions::table
                            .filter(backup_definitions::def_id.eq_any(ids.clone())),
                    )
                    .set((
                        backup_definitions::backup_server_id.eq(to_server_id),
                        backup_definitions::updated.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?;

                    let mut nodes: Vec<i32> = rows.iter().map(|r| r.pgsql_node_id).collect();
                    nodes.sort_unstable();
                    nodes.dedup();

                    for node in nodes {
                        enqueue_on(
                            conn,
                            from_server_id,
                            Some(node),
                            JobKind::Crontab,
                            serde_json::json!({}),
                        )?;
                        enqueue_on(
                            conn,
                            to_server_id,
                            Some(node),
                            JobKind::Crontab,
                            serde_json::json!({}),
                        )?;
                    }

                    Ok::<_, diesel::result::Error>(ids)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(moved)
    }

    pub async fn list(
        &self,
        backup_server_id: Option<i32>,
        pgsql_node_id: Option<i32>,
        dbname: Option<String>,
    ) -> Result<Vec<BackupDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgBackupDefinition> = conn
            .interact(move |conn| {
                let mut query = backup_definitions::table.into_boxed();

                if let Some(server) = backup_server_id {
                    query = query.filter(backup_definitions::backup_server_id.eq(server));
                }
                if let Some(node) = pgsql_node_id {
                    query = query.filter(backup_definitions::pgsql_node_id.eq(node));
                }
                if let Some(db) = dbname {
                    query = query.filter(backup_definitions::dbname.eq(db));
                }

                query.order(backup_definitions::def_id.asc()).load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// ACTIVE definitions for one (server, node) pair in def_id order - the
    /// exact set and order the crontab renderer consumes.
    pub async fn active_for_pair(
        &self,
        backup_server_id: i32,
        pgsql_node_id: i32,
    ) -> Result<Vec<BackupDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgBackupDefinition> = conn
            .interact(move |conn| {
                backup_definitions::table
                    .filter(backup_definitions::backup_server_id.eq(backup_server_id))
                    .filter(backup_definitions::pgsql_node_id.eq(pgsql_node_id))
                    .filter(backup_definitions::job_status.eq(JobStatus::Active.as_str()))
                    .order(backup_definitions::def_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Definitions that have never produced a catalog row.
    pub async fn without_catalog_entries(&self) -> Result<Vec<BackupDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgBackupDefinition> = conn
            .interact(|conn| {
                let referenced: Vec<Option<i64>> = backup_catalog::table
                    .select(backup_catalog::def_id)
                    .distinct()
                    .load(conn)?;
                let referenced: Vec<i64> = referenced.into_iter().flatten().collect();

                backup_definitions::table
                    .filter(backup_definitions::def_id.ne_all(referenced))
                    .order(backup_definitions::def_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Shared deletion body: refuses when catalog rows exist without force;
/// with force, removes the catalog rows in the same transaction and
/// schedules one DELETE_ARTIFACT job per row to unlink its files.
fn delete_rows(
    conn: &mut PgConnection,
    rows: Vec<PgBackupDefinition>,
    force: bool,
) -> Result<Option<DefinitionDeletion>, diesel::result::Error> {
    if rows.is_empty() {
        return Ok(None);
    }

    let def_ids: Vec<i64> = rows.iter().map(|r| r.def_id).collect();

    let catalog_rows: Vec<PgBackupCatalogEntry> = backup_catalog::table
        .filter(backup_catalog::def_id.eq_any(def_ids.clone()))
        .load(conn)?;

    if !catalog_rows.is_empty() && !force {
        return Ok(Some(DefinitionDeletion::HasCatalogRows {
            count: catalog_rows.len() as i64,
        }));
    }

    let mut artifacts_scheduled = 0;
    for entry in &catalog_rows {
        let files: Vec<String> = [
            &entry.pg_dump_file,
            &entry.pg_dump_log_file,
            &entry.globals_file,
            &entry.globals_log_file,
            &entry.indexes_file,
            &entry.indexes_log_file,
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect();

        enqueue_on(
            conn,
            entry.backup_server_id,
            Some(entry.pgsql_node_id),
            JobKind::DeleteArtifact,
            serde_json::json!(DeleteArtifactPayload {
                bck_id: entry.bck_id,
                files,
                purge_row: true,
            }),
        )?;
        artifacts_scheduled += 1;
    }

    if !catalog_rows.is_empty() {
        diesel::delete(
            backup_catalog::table.filter(backup_catalog::def_id.eq_any(def_ids.clone())),
        )
        .execute(conn)?;
    }

    diesel::delete(
        backup_definitions::table.filter(backup_definitions::def_id.eq_any(def_ids.clone())),
    )
    .execute(conn)?;

    let mut pairs: Vec<(i32, i32)> = rows
        .iter()
        .map(|r| (r.backup_server_id, r.pgsql_node_id))
        .collect();
    pairs.sort_unstable();
    pairs.dedup();

    for (server, node) in pairs {
        enqueue_on(
            conn,
            server,
            Some(node),
            JobKind::Crontab,
            serde_json::json!({}),
        )?;
    }

    Ok(Some(DefinitionDeletion::Deleted {
        def_ids,
        artifacts_scheduled,
    }))
}
