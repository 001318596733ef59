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

//! Backup and restore catalog data access.
//!
//! The backup catalog is append-only for the executor; rows disappear only
//! through force-deletion of their definition or through DELETE_ARTIFACT
//! processing. Insertion is keyed by a pre-reserved `bck_id` so artifact
//! filenames can embed it, and is idempotent on (definition, started,
//! finished) so that a pending-log drain can be re-run safely.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use super::models::{
    NewPgBackupCatalogEntry, NewPgRestoreCatalogEntry, PgBackupCatalogEntry,
    PgRestoreCatalogEntry,
};
use super::DAL;
use crate::database::schema::{backup_catalog, restore_catalog};
use crate::error::CatalogError;
use crate::models::{
    BackupCatalogEntry, ExecutionStatus, NewBackupCatalogEntry, NewRestoreCatalogEntry,
    RestoreCatalogEntry,
};

#[derive(QueryableByName)]
struct SeqRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    value: i64,
}

pub struct BackupCatalogDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> BackupCatalogDAL<'a> {
    /// Reserves the next `bck_id` from the catalog sequence.
    ///
    /// The executor calls this before the dump starts; the id names the
    /// artifact files and is used verbatim at insert time, preserving
    /// database-side monotonic assignment.
    pub async fn reserve_bck_id(&self) -> Result<i64, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: SeqRow = conn
            .interact(|conn| {
                diesel::sql_query("SELECT nextval('backup_catalog_bck_id_seq') AS value")
                    .get_result(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(row.value)
    }

    pub async fn insert(
        &self,
        new: NewBackupCatalogEntry,
    ) -> Result<BackupCatalogEntry, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgBackupCatalogEntry = new.into();

        let row: PgBackupCatalogEntry = conn
            .interact(move |conn| {
                diesel::insert_into(backup_catalog::table)
                    .values(&pg_new)
                    .get_result(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    /// Idempotent insert used by the pending-log drain.
    ///
    /// A drained line that matches an existing row on (def_id, snapshot_id,
    /// started, finished) is skipped, so re-draining a file converges on the
    /// same catalog state. Returns whether a row was inserted.
    pub async fn ingest_pending(
        &self,
        new: NewBackupCatalogEntry,
    ) -> Result<bool, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgBackupCatalogEntry = new.into();

        let inserted = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let mut query = backup_catalog::table
                        .filter(backup_catalog::started.eq(pg_new.started))
                        .filter(backup_catalog::finished.eq(pg_new.finished))
                        .into_boxed();

                    query = match (pg_new.def_id, pg_new.snapshot_id) {
                        (Some(def_id), _) => query.filter(backup_catalog::def_id.eq(def_id)),
                        (None, Some(snapshot_id)) => {
                            query.filter(backup_catalog::snapshot_id.eq(snapshot_id))
                        }
                        (None, None) => {
                            query.filter(backup_catalog::backup_server_id.eq(pg_new.backup_server_id))
                        }
                    };

                    let existing: i64 = query.count().first(conn)?;
                    if existing > 0 {
                        return Ok(false);
                    }

                    // The reserved bck_id may have been consumed while the
                    // line sat in the spool; take a fresh one.
                    let seq: SeqRow = diesel::sql_query(
                        "SELECT nextval('backup_catalog_bck_id_seq') AS value",
                    )
                    .get_result(conn)?;

                    let row = NewPgBackupCatalogEntry {
                        bck_id: seq.value,
                        ..pg_new
                    };
                    diesel::insert_into(backup_catalog::table)
                        .values(&row)
                        .execute(conn)?;

                    Ok::<_, diesel::result::Error>(true)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(inserted)
    }

    pub async fn get(&self, bck_id: i64) -> Result<Option<BackupCatalogEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgBackupCatalogEntry> = conn
            .interact(move |conn| backup_catalog::table.find(bck_id).first(conn).optional())
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    /// Catalog rows of one definition, newest finished first - the order
    /// retention evaluation expects.
    pub async fn entries_for_definition(
        &self,
        def_id: i64,
    ) -> Result<Vec<BackupCatalogEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgBackupCatalogEntry> = conn
            .interact(move |conn| {
                backup_catalog::table
                    .filter(backup_catalog::def_id.eq(def_id))
                    .order(backup_catalog::finished.desc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn list(
        &self,
        backup_server_id: Option<i32>,
        pgsql_node_id: Option<i32>,
        dbname: Option<String>,
    ) -> Result<Vec<BackupCatalogEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgBackupCatalogEntry> = conn
            .interact(move |conn| {
                let mut query = backup_catalog::table.into_boxed();

                if let Some(server) = backup_server_id {
                    query = query.filter(backup_catalog::backup_server_id.eq(server));
                }
                if let Some(node) = pgsql_node_id {
                    query = query.filter(backup_catalog::pgsql_node_id.eq(node));
                }
                if let Some(db) = dbname {
                    query = query.filter(backup_catalog::dbname.eq(db));
                }

                query.order(backup_catalog::finished.desc()).load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Marks a row's artifacts as intentionally removed by maintenance.
    pub async fn mark_deleted(&self, bck_id: i64) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            diesel::update(backup_catalog::table.find(bck_id))
                .set(backup_catalog::deleted.eq(true))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    /// Removes a row outright (force-deletion path). A no-op when the row
    /// is already gone, keeping DELETE_ARTIFACT retries idempotent.
    pub async fn purge_row(&self, bck_id: i64) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            diesel::delete(backup_catalog::table.find(bck_id)).execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    /// ERROR rows that have not been alerted yet.
    pub async fn error_unalerted(&self) -> Result<Vec<BackupCatalogEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgBackupCatalogEntry> = conn
            .interact(|conn| {
                backup_catalog::table
                    .filter(backup_catalog::execution_status.eq(ExecutionStatus::Error.as_str()))
                    .filter(backup_catalog::alerted_at.is_null())
                    .order(backup_catalog::bck_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Stamps the alert ACK that suppresses re-delivery.
    pub async fn mark_alerted(&self, bck_id: i64) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            diesel::update(backup_catalog::table.find(bck_id))
                .set(backup_catalog::alerted_at.eq(diesel::dsl::now))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }
}

pub struct RestoreCatalogDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> RestoreCatalogDAL<'a> {
    pub async fn insert(
        &self,
        new: NewRestoreCatalogEntry,
    ) -> Result<RestoreCatalogEntry, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgRestoreCatalogEntry = new.into();

        let row: PgRestoreCatalogEntry = conn
            .interact(move |conn| {
                diesel::insert_into(restore_catalog::table)
                    .values(&pg_new)
                    .get_result(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    /// Idempotent insert used by the pending-log drain.
    pub async fn ingest_pending(
        &self,
        new: NewRestoreCatalogEntry,
    ) -> Result<bool, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgRestoreCatalogEntry = new.into();

        let inserted = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let existing: i64 = restore_catalog::table
                        .filter(restore_catalog::restore_id.eq(pg_new.restore_id))
                        .filter(restore_catalog::started.eq(pg_new.started))
                        .filter(restore_catalog::finished.eq(pg_new.finished))
                        .count()
                        .first(conn)?;

                    if existing > 0 {
                        return Ok(false);
                    }

                    diesel::insert_into(restore_catalog::table)
                        .values(&pg_new)
                        .execute(conn)?;

                    Ok::<_, diesel::result::Error>(true)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(inserted)
    }

    pub async fn get(&self, rst_id: i64) -> Result<Option<RestoreCatalogEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgRestoreCatalogEntry> = conn
            .interact(move |conn| restore_catalog::table.find(rst_id).first(conn).optional())
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn list(
        &self,
        backup_server_id: Option<i32>,
        target_pgsql_node_id: Option<i32>,
    ) -> Result<Vec<RestoreCatalogEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgRestoreCatalogEntry> = conn
            .interact(move |conn| {
                let mut query = restore_catalog::table.into_boxed();

                if let Some(server) = backup_server_id {
                    query = query.filter(restore_catalog::backup_server_id.eq(server));
                }
                if let Some(node) = target_pgsql_node_id {
                    query = query.filter(restore_catalog::target_pgsql_node_id.eq(node));
                }

                query.order(restore_catalog::finished.desc()).load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Removes rows older than the retention window. Run by maintenance.
    pub async fn purge_older_than(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<usize, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let cutoff = now - window;

        let purged = conn
            .interact(move |conn| {
                diesel::delete(restore_catalog::table.filter(restore_catalog::finished.lt(cutoff)))
                    .execute(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(purged)
    }

    pub async fn error_unalerted(&self) -> Result<Vec<RestoreCatalogEntry>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgRestoreCatalogEntry> = conn
            .interact(|conn| {
                restore_catalog::table
                    .filter(restore_catalog::execution_status.eq(ExecutionStatus::Error.as_str()))
                    .filter(restore_catalog::alerted_at.is_null())
                    .order(restore_catalog::rst_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn mark_alerted(&self, rst_id: i64) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            diesel::update(restore_catalog::table.find(rst_id))
                .set(restore_catalog::alerted_at.eq(diesel::dsl::now))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }
}
