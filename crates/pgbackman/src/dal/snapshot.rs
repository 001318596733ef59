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

//! Snapshot definition data access.

use diesel::prelude::*;

use super::job_queue::enqueue_on;
use super::models::{NewPgSnapshotDefinition, PgSnapshotDefinition};
use super::DAL;
use crate::database::schema::{backup_catalog, snapshot_definitions};
use crate::error::CatalogError;
use crate::models::{
    JobKind, NewSnapshotDefinition, OneShotStatus, SnapshotDefinition, SnapshotPayload,
};

pub struct SnapshotDefinitionDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> SnapshotDefinitionDAL<'a> {
    /// Inserts a WAITING snapshot and its AT_SNAPSHOT queue row in one
    /// transaction.
    pub async fn register(
        &self,
        new: NewSnapshotDefinition,
    ) -> Result<SnapshotDefinition, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgSnapshotDefinition = new.into();

        let row: PgSnapshotDefinition = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let row: PgSnapshotDefinition =
                        diesel::insert_into(snapshot_definitions::table)
                            .values(&pg_new)
                            .get_result(conn)?;

                    enqueue_on(
                        conn,
                        row.backup_server_id,
                        Some(row.pgsql_node_id),
                        JobKind::AtSnapshot,
                        serde_json::json!(SnapshotPayload {
                            snapshot_id: row.snapshot_id,
                        }),
                    )?;

                    Ok::<_, diesel::result::Error>(row)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    pub async fn get_by_id(
        &self,
        snapshot_id: i64,
    ) -> Result<Option<SnapshotDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgSnapshotDefinition> = conn
            .interact(move |conn| {
                snapshot_definitions::table
                    .find(snapshot_id)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn list(&self) -> Result<Vec<SnapshotDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgSnapshotDefinition> = conn
            .interact(|conn| {
                snapshot_definitions::table
                    .order(snapshot_definitions::snapshot_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// WAITING -> DEFINED / ERROR transitions, driven by the control daemon
    /// after the AT install attempt.
    pub async fn set_status(
        &self,
        snapshot_id: i64,
        status: OneShotStatus,
        error_message: Option<String>,
    ) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            diesel::update(snapshot_definitions::table.find(snapshot_id))
                .set((
                    snapshot_definitions::status.eq(status.as_str()),
                    snapshot_definitions::error_message.eq(error_message),
                ))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    /// DEFINED snapshots whose dump has not produced a catalog row yet.
    pub async fn in_progress(&self) -> Result<Vec<SnapshotDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgSnapshotDefinition> = conn
            .interact(|conn| {
                let executed: Vec<Option<i64>> = backup_catalog::table
                    .select(backup_catalog::snapshot_id)
                    .distinct()
                    .load(conn)?;
                let executed: Vec<i64> = executed.into_iter().flatten().collect();

                snapshot_definitions::table
                    .filter(snapshot_definitions::status.eq(OneShotStatus::Defined.as_str()))
                    .filter(snapshot_definitions::snapshot_id.ne_all(executed))
                    .order(snapshot_definitions::at_time.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn count(&self) -> Result<i64, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let count = conn
            .interact(|conn| snapshot_definitions::table.count().first(conn))
            .await
            .map_err(CatalogError::from)??;
        Ok(count)
    }
}
