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

//! Restore definition data access.

use diesel::prelude::*;

use super::job_queue::enqueue_on;
use super::models::{NewPgRestoreDefinition, PgRestoreDefinition};
use super::DAL;
use crate::database::schema::{restore_catalog, restore_definitions};
use crate::error::CatalogError;
use crate::models::{
    JobKind, NewRestoreDefinition, OneShotStatus, RestoreDefinition, RestorePayload,
};

pub struct RestoreDefinitionDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> RestoreDefinitionDAL<'a> {
    /// Inserts a WAITING restore and its AT_RESTORE queue row in one
    /// transaction.
    pub async fn register(
        &self,
        new: NewRestoreDefinition,
    ) -> Result<RestoreDefinition, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgRestoreDefinition = new.into();

        let row: PgRestoreDefinition = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let row: PgRestoreDefinition =
                        diesel::insert_into(restore_definitions::table)
                            .values(&pg_new)
                            .get_result(conn)?;

                    enqueue_on(
                        conn,
                        row.backup_server_id,
                        Some(row.target_pgsql_node_id),
                        JobKind::AtRestore,
                        serde_json::json!(RestorePayload {
                            restore_id: row.restore_id,
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
        restore_id: i64,
    ) -> Result<Option<RestoreDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgRestoreDefinition> = conn
            .interact(move |conn| {
                restore_definitions::table
                    .find(restore_id)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn list(&self) -> Result<Vec<RestoreDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgRestoreDefinition> = conn
            .interact(|conn| {
                restore_definitions::table
                    .order(restore_definitions::restore_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn set_status(
        &self,
        restore_id: i64,
        status: OneShotStatus,
        error_message: Option<String>,
    ) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            diesel::update(restore_definitions::table.find(restore_id))
                .set((
                    restore_definitions::status.eq(status.as_str()),
                    restore_definitions::error_message.eq(error_message),
                ))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    /// DEFINED restores that have not produced a restore catalog row yet.
    pub async fn in_progress(&self) -> Result<Vec<RestoreDefinition>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgRestoreDefinition> = conn
            .interact(|conn| {
                let executed: Vec<i64> = restore_catalog::table
                    .select(restore_catalog::restore_id)
                    .distinct()
                    .load(conn)?;

                restore_definitions::table
                    .filter(restore_definitions::status.eq(OneShotStatus::Defined.as_str()))
                    .filter(restore_definitions::restore_id.ne_all(executed))
                    .order(restore_definitions::at_time.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn count(&self) -> Result<i64, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let count = conn
            .interact(|conn| restore_definitions::table.count().first(conn))
            .await
            .map_err(CatalogError::from)??;
        Ok(count)
    }
}
