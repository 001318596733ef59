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

//! PostgreSQL binary directory data access.

use diesel::prelude::*;

use super::models::{PgDefaultPgBinDir, PgPgBinDir};
use super::DAL;
use crate::database::schema::{backup_server_default_pg_bin_dirs, backup_server_pg_bin_dirs};
use crate::error::CatalogError;
use crate::models::{DefaultPgBinDir, PgBinDir};

pub struct PgBinDirDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> PgBinDirDAL<'a> {
    pub async fn register(&self, entry: PgBinDir) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_entry: PgPgBinDir = entry.into();

        conn.interact(move |conn| {
            diesel::insert_into(backup_server_pg_bin_dirs::table)
                .values(&pg_entry)
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    pub async fn update(&self, entry: PgBinDir) -> Result<bool, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    backup_server_pg_bin_dirs::table
                        .find((entry.backup_server_id, entry.pg_version.clone())),
                )
                .set((
                    backup_server_pg_bin_dirs::bin_dir.eq(entry.bin_dir),
                    backup_server_pg_bin_dirs::description.eq(entry.description),
                ))
                .execute(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(updated > 0)
    }

    pub async fn delete(
        &self,
        backup_server_id: i32,
        pg_version: &str,
    ) -> Result<bool, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_version = pg_version.to_string();

        let deleted = conn
            .interact(move |conn| {
                diesel::delete(
                    backup_server_pg_bin_dirs::table.find((backup_server_id, pg_version)),
                )
                .execute(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(deleted > 0)
    }

    pub async fn list_for_server(
        &self,
        backup_server_id: i32,
    ) -> Result<Vec<PgBinDir>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgPgBinDir> = conn
            .interact(move |conn| {
                backup_server_pg_bin_dirs::table
                    .filter(backup_server_pg_bin_dirs::backup_server_id.eq(backup_server_id))
                    .order(backup_server_pg_bin_dirs::pg_version.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn register_default(&self, entry: DefaultPgBinDir) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_entry: PgDefaultPgBinDir = entry.into();

        conn.interact(move |conn| {
            diesel::insert_into(backup_server_default_pg_bin_dirs::table)
                .values(&pg_entry)
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    pub async fn update_default(&self, entry: DefaultPgBinDir) -> Result<bool, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    backup_server_default_pg_bin_dirs::table.find(entry.pg_version.clone()),
                )
                .set((
                    backup_server_default_pg_bin_dirs::bin_dir.eq(entry.bin_dir),
                    backup_server_default_pg_bin_dirs::description.eq(entry.description),
                ))
                .execute(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(updated > 0)
    }

    pub async fn delete_default(&self, pg_version: &str) -> Result<bool, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_version = pg_version.to_string();

        let deleted = conn
            .interact(move |conn| {
                diesel::delete(backup_server_default_pg_bin_dirs::table.find(pg_version))
                    .execute(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(deleted > 0)
    }

    pub async fn list_defaults(&self) -> Result<Vec<DefaultPgBinDir>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgDefaultPgBinDir> = conn
            .interact(|conn| {
                backup_server_default_pg_bin_dirs::table
                    .order(backup_server_default_pg_bin_dirs::pg_version.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Resolves the binary directory for a pg_dump release on a server:
    /// the per-server map first, the system-wide defaults table second.
    pub async fn resolve(
        &self,
        backup_server_id: i32,
        pg_version: &str,
    ) -> Result<Option<String>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_version = pg_version.to_string();

        let bin_dir: Option<String> = conn
            .interact(move |conn| {
                let per_server: Option<String> = backup_server_pg_bin_dirs::table
                    .find((backup_server_id, pg_version.clone()))
                    .select(backup_server_pg_bin_dirs::bin_dir)
                    .first(conn)
                    .optional()?;

                if per_server.is_some() {
                    return Ok::<_, diesel::result::Error>(per_server);
                }

                backup_server_default_pg_bin_dirs::table
                    .find(pg_version)
                    .select(backup_server_default_pg_bin_dirs::bin_dir)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(bin_dir)
    }
}
