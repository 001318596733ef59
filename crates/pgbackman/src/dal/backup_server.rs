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

//! Backup server data access.

use diesel::prelude::*;

use super::models::{NewPgBackupServer, PgBackupServer, PgServerConfigParam};
use super::DAL;
use crate::database::schema::{backup_definitions, backup_server_config, backup_servers};
use crate::error::CatalogError;
use crate::models::{BackupServer, NewBackupServer, ServerStatus};

/// Outcome of deleting a backup server or PgSQL node.
///
/// Deletion is refused while backup definitions still reference the entity;
/// the caller turns `InUse` into a constraint error.
#[derive(Debug)]
pub enum TopologyDeletion {
    Deleted,
    InUse { definitions: i64 },
}

pub struct BackupServerDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> BackupServerDAL<'a> {
    pub async fn register(&self, new: NewBackupServer) -> Result<BackupServer, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgBackupServer = new.into();

        let row: PgBackupServer = conn
            .interact(move |conn| {
                diesel::insert_into(backup_servers::table)
                    .values(&pg_new)
                    .get_result(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    pub async fn get_by_id(&self, server_id: i32) -> Result<Option<BackupServer>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgBackupServer> = conn
            .interact(move |conn| {
                backup_servers::table
                    .find(server_id)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn get_by_fqdn(
        &self,
        hostname: &str,
        domain_name: &str,
    ) -> Result<Option<BackupServer>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let hostname = hostname.to_string();
        let domain_name = domain_name.to_string();

        let row: Option<PgBackupServer> = conn
            .interact(move |conn| {
                backup_servers::table
                    .filter(backup_servers::hostname.eq(hostname))
                    .filter(backup_servers::domain_name.eq(domain_name))
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn list(&self) -> Result<Vec<BackupServer>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgBackupServer> = conn
            .interact(|conn| {
                backup_servers::table
                    .order(backup_servers::server_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn update(
        &self,
        server_id: i32,
        status: Option<ServerStatus>,
        remarks: Option<String>,
    ) -> Result<BackupServer, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: PgBackupServer = conn
            .interact(move |conn| {
                // Dynamic two-field update; diesel's changeset would need an
                // AsChangeset struct with all-optional fields, overkill here.
                match (status, remarks) {
                    (Some(s), Some(r)) => diesel::update(backup_servers::table.find(server_id))
                        .set((
                            backup_servers::status.eq(s.as_str()),
                            backup_servers::remarks.eq(r),
                        ))
                        .get_result(conn),
                    (Some(s), None) => diesel::update(backup_servers::table.find(server_id))
                        .set(backup_servers::status.eq(s.as_str()))
                        .get_result(conn),
                    (None, Some(r)) => diesel::update(backup_servers::table.find(server_id))
                        .set(backup_servers::remarks.eq(r))
                        .get_result(conn),
                    (None, None) => backup_servers::table.find(server_id).first(conn),
                }
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    /// Deletes a server unless any backup definition still references it.
    /// Config parameters and bin-dir registrations go with it.
    pub async fn delete(&self, server_id: i32) -> Result<TopologyDeletion, CatalogError> {
        use crate::database::schema::backup_server_pg_bin_dirs;

        let conn = self.dal.database.get_connection().await?;

        let outcome = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let references: i64 = backup_definitions::table
                        .filter(backup_definitions::backup_server_id.eq(server_id))
                        .count()
                        .first(conn)?;

                    if references > 0 {
                        return Ok(TopologyDeletion::InUse {
                            definitions: references,
                        });
                    }

                    diesel::delete(
                        backup_server_config::table
                            .filter(backup_server_config::server_id.eq(server_id)),
                    )
                    .execute(conn)?;
                    diesel::delete(
                        backup_server_pg_bin_dirs::table
                            .filter(backup_server_pg_bin_dirs::backup_server_id.eq(server_id)),
                    )
                    .execute(conn)?;
                    diesel::delete(backup_servers::table.find(server_id)).execute(conn)?;

                    Ok::<_, diesel::result::Error>(TopologyDeletion::Deleted)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(outcome)
    }

    /// All configuration parameters attached to a server.
    pub async fn config(&self, server_id: i32) -> Result<Vec<(String, String)>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgServerConfigParam> = conn
            .interact(move |conn| {
                backup_server_config::table
                    .filter(backup_server_config::server_id.eq(server_id))
                    .order(backup_server_config::parameter.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(rows.into_iter().map(|r| (r.parameter, r.value)).collect())
    }

    pub async fn get_config_value(
        &self,
        server_id: i32,
        parameter: &str,
    ) -> Result<Option<String>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let parameter = parameter.to_string();

        let value: Option<String> = conn
            .interact(move |conn| {
                backup_server_config::table
                    .filter(backup_server_config::server_id.eq(server_id))
                    .filter(backup_server_config::parameter.eq(parameter))
                    .select(backup_server_config::value)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(value)
    }

    /// Upserts a configuration parameter.
    pub async fn set_config_value(
        &self,
        server_id: i32,
        parameter: &str,
        value: &str,
    ) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let parameter = parameter.to_string();
        let value = value.to_string();

        conn.interact(move |conn| {
            diesel::insert_into(backup_server_config::table)
                .values((
                    backup_server_config::server_id.eq(server_id),
                    backup_server_config::parameter.eq(&parameter),
                    backup_server_config::value.eq(&value),
                    backup_server_config::description.eq(""),
                ))
                .on_conflict((
                    backup_server_config::server_id,
                    backup_server_config::parameter,
                ))
                .do_update()
                .set(backup_server_config::value.eq(&value))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }
}
