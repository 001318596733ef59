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

//! Aggregate statistics queries.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use super::DAL;
use crate::database::schema::{
    backup_catalog, backup_definitions, backup_servers, job_queue, pgsql_nodes,
    restore_definitions, snapshot_definitions,
};
use crate::error::CatalogError;
use crate::models::{BackupServerStats, PgbackmanStats, PgsqlNodeStats};

pub struct StatsDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> StatsDAL<'a> {
    pub async fn pgbackman_stats(&self) -> Result<PgbackmanStats, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let stats = conn
            .interact(|conn| {
                let backup_servers_count: i64 = backup_servers::table.count().first(conn)?;
                let servers_running: i64 = backup_servers::table
                    .filter(backup_servers::status.eq("RUNNING"))
                    .count()
                    .first(conn)?;
                let nodes: i64 = pgsql_nodes::table.count().first(conn)?;
                let nodes_running: i64 = pgsql_nodes::table
                    .filter(pgsql_nodes::status.eq("RUNNING"))
                    .count()
                    .first(conn)?;
                let defs: i64 = backup_definitions::table.count().first(conn)?;
                let defs_active: i64 = backup_definitions::table
                    .filter(backup_definitions::job_status.eq("ACTIVE"))
                    .count()
                    .first(conn)?;
                let snapshots: i64 = snapshot_definitions::table.count().first(conn)?;
                let restores: i64 = restore_definitions::table.count().first(conn)?;
                let entries: i64 = backup_catalog::table.count().first(conn)?;
                let entries_succeeded: i64 = backup_catalog::table
                    .filter(backup_catalog::execution_status.eq("SUCCEEDED"))
                    .count()
                    .first(conn)?;
                let size: i64 = backup_catalog::table
                    .select(sql::<BigInt>("COALESCE(SUM(pg_dump_file_size), 0)"))
                    .first(conn)?;
                let queued: i64 = job_queue::table.count().first(conn)?;

                Ok::<_, diesel::result::Error>(PgbackmanStats {
                    backup_servers: backup_servers_count,
                    backup_servers_running: servers_running,
                    backup_servers_stopped: backup_servers_count - servers_running,
                    pgsql_nodes: nodes,
                    pgsql_nodes_running: nodes_running,
                    pgsql_nodes_down: nodes - nodes_running,
                    backup_definitions: defs,
                    backup_definitions_active: defs_active,
                    backup_definitions_stopped: defs - defs_active,
                    snapshot_definitions: snapshots,
                    restore_definitions: restores,
                    catalog_entries: entries,
                    catalog_entries_succeeded: entries_succeeded,
                    catalog_entries_error: entries - entries_succeeded,
                    catalog_size_bytes: size,
                    jobs_queued: queued,
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(stats)
    }

    pub async fn backup_server_stats(
        &self,
        backup_server_id: i32,
    ) -> Result<BackupServerStats, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let stats = conn
            .interact(move |conn| {
                let defs: i64 = backup_definitions::table
                    .filter(backup_definitions::backup_server_id.eq(backup_server_id))
                    .count()
                    .first(conn)?;
                let defs_active: i64 = backup_definitions::table
                    .filter(backup_definitions::backup_server_id.eq(backup_server_id))
                    .filter(backup_definitions::job_status.eq("ACTIVE"))
                    .count()
                    .first(conn)?;
                let entries: i64 = backup_catalog::table
                    .filter(backup_catalog::backup_server_id.eq(backup_server_id))
                    .count()
                    .first(conn)?;
                let entries_succeeded: i64 = backup_catalog::table
                    .filter(backup_catalog::backup_server_id.eq(backup_server_id))
                    .filter(backup_catalog::execution_status.eq("SUCCEEDED"))
                    .count()
                    .first(conn)?;
                let size: i64 = backup_catalog::table
                    .filter(backup_catalog::backup_server_id.eq(backup_server_id))
                    .select(sql::<BigInt>("COALESCE(SUM(pg_dump_file_size), 0)"))
                    .first(conn)?;
                let queued: i64 = job_queue::table
                    .filter(job_queue::backup_server_id.eq(backup_server_id))
                    .count()
                    .first(conn)?;

                Ok::<_, diesel::result::Error>(BackupServerStats {
                    backup_server_id,
                    backup_definitions: defs,
                    backup_definitions_active: defs_active,
                    catalog_entries: entries,
                    catalog_entries_succeeded: entries_succeeded,
                    catalog_entries_error: entries - entries_succeeded,
                    catalog_size_bytes: size,
                    jobs_queued: queued,
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(stats)
    }

    /// Per-node stats, keyed by node id.
    pub async fn pgsql_node_stats(
        &self,
        pgsql_node_id: i32,
    ) -> Result<PgsqlNodeStats, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let stats = conn
            .interact(move |conn| {
                let defs: i64 = backup_definitions::table
                    .filter(backup_definitions::pgsql_node_id.eq(pgsql_node_id))
                    .count()
                    .first(conn)?;
                let defs_active: i64 = backup_definitions::table
                    .filter(backup_definitions::pgsql_node_id.eq(pgsql_node_id))
                    .filter(backup_definitions::job_status.eq("ACTIVE"))
                    .count()
                    .first(conn)?;
                let entries: i64 = backup_catalog::table
                    .filter(backup_catalog::pgsql_node_id.eq(pgsql_node_id))
                    .count()
                    .first(conn)?;
                let entries_succeeded: i64 = backup_catalog::table
                    .filter(backup_catalog::pgsql_node_id.eq(pgsql_node_id))
                    .filter(backup_catalog::execution_status.eq("SUCCEEDED"))
                    .count()
                    .first(conn)?;
                let size: i64 = backup_catalog::table
                    .filter(backup_catalog::pgsql_node_id.eq(pgsql_node_id))
                    .select(sql::<BigInt>("COALESCE(SUM(pg_dump_file_size), 0)"))
                    .first(conn)?;

                Ok::<_, diesel::result::Error>(PgsqlNodeStats {
                    pgsql_node_id,
                    backup_definitions: defs,
                    backup_definitions_active: defs_active,
                    catalog_entries: entries,
                    catalog_entries_succeeded: entries_succeeded,
                    catalog_entries_error: entries - entries_succeeded,
                    catalog_size_bytes: size,
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(stats)
    }
}
