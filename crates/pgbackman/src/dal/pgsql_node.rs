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

//! PgSQL node data access.

use diesel::prelude::*;

use super::backup_server::TopologyDeletion;
use super::models::{NewPgPgsqlNode, PgNodeConfigParam, PgPgsqlNode};
use super::DAL;
use crate::database::schema::{backup_definitions, pgsql_node_config, pgsql_nodes};
use crate::error::CatalogError;
use crate::models::{NewPgsqlNode, NodeStatus, PgsqlNode};

pub struct PgsqlNodeDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> PgsqlNodeDAL<'a> {
    pub async fn register(&self, new: NewPgsqlNode) -> Result<PgsqlNode, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let pg_new: NewPgPgsqlNode = new.into();

        let row: PgPgsqlNode = conn
            .interact(move |conn| {
                diesel::insert_into(pgsql_nodes::table)
                    .values(&pg_new)
                    .get_result(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    pub async fn get_by_id(&self, node_id: i32) -> Result<Option<PgsqlNode>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: Option<PgPgsqlNode> = conn
            .interact(move |conn| pgsql_nodes::table.find(node_id).first(conn).optional())
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn get_by_fqdn(
        &self,
        hostname: &str,
        domain_name: &str,
    ) -> Result<Option<PgsqlNode>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let hostname = hostname.to_string();
        let domain_name = domain_name.to_string();

        let row: Option<PgPgsqlNode> = conn
            .interact(move |conn| {
                pgsql_nodes::table
                    .filter(pgsql_nodes::hostname.eq(hostname))
                    .filter(pgsql_nodes::domain_name.eq(domain_name))
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn list(&self) -> Result<Vec<PgsqlNode>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgPgsqlNode> = conn
            .interact(|conn| {
                pgsql_nodes::table
                    .order(pgsql_nodes::node_id.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn update(
        &self,
        node_id: i32,
        pgport: Option<i32>,
        admin_user: Option<String>,
        status: Option<NodeStatus>,
        remarks: Option<String>,
    ) -> Result<PgsqlNode, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let row: PgPgsqlNode = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    if let Some(p) = pgport {
                        diesel::update(pgsql_nodes::table.find(node_id))
                            .set(pgsql_nodes::pgport.eq(p))
                            .execute(conn)?;
                    }
                    if let Some(u) = admin_user {
                        diesel::update(pgsql_nodes::table.find(node_id))
                            .set(pgsql_nodes::admin_user.eq(u))
                            .execute(conn)?;
                    }
                    if let Some(s) = status {
                        diesel::update(pgsql_nodes::table.find(node_id))
                            .set(pgsql_nodes::status.eq(s.as_str()))
                            .execute(conn)?;
                    }
                    if let Some(r) = remarks {
                        diesel::update(pgsql_nodes::table.find(node_id))
                            .set(pgsql_nodes::remarks.eq(r))
                            .execute(conn)?;
                    }
                    pgsql_nodes::table.find(node_id).first(conn)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        row.try_into()
    }

    /// Deletes a node unless any backup definition still references it.
    pub async fn delete(&self, node_id: i32) -> Result<TopologyDeletion, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let outcome = conn
            .interact(move |conn| {
                conn.transaction(|conn| {
                    let references: i64 = backup_definitions::table
                        .filter(backup_definitions::pgsql_node_id.eq(node_id))
                        .count()
                        .first(conn)?;

                    if references > 0 {
                        return Ok(TopologyDeletion::InUse {
                            definitions: references,
                        });
                    }

                    diesel::delete(
                        pgsql_node_config::table.filter(pgsql_node_config::node_id.eq(node_id)),
                    )
                    .execute(conn)?;
                    diesel::delete(pgsql_nodes::table.find(node_id)).execute(conn)?;

                    Ok::<_, diesel::result::Error>(TopologyDeletion::Deleted)
                })
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(outcome)
    }

    pub async fn config(&self, node_id: i32) -> Result<Vec<(String, String)>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let rows: Vec<PgNodeConfigParam> = conn
            .interact(move |conn| {
                pgsql_node_config::table
                    .filter(pgsql_node_config::node_id.eq(node_id))
                    .order(pgsql_node_config::parameter.asc())
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(rows.into_iter().map(|r| (r.parameter, r.value)).collect())
    }

    pub async fn get_config_value(
        &self,
        node_id: i32,
        parameter: &str,
    ) -> Result<Option<String>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let parameter = parameter.to_string();

        let value: Option<String> = conn
            .interact(move |conn| {
                pgsql_node_config::table
                    .filter(pgsql_node_config::node_id.eq(node_id))
                    .filter(pgsql_node_config::parameter.eq(parameter))
                    .select(pgsql_node_config::value)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(value)
    }

    pub async fn set_config_value(
        &self,
        node_id: i32,
        parameter: &str,
        value: &str,
    ) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;
        let parameter = parameter.to_string();
        let value = value.to_string();

        conn.interact(move |conn| {
            diesel::insert_into(pgsql_node_config::table)
                .values((
                    pgsql_node_config::node_id.eq(node_id),
                    pgsql_node_config::parameter.eq(&parameter),
                    pgsql_node_config::value.eq(&value),
                    pgsql_node_config::description.eq(""),
                ))
                .on_conflict((pgsql_node_config::node_id, pgsql_node_config::parameter))
                .do_update()
                .set(pgsql_node_config::value.eq(&value))
                .execute(conn)
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    /// Distinct database names already covered by a definition on a node.
    ///
    /// Feeds the `#databases_without_backup_definitions#` expansion.
    pub async fn databases_with_definitions(
        &self,
        node_id: i32,
    ) -> Result<Vec<String>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let names: Vec<String> = conn
            .interact(move |conn| {
                backup_definitions::table
                    .filter(backup_definitions::pgsql_node_id.eq(node_id))
                    .select(backup_definitions::dbname)
                    .distinct()
                    .load(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(names)
    }
}
