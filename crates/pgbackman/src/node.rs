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

//! Access to the PgSQL nodes being protected.
//!
//! The admin API needs a node's database list for bulk registration and an
//! existence check before accepting a definition; the executor needs role
//! lists, the server version and recovery control. [`NodeInspector`]
//! abstracts that surface so tests can substitute a fixture node.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::Text;
use tokio::task;

use crate::error::WorkerError;
use crate::models::PgsqlNode;

/// Databases every expansion excludes besides the operator's own list.
pub const EXCLUDED_DATABASES: [&str; 3] = ["template0", "template1", "postgres"];

#[async_trait]
pub trait NodeInspector: Send + Sync {
    /// Every database on the node, including templates; callers filter.
    async fn list_databases(&self) -> Result<Vec<String>, WorkerError>;

    async fn database_exists(&self, dbname: &str) -> Result<bool, WorkerError>;

    async fn list_roles(&self) -> Result<Vec<String>, WorkerError>;

    /// The node's `server_version`, e.g. "16.2".
    async fn server_version(&self) -> Result<String, WorkerError>;

    async fn is_in_recovery(&self) -> Result<bool, WorkerError>;

    /// Pauses / resumes WAL replay on a hot standby.
    async fn set_recovery_paused(&self, paused: bool) -> Result<(), WorkerError>;
}

/// Produces an inspector for a node. The default implementation connects
/// directly; tests install a factory returning fixtures.
pub trait NodeInspectorFactory: Send + Sync {
    fn for_node(&self, node: &PgsqlNode) -> Box<dyn NodeInspector>;
}

/// Direct libpq-based inspector.
pub struct PgNodeInspector {
    dsn: String,
}

impl PgNodeInspector {
    pub fn new(node: &PgsqlNode) -> Self {
        Self {
            dsn: format!(
                "postgres://{}@{}:{}/postgres",
                node.admin_user,
                node.fqdn(),
                node.pgport
            ),
        }
    }

    /// Uses an explicit DSN, e.g. the node's `pgsql_node_dsn` config value.
    pub fn with_dsn(dsn: String) -> Self {
        Self { dsn }
    }

    async fn query_strings(&self, query: &'static str) -> Result<Vec<String>, WorkerError> {
        let dsn = self.dsn.clone();

        task::spawn_blocking(move || {
            let mut conn = PgConnection::establish(&dsn)
                .map_err(|e| WorkerError::Invalid(format!("cannot connect to node: {}", e)))?;

            let rows: Vec<StringRow> = diesel::sql_query(query)
                .load(&mut conn)
                .map_err(|e| WorkerError::Invalid(format!("node query failed: {}", e)))?;

            Ok(rows.into_iter().map(|r| r.value).collect())
        })
        .await
        .map_err(|e| WorkerError::Invalid(format!("node query join error: {}", e)))?
    }
}

#[derive(QueryableByName)]
struct StringRow {
    #[diesel(sql_type = Text)]
    value: String,
}

#[derive(QueryableByName)]
struct BoolRow {
    #[diesel(sql_type = diesel::sql_types::Bool)]
    value: bool,
}

#[async_trait]
impl NodeInspector for PgNodeInspector {
    async fn list_databases(&self) -> Result<Vec<String>, WorkerError> {
        self.query_strings("SELECT datname AS value FROM pg_database ORDER BY datname")
            .await
    }

    async fn database_exists(&self, dbname: &str) -> Result<bool, WorkerError> {
        let databases = self.list_databases().await?;
        Ok(databases.iter().any(|d| d == dbname))
    }

    async fn list_roles(&self) -> Result<Vec<String>, WorkerError> {
        self.query_strings("SELECT rolname AS value FROM pg_roles ORDER BY rolname")
            .await
    }

    async fn server_version(&self) -> Result<String, WorkerError> {
        let rows = self
            .query_strings("SELECT current_setting('server_version') AS value")
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| WorkerError::Invalid("node returned no server_version".to_string()))
    }

    async fn is_in_recovery(&self) -> Result<bool, WorkerError> {
        let dsn = self.dsn.clone();

        task::spawn_blocking(move || {
            let mut conn = PgConnection::establish(&dsn)
                .map_err(|e| WorkerError::Invalid(format!("cannot connect to node: {}", e)))?;

            let row: BoolRow = diesel::sql_query("SELECT pg_is_in_recovery() AS value")
                .get_result(&mut conn)
                .map_err(|e| WorkerError::Invalid(format!("node query failed: {}", e)))?;

            Ok(row.value)
        })
        .await
        .map_err(|e| WorkerError::Invalid(format!("node query join error: {}", e)))?
    }

    async fn set_recovery_paused(&self, paused: bool) -> Result<(), WorkerError> {
        let dsn = self.dsn.clone();
        let query = if paused {
            "SELECT pg_wal_replay_pause()"
        } else {
            "SELECT pg_wal_replay_resume()"
        };

        task::spawn_blocking(move || {
            let mut conn = PgConnection::establish(&dsn)
                .map_err(|e| WorkerError::Invalid(format!("cannot connect to node: {}", e)))?;

            diesel::sql_query(query)
                .execute(&mut conn)
                .map_err(|e| WorkerError::Invalid(format!("node query failed: {}", e)))?;

            Ok(())
        })
        .await
        .map_err(|e| WorkerError::Invalid(format!("node query join error: {}", e)))?
    }
}

/// Default factory: connect straight to the node.
pub struct PgNodeInspectorFactory;

impl NodeInspectorFactory for PgNodeInspectorFactory {
    fn for_node(&self, node: &PgsqlNode) -> Box<dyn NodeInspector> {
        Box::new(PgNodeInspector::new(node))
    }
}
