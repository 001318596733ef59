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

//! Catalog database connection management.
//!
//! A thin wrapper around a `deadpool-diesel` PostgreSQL pool. All DAL
//! queries go through [`Database::get_connection`] and run inside
//! `interact` closures on the pool's blocking executor.

pub mod schema;

use deadpool_diesel::postgres::{Connection, Manager, Pool};
use deadpool_diesel::Runtime;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use tracing::info;

use crate::error::CatalogError;

/// A pool of catalog database connections.
///
/// `Database` is `Clone`; each clone references the same underlying pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database {{ .. }}")
    }
}

impl Database {
    /// Creates a connection pool for the given database URL.
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, CatalogError> {
        let manager = Manager::new(database_url, Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(|e| CatalogError::Pool(e.to_string()))?;

        info!("catalog connection pool initialized");

        Ok(Self { pool })
    }

    /// Gets a pooled connection.
    pub async fn get_connection(&self) -> Result<Connection, CatalogError> {
        self.pool
            .get()
            .await
            .map_err(|e| CatalogError::Pool(e.to_string()))
    }

    /// Round-trips a trivial query, verifying the catalog is reachable.
    pub async fn ping(&self) -> Result<(), CatalogError> {
        let conn = self.get_connection().await?;
        conn.interact(|conn| diesel::sql_query("SELECT 1").execute(conn))
            .await
            .map_err(CatalogError::from)??;
        Ok(())
    }
}

#[derive(QueryableByName)]
struct LockRow {
    #[diesel(sql_type = diesel::sql_types::Bool)]
    acquired: bool,
}

/// Attempts a non-blocking session advisory lock keyed by
/// (backup_server_id, pgsql_node_id).
///
/// The lock serializes crontab regeneration for a node; a worker that fails
/// to acquire it leaves the queue row in place for the next cycle.
pub async fn try_advisory_lock(
    conn: &Connection,
    backup_server_id: i32,
    pgsql_node_id: i32,
) -> Result<bool, CatalogError> {
    let row = conn
        .interact(move |conn| {
            diesel::sql_query("SELECT pg_try_advisory_lock($1, $2) AS acquired")
                .bind::<Integer, _>(backup_server_id)
                .bind::<Integer, _>(pgsql_node_id)
                .get_result::<LockRow>(conn)
        })
        .await
        .map_err(CatalogError::from)??;

    Ok(row.acquired)
}

/// Releases a session advisory lock taken with [`try_advisory_lock`].
pub async fn advisory_unlock(
    conn: &Connection,
    backup_server_id: i32,
    pgsql_node_id: i32,
) -> Result<(), CatalogError> {
    conn.interact(move |conn| {
        diesel::sql_query("SELECT pg_advisory_unlock($1, $2) AS acquired")
            .bind::<Integer, _>(backup_server_id)
            .bind::<Integer, _>(pgsql_node_id)
            .get_result::<LockRow>(conn)
    })
    .await
    .map_err(CatalogError::from)??;

    Ok(())
}
