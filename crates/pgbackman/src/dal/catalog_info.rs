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

//! Catalog schema version metadata.

use diesel::dsl::max;
use diesel::prelude::*;

use super::DAL;
use crate::database::schema::catalog_info;
use crate::error::CatalogError;

pub struct CatalogInfoDAL<'a> {
    pub dal: &'a DAL,
}

impl<'a> CatalogInfoDAL<'a> {
    /// The highest schema version recorded in the catalog, `None` on an
    /// uninitialized database.
    pub async fn current_version(&self) -> Result<Option<i32>, CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        let version: Option<i32> = conn
            .interact(|conn| {
                catalog_info::table
                    .select(max(catalog_info::database_version))
                    .first(conn)
            })
            .await
            .map_err(CatalogError::from)??;

        Ok(version)
    }

    /// Applies one upgrade script and records its version, in a single
    /// transaction. The script content is opaque to us.
    pub async fn apply_upgrade_script(
        &self,
        version: i32,
        script: String,
    ) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            conn.transaction(|conn| {
                diesel::sql_query(script).execute(conn)?;
                diesel::insert_into(catalog_info::table)
                    .values(catalog_info::database_version.eq(version))
                    .on_conflict(catalog_info::database_version)
                    .do_nothing()
                    .execute(conn)?;
                Ok::<_, diesel::result::Error>(())
            })
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }

    /// Runs VACUUM ANALYZE over the hot catalog tables. Must not run inside
    /// a transaction, so each statement executes on its own.
    pub async fn vacuum(&self) -> Result<(), CatalogError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(|conn| {
            diesel::sql_query("VACUUM ANALYZE backup_catalog").execute(conn)?;
            diesel::sql_query("VACUUM ANALYZE restore_catalog").execute(conn)?;
            diesel::sql_query("VACUUM ANALYZE job_queue").execute(conn)?;
            Ok::<_, diesel::result::Error>(())
        })
        .await
        .map_err(CatalogError::from)??;

        Ok(())
    }
}
