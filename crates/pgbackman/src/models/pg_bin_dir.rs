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

//! PostgreSQL binary directory registrations.
//!
//! The executor resolves which `pg_dump` / `pg_restore` to run by consulting
//! the per-server map first and the system-wide defaults second.

use serde::{Deserialize, Serialize};

/// A per-backup-server binary directory for one PostgreSQL major version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgBinDir {
    pub backup_server_id: i32,
    pub pg_version: String,
    pub bin_dir: String,
    pub description: String,
}

/// A system-wide default binary directory for one PostgreSQL major version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultPgBinDir {
    pub pg_version: String,
    pub bin_dir: String,
    pub description: String,
}
