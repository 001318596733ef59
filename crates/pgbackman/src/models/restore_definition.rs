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

//! One-shot restore declarations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::OneShotStatus;

/// A one-shot restore of a cataloged backup onto a target node.
///
/// `renamed_dbname`, when set, must not exist on the target at registration
/// time; `roles_to_restore` omits roles already present on the target (the
/// operator confirms reuse when registering).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreDefinition {
    pub restore_id: i64,
    pub at_time: DateTime<Utc>,
    pub bck_id: i64,
    pub backup_server_id: i32,
    pub target_pgsql_node_id: i32,
    pub target_dbname: String,
    pub renamed_dbname: Option<String>,
    pub extra_parameters: String,
    pub roles_to_restore: Vec<String>,
    pub status: OneShotStatus,
    pub error_message: Option<String>,
    pub registered: DateTime<Utc>,
}

/// Registration input for a restore definition.
#[derive(Debug, Clone)]
pub struct NewRestoreDefinition {
    pub at_time: DateTime<Utc>,
    pub bck_id: i64,
    pub backup_server_id: i32,
    pub target_pgsql_node_id: i32,
    pub target_dbname: String,
    pub renamed_dbname: Option<String>,
    pub extra_parameters: String,
    pub roles_to_restore: Vec<String>,
}
