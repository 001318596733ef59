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

//! PgSQL node: a PostgreSQL instance being protected.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Running,
    Down,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Running => "RUNNING",
            NodeStatus::Down => "DOWN",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RUNNING" => Ok(NodeStatus::Running),
            "DOWN" => Ok(NodeStatus::Down),
            other => Err(ValidationError::NodeStatus(other.to_string())),
        }
    }
}

/// A registered PostgreSQL instance.
///
/// Unique by (hostname, domain_name). Per-node configuration parameters,
/// including the defaults applied to new backup definitions, live in the
/// `pgsql_node_config` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PgsqlNode {
    pub node_id: i32,
    pub hostname: String,
    pub domain_name: String,
    pub pgport: i32,
    pub admin_user: String,
    pub status: NodeStatus,
    pub remarks: String,
    pub registered: DateTime<Utc>,
}

impl PgsqlNode {
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.hostname, self.domain_name)
    }
}

/// Registration input for a PgSQL node.
#[derive(Debug, Clone)]
pub struct NewPgsqlNode {
    pub hostname: String,
    pub domain_name: String,
    pub pgport: i32,
    pub admin_user: String,
    pub status: NodeStatus,
    pub remarks: String,
}
