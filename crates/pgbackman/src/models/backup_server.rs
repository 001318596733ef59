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

//! Backup server: a host that executes dumps and stores artifacts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Running,
    Stopped,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Running => "RUNNING",
            ServerStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RUNNING" => Ok(ServerStatus::Running),
            "STOPPED" => Ok(ServerStatus::Stopped),
            other => Err(ValidationError::ServerStatus(other.to_string())),
        }
    }
}

/// A registered backup server.
///
/// Unique by (hostname, domain_name). Deletable only while no backup,
/// snapshot or restore definition references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupServer {
    pub server_id: i32,
    pub hostname: String,
    pub domain_name: String,
    pub status: ServerStatus,
    pub remarks: String,
    pub registered: DateTime<Utc>,
}

impl BackupServer {
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.hostname, self.domain_name)
    }
}

/// Registration input for a backup server.
#[derive(Debug, Clone)]
pub struct NewBackupServer {
    pub hostname: String,
    pub domain_name: String,
    pub status: ServerStatus,
    pub remarks: String,
}
