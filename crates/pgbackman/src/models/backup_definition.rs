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

//! Recurring backup declarations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::{BackupCode, JobStatus};
use crate::scheduling::CronSchedule;

/// A recurring declaration: "back up this database on this server according
/// to this schedule, with this retention".
///
/// (backup_server_id, pgsql_node_id, dbname, backup_code) uniquely
/// identifies a live definition; dbname is empty for CLUSTER definitions.
/// Every mutation of a definition enqueues a CRONTAB job for the owning
/// backup server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDefinition {
    pub def_id: i64,
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub schedule: CronSchedule,
    pub backup_code: BackupCode,
    pub encryption: bool,
    /// Postgres-style interval text, e.g. "7 days". Parsed by the
    /// maintenance loop when evaluating expiry.
    pub retention_period: String,
    pub retention_redundancy: i32,
    pub extra_parameters: String,
    pub job_status: JobStatus,
    pub remarks: String,
    pub registered: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Registration input for one backup definition.
#[derive(Debug, Clone)]
pub struct NewBackupDefinition {
    pub backup_server_id: i32,
    pub pgsql_node_id: i32,
    pub dbname: String,
    pub schedule: CronSchedule,
    pub backup_code: BackupCode,
    pub encryption: bool,
    pub retention_period: String,
    pub retention_redundancy: i32,
    pub extra_parameters: String,
    pub job_status: JobStatus,
    pub remarks: String,
}

/// Field changes applied by `update_backup_definition`. `None` keeps the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct BackupDefinitionChanges {
    pub schedule: Option<CronSchedule>,
    pub backup_code: Option<BackupCode>,
    pub encryption: Option<bool>,
    pub retention_period: Option<String>,
    pub retention_redundancy: Option<i32>,
    pub extra_parameters: Option<String>,
    pub job_status: Option<JobStatus>,
    pub remarks: Option<String>,
}
