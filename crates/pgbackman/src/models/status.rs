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

//! Shared status and code enums.
//!
//! All variants serialize to the uppercase words the catalog stores and the
//! CLI accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What a backup definition or snapshot produces.
///
/// CLUSTER dumps every database in the instance with `pg_dumpall`; FULL is
/// schema + data + globals per database; SCHEMA is schema + globals; DATA is
/// data only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupCode {
    Cluster,
    Full,
    Schema,
    Data,
}

impl BackupCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupCode::Cluster => "CLUSTER",
            BackupCode::Full => "FULL",
            BackupCode::Schema => "SCHEMA",
            BackupCode::Data => "DATA",
        }
    }
}

impl fmt::Display for BackupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CLUSTER" => Ok(BackupCode::Cluster),
            "FULL" => Ok(BackupCode::Full),
            "SCHEMA" => Ok(BackupCode::Schema),
            "DATA" => Ok(BackupCode::Data),
            other => Err(ValidationError::BackupCode(other.to_string())),
        }
    }
}

/// Whether a recurring definition is materialized into the crontab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Active,
    Stopped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Active => "ACTIVE",
            JobStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(JobStatus::Active),
            "STOPPED" => Ok(JobStatus::Stopped),
            other => Err(ValidationError::JobStatus(other.to_string())),
        }
    }
}

/// Outcome of one executed dump or restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Succeeded,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SUCCEEDED" => Ok(ExecutionStatus::Succeeded),
            "ERROR" => Ok(ExecutionStatus::Error),
            other => Err(ValidationError::ExecutionStatus(other.to_string())),
        }
    }
}

/// Lifecycle of a one-shot snapshot or restore definition.
///
/// WAITING until the control daemon installs the AT job, DEFINED after a
/// successful install, ERROR on a permanent install failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OneShotStatus {
    Waiting,
    Defined,
    Error,
}

impl OneShotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OneShotStatus::Waiting => "WAITING",
            OneShotStatus::Defined => "DEFINED",
            OneShotStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for OneShotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OneShotStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WAITING" => Ok(OneShotStatus::Waiting),
            "DEFINED" => Ok(OneShotStatus::Defined),
            "ERROR" => Ok(OneShotStatus::Error),
            other => Err(ValidationError::OneShotStatus(other.to_string())),
        }
    }
}

/// Parse the TRUE/FALSE booleans used across the admin surface.
pub fn parse_boolean(s: &str) -> Result<bool, ValidationError> {
    match s.trim().to_uppercase().as_str() {
        "TRUE" | "T" | "YES" | "ON" => Ok(true),
        "FALSE" | "F" | "NO" | "OFF" => Ok(false),
        other => Err(ValidationError::Boolean(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_code_round_trip() {
        for code in ["CLUSTER", "FULL", "SCHEMA", "DATA"] {
            assert_eq!(code.parse::<BackupCode>().unwrap().as_str(), code);
        }
        assert!("INCREMENTAL".parse::<BackupCode>().is_err());
    }

    #[test]
    fn statuses_accept_lowercase_input() {
        assert_eq!("active".parse::<JobStatus>().unwrap(), JobStatus::Active);
        assert_eq!(
            "succeeded".parse::<ExecutionStatus>().unwrap(),
            ExecutionStatus::Succeeded
        );
        assert_eq!(
            "waiting".parse::<OneShotStatus>().unwrap(),
            OneShotStatus::Waiting
        );
    }

    #[test]
    fn boolean_variants() {
        assert!(parse_boolean("TRUE").unwrap());
        assert!(parse_boolean("on").unwrap());
        assert!(!parse_boolean("FALSE").unwrap());
        assert!(parse_boolean("maybe").is_err());
    }
}
