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

//! The job queue: deferred work addressed to a specific backup server.
//!
//! Queue rows are inserted in the same transaction as the definition
//! mutation that caused them, and deleted by the control daemon once the
//! local effect (crontab rewrite, AT install, artifact unlink) has been
//! applied. Delivery is at-least-once; every action is idempotent.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Rebuild the crontab file for (backup_server, pgsql_node).
    Crontab,
    /// Install an AT job for a snapshot definition.
    AtSnapshot,
    /// Install an AT job for a restore definition.
    AtRestore,
    /// Unlink artifact files and delete or mark the catalog row.
    DeleteArtifact,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Crontab => "CRONTAB",
            JobKind::AtSnapshot => "AT_SNAPSHOT",
            JobKind::AtRestore => "AT_RESTORE",
            JobKind::DeleteArtifact => "DELETE_ARTIFACT",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRONTAB" => Ok(JobKind::Crontab),
            "AT_SNAPSHOT" => Ok(JobKind::AtSnapshot),
            "AT_RESTORE" => Ok(JobKind::AtRestore),
            "DELETE_ARTIFACT" => Ok(JobKind::DeleteArtifact),
            other => Err(ValidationError::JobKind(other.to_string())),
        }
    }
}

/// One queued unit of work for a backup server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobQueueEntry {
    pub job_id: i64,
    pub backup_server_id: i32,
    pub pgsql_node_id: Option<i32>,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub registered: DateTime<Utc>,
}

/// Payload of an AT_SNAPSHOT job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub snapshot_id: i64,
}

/// Payload of an AT_RESTORE job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestorePayload {
    pub restore_id: i64,
}

/// Payload of a DELETE_ARTIFACT job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteArtifactPayload {
    pub bck_id: i64,
    pub files: Vec<String>,
    /// true removes the catalog row (force-deletion); false marks it deleted
    /// (retention expiry).
    pub purge_row: bool,
}

/// Coalesces CRONTAB jobs: a CRONTAB row supersedes every earlier CRONTAB
/// row for the same (backup_server, pgsql_node) pair.
///
/// Returns the jobs to process, in registration order, and the job ids that
/// were superseded and can be deleted without processing.
pub fn coalesce_crontab_jobs(jobs: &[JobQueueEntry]) -> (Vec<&JobQueueEntry>, Vec<i64>) {
    let mut superseded = Vec::new();
    let mut keep: Vec<&JobQueueEntry> = Vec::with_capacity(jobs.len());

    for job in jobs {
        if job.kind == JobKind::Crontab {
            if let Some(pos) = keep
                .iter()
                .position(|j| j.kind == JobKind::Crontab && j.pgsql_node_id == job.pgsql_node_id)
            {
                superseded.push(keep[pos].job_id);
                keep.remove(pos);
            }
        }
        keep.push(job);
    }

    (keep, superseded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(job_id: i64, node: Option<i32>, kind: JobKind) -> JobQueueEntry {
        JobQueueEntry {
            job_id,
            backup_server_id: 1,
            pgsql_node_id: node,
            kind,
            payload: serde_json::json!({}),
            registered: Utc::now(),
        }
    }

    #[test]
    fn crontab_jobs_coalesce_per_node() {
        let jobs = vec![
            job(1, Some(10), JobKind::Crontab),
            job(2, Some(11), JobKind::Crontab),
            job(3, Some(10), JobKind::Crontab),
        ];

        let (keep, superseded) = coalesce_crontab_jobs(&jobs);

        assert_eq!(superseded, vec![1]);
        assert_eq!(
            keep.iter().map(|j| j.job_id).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn other_kinds_are_never_coalesced() {
        let jobs = vec![
            job(1, Some(10), JobKind::AtSnapshot),
            job(2, Some(10), JobKind::AtSnapshot),
            job(3, Some(10), JobKind::DeleteArtifact),
        ];

        let (keep, superseded) = coalesce_crontab_jobs(&jobs);

        assert!(superseded.is_empty());
        assert_eq!(keep.len(), 3);
    }

    #[test]
    fn job_kind_round_trip() {
        for kind in ["CRONTAB", "AT_SNAPSHOT", "AT_RESTORE", "DELETE_ARTIFACT"] {
            assert_eq!(kind.parse::<JobKind>().unwrap().as_str(), kind);
        }
    }
}
