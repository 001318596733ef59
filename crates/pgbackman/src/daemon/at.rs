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

//! The local AT queue, as the control daemon sees it.
//!
//! Installation probes `atq` before `at`, so a re-delivered AT_SNAPSHOT /
//! AT_RESTORE job never schedules the work twice. The probe scans each
//! pending job's script (`at -c`) for the executor invocation, which embeds
//! the snapshot / restore id and is unique per one-shot.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::WorkerError;

#[async_trait]
pub trait AtScheduler: Send + Sync {
    /// Whether a pending AT job already carries this command.
    async fn installed(&self, command: &str) -> Result<bool, WorkerError>;

    /// Schedules a command at the given time.
    async fn install(&self, when: DateTime<Utc>, command: &str) -> Result<(), WorkerError>;
}

/// The system `at` / `atq` binaries.
pub struct SystemAt;

impl SystemAt {
    async fn pending_job_ids(&self) -> Result<Vec<String>, WorkerError> {
        let output = Command::new("atq")
            .output()
            .await
            .map_err(|e| WorkerError::Spawn {
                command: "atq".to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(WorkerError::Process {
                command: "atq".to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        // atq lines start with the job id followed by a tab.
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl AtScheduler for SystemAt {
    async fn installed(&self, command: &str) -> Result<bool, WorkerError> {
        for job_id in self.pending_job_ids().await? {
            let output = Command::new("at")
                .arg("-c")
                .arg(&job_id)
                .output()
                .await
                .map_err(|e| WorkerError::Spawn {
                    command: format!("at -c {}", job_id),
                    source: e,
                })?;

            if output.status.success()
                && String::from_utf8_lossy(&output.stdout).contains(command)
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn install(&self, when: DateTime<Utc>, command: &str) -> Result<(), WorkerError> {
        // at(1) takes local time: [[CC]YY]MMDDhhmm[.ss]
        let timestamp = when.with_timezone(&Local).format("%Y%m%d%H%M.%S");

        let mut child = Command::new("at")
            .arg("-t")
            .arg(timestamp.to_string())
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| WorkerError::Spawn {
                command: "at".to_string(),
                source: e,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(command.as_bytes())
                .await
                .map_err(|e| WorkerError::Spawn {
                    command: "at".to_string(),
                    source: e,
                })?;
            stdin.write_all(b"\n").await.map_err(|e| WorkerError::Spawn {
                command: "at".to_string(),
                source: e,
            })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| WorkerError::Spawn {
                command: "at".to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(WorkerError::Process {
                command: format!("at -t {}", timestamp),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }
}
