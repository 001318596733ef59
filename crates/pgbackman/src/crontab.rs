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

//! Crontab materialization for a (backup server, PgSQL node) pair.
//!
//! The file is always rebuilt in full from the ACTIVE definitions in def_id
//! order, so processing a CRONTAB job is idempotent and lost-update races
//! cannot leave stale lines behind. The header records a SHA-256 over the
//! definition lines; an install whose body hash matches the installed file
//! is skipped, which keeps a re-delivered job from churning the file.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::error::WorkerError;
use crate::models::BackupDefinition;

const HASH_PREFIX: &str = "# Content-Hash: ";

/// Everything the renderer needs besides the definitions themselves.
#[derive(Debug, Clone)]
pub struct CrontabContext {
    pub server_fqdn: String,
    pub node_fqdn: String,
    /// System user the cron.d entry runs as.
    pub user: String,
    /// Executor invocation, e.g. `/usr/bin/pgbackman-dump --def-id`.
    pub dump_command: String,
}

/// Renders the definition lines, one per ACTIVE definition, each ending in
/// its def_id.
pub fn render_body(ctx: &CrontabContext, definitions: &[BackupDefinition]) -> String {
    let mut body = String::new();

    for def in definitions {
        body.push_str(&format!(
            "{} {} {} {} {} {} {} {}\n",
            def.schedule.minutes,
            def.schedule.hours,
            def.schedule.day_month,
            def.schedule.month,
            def.schedule.weekday,
            ctx.user,
            ctx.dump_command,
            def.def_id,
        ));
    }

    body
}

/// SHA-256 over the definition lines, hex-encoded.
pub fn body_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Renders the complete crontab file: header comment plus body.
pub fn render(
    ctx: &CrontabContext,
    definitions: &[BackupDefinition],
    generated_at: DateTime<Utc>,
) -> String {
    let body = render_body(ctx, definitions);

    format!(
        "# Crontab file for PgSQL node {node} - generated by pgbackman, do not edit\n\
         # Backup server: {server}\n\
         # Generated-At: {ts}\n\
         {hash_prefix}{hash}\n\
         SHELL=/bin/bash\n\
         PATH=/sbin:/bin:/usr/sbin:/usr/bin\n\
         MAILTO=\"\"\n\
         \n\
         {body}",
        node = ctx.node_fqdn,
        server = ctx.server_fqdn,
        ts = generated_at.to_rfc3339(),
        hash_prefix = HASH_PREFIX,
        hash = body_hash(&body),
        body = body,
    )
}

/// Reads the content hash recorded in an installed crontab file.
pub fn installed_hash(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    content
        .lines()
        .find_map(|line| line.strip_prefix(HASH_PREFIX))
        .map(str::to_string)
}

/// Writes a file atomically: temp file alongside the target, fsync, rename.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), WorkerError> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let mut tmp = fs::File::create(&tmp_path).map_err(|e| WorkerError::io(&tmp_path, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| WorkerError::io(&tmp_path, e))?;
    tmp.sync_all().map_err(|e| WorkerError::io(&tmp_path, e))?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| WorkerError::io(path, e))?;

    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Rebuilds and installs the crontab file for a node.
///
/// Returns `false` when the installed file already carries the same body
/// hash and nothing was written.
pub fn install(
    path: &Path,
    ctx: &CrontabContext,
    definitions: &[BackupDefinition],
    generated_at: DateTime<Utc>,
) -> Result<bool, WorkerError> {
    let body = render_body(ctx, definitions);

    if installed_hash(path).as_deref() == Some(body_hash(&body).as_str()) {
        return Ok(false);
    }

    write_atomic(path, &render(ctx, definitions, generated_at))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackupCode, JobStatus};
    use crate::scheduling::CronSchedule;
    use chrono::TimeZone;

    fn ctx() -> CrontabContext {
        CrontabContext {
            server_fqdn: "bkp01.example.org".to_string(),
            node_fqdn: "db01.example.org".to_string(),
            user: "pgbackman".to_string(),
            dump_command: "/usr/bin/pgbackman-dump --def-id".to_string(),
        }
    }

    fn definition(def_id: i64, minutes: &str, hours: &str) -> BackupDefinition {
        BackupDefinition {
            def_id,
            backup_server_id: 1,
            pgsql_node_id: 2,
            dbname: "salesdb".to_string(),
            schedule: CronSchedule::parse(minutes, hours, "*", "*", "*").unwrap(),
            backup_code: BackupCode::Full,
            encryption: false,
            retention_period: "7 days".to_string(),
            retention_redundancy: 2,
            extra_parameters: String::new(),
            job_status: JobStatus::Active,
            remarks: String::new(),
            registered: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn one_line_per_definition_keyed_by_def_id() {
        let defs = vec![definition(11, "30", "02"), definition(12, "45", "03")];
        let body = render_body(&ctx(), &defs);

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("30 02 * * *"));
        assert!(lines[0].ends_with(" 11"));
        assert!(lines[1].starts_with("45 03 * * *"));
        assert!(lines[1].ends_with(" 12"));
    }

    #[test]
    fn body_hash_is_stable_and_content_addressed() {
        let defs = vec![definition(11, "30", "02")];
        let a = body_hash(&render_body(&ctx(), &defs));
        let b = body_hash(&render_body(&ctx(), &defs));
        assert_eq!(a, b);

        let changed = vec![definition(11, "31", "02")];
        assert_ne!(a, body_hash(&render_body(&ctx(), &changed)));
    }

    #[test]
    fn install_writes_then_skips_identical_rebuild() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("db01.crontab");
        let defs = vec![definition(11, "30", "02")];
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert!(install(&path, &ctx(), &defs, t0).unwrap());
        let first = fs::read_to_string(&path).unwrap();

        // Re-delivered CRONTAB job: same state, later timestamp. The file
        // must stay byte-identical.
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        assert!(!install(&path, &ctx(), &defs, t1).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), first);

        // A definition change rewrites it.
        let changed = vec![definition(11, "35", "02")];
        assert!(install(&path, &ctx(), &changed, t1).unwrap());
        assert_ne!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn installed_hash_reads_back_the_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("crontab");
        let defs = vec![definition(11, "30", "02")];
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        install(&path, &ctx(), &defs, t0).unwrap();

        assert_eq!(
            installed_hash(&path),
            Some(body_hash(&render_body(&ctx(), &defs)))
        );
    }

    #[test]
    fn no_tmp_file_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("crontab");
        write_atomic(&path, "x\n").unwrap();

        assert!(path.exists());
        assert!(!tmp.path().join("crontab.tmp").exists());
    }
}
