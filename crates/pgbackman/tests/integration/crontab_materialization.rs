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

//! Crontab materialization flows: register-and-schedule, duplicate
//! CRONTAB delivery, and definition mutation.

use chrono::{TimeZone, Utc};

use pgbackman::crontab::{self, CrontabContext};
use pgbackman::models::job_queue::coalesce_crontab_jobs;
use pgbackman::models::{BackupCode, BackupDefinition, JobKind, JobQueueEntry, JobStatus};
use pgbackman::scheduling::CronSchedule;

fn ctx() -> CrontabContext {
    CrontabContext {
        server_fqdn: "bkp01.example.org".to_string(),
        node_fqdn: "db01.example.org".to_string(),
        user: "pgbackman".to_string(),
        dump_command: "/usr/bin/pgbackman-dump --def-id".to_string(),
    }
}

fn definition(def_id: i64, dbname: &str, minutes: &str, hours: &str) -> BackupDefinition {
    BackupDefinition {
        def_id,
        backup_server_id: 1,
        pgsql_node_id: 1,
        dbname: dbname.to_string(),
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
fn register_and_schedule_produces_one_line_per_definition() {
    // The register-and-schedule flow: a single FULL definition of salesdb
    // at 30 02 * * * materializes as exactly one crontab line ending in
    // the new def_id.
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pgsql_node_1");
    let defs = vec![definition(7, "salesdb", "30", "02")];

    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert!(crontab::install(&path, &ctx(), &defs, now).unwrap());

    let content = std::fs::read_to_string(&path).unwrap();
    let job_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.starts_with('#') && !l.contains('=') && !l.trim().is_empty())
        .collect();

    assert_eq!(job_lines.len(), 1);
    assert!(job_lines[0].starts_with("30 02 * * *"));
    assert!(job_lines[0].ends_with(" 7"));
}

#[test]
fn duplicate_crontab_job_is_idempotent() {
    // At-least-once delivery: processing the same CRONTAB job twice must
    // leave the file byte-identical with no spurious entries.
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pgsql_node_1");
    let defs = vec![
        definition(7, "salesdb", "30", "02"),
        definition(8, "webdb", "45", "03"),
    ];

    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap();

    assert!(crontab::install(&path, &ctx(), &defs, t0).unwrap());
    let first = std::fs::read_to_string(&path).unwrap();

    assert!(!crontab::install(&path, &ctx(), &defs, t1).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);

    let job_lines = first
        .lines()
        .filter(|l| !l.starts_with('#') && !l.contains('=') && !l.trim().is_empty())
        .count();
    assert_eq!(job_lines, 2);
}

#[test]
fn definition_mutation_regenerates_byte_identically_to_fresh_build() {
    // A rebuild after mutation must match a from-scratch render of the new
    // state, modulo nothing: same context, same definitions, same bytes.
    let tmp = tempfile::tempdir().unwrap();
    let mutated = tmp.path().join("mutated");
    let fresh = tmp.path().join("fresh");

    let before = vec![definition(7, "salesdb", "30", "02")];
    let after = vec![definition(7, "salesdb", "35", "02")];
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    crontab::install(&mutated, &ctx(), &before, now).unwrap();
    crontab::install(&mutated, &ctx(), &after, now).unwrap();
    crontab::install(&fresh, &ctx(), &after, now).unwrap();

    assert_eq!(
        std::fs::read_to_string(&mutated).unwrap(),
        std::fs::read_to_string(&fresh).unwrap()
    );
}

#[test]
fn queued_crontab_jobs_coalesce_to_one_rebuild() {
    // Three mutations for the same node queue three CRONTAB jobs; the
    // daemon rebuilds once and drops the two superseded rows.
    let job = |job_id: i64| JobQueueEntry {
        job_id,
        backup_server_id: 1,
        pgsql_node_id: Some(1),
        kind: JobKind::Crontab,
        payload: serde_json::json!({}),
        registered: Utc::now(),
    };

    let jobs = vec![job(1), job(2), job(3)];
    let (keep, superseded) = coalesce_crontab_jobs(&jobs);

    assert_eq!(keep.iter().map(|j| j.job_id).collect::<Vec<_>>(), vec![3]);
    assert_eq!(superseded, vec![1, 2]);
}
