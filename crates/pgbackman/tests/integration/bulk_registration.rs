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

//! Bulk dbname expansion plus randomized scheduling, as the admin API
//! composes them during `register_backup_definition`.

use rand::rngs::StdRng;
use rand::SeedableRng;

use pgbackman::admin::bulk::{
    expand_dbname_list, ALL_DATABASES, DATABASES_WITHOUT_DEFINITIONS,
};
use pgbackman::scheduling::{random_in_interval, CronSchedule};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn all_databases_with_exceptions_matches_operator_expectation() {
    // Node reports {template0, template1, postgres, salesdb, hrdb, webdb},
    // exception list carries hrdb: two definitions get created.
    let node = strings(&[
        "template0", "template1", "postgres", "salesdb", "hrdb", "webdb",
    ]);

    let result = expand_dbname_list(ALL_DATABASES, &strings(&["hrdb"]), &node, &[]).unwrap();
    assert_eq!(result, strings(&["salesdb", "webdb"]));
}

#[test]
fn each_bulk_definition_draws_its_own_schedule() {
    // Every expanded database gets a minute and hour drawn from the node's
    // configured intervals; the draws are independent and always validate
    // as cron fields.
    let node = strings(&["template0", "postgres", "salesdb", "hrdb", "webdb"]);
    let databases = expand_dbname_list(ALL_DATABASES, &[], &node, &[]).unwrap();
    assert_eq!(databases.len(), 3);

    let mut rng = StdRng::seed_from_u64(99);
    for _ in &databases {
        let minute = random_in_interval("01-59", 59, &mut rng).unwrap();
        let hour = random_in_interval("01-06", 23, &mut rng).unwrap();

        assert!((1..=59).contains(&minute));
        assert!((1..=6).contains(&hour));

        let schedule = CronSchedule::parse(
            &minute.to_string(),
            &hour.to_string(),
            "*",
            "*",
            "*",
        )
        .unwrap();
        assert_eq!(
            schedule.expression(),
            format!("{} {} * * *", minute, hour)
        );
    }
}

#[test]
fn without_definitions_skips_covered_databases() {
    let node = strings(&["template0", "postgres", "salesdb", "hrdb", "webdb"]);
    let covered = strings(&["salesdb", "hrdb"]);

    let result =
        expand_dbname_list(DATABASES_WITHOUT_DEFINITIONS, &[], &node, &covered).unwrap();
    assert_eq!(result, strings(&["webdb"]));
}
