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

//! Upgrade script discovery: ordering and the missing-script refusal.

use std::fs;

use pgbackman::error::MigrationError;
use pgbackman::migrator::collect_upgrade_scripts;
use pgbackman::version::{upgrade_script_name, CATALOG_VERSION};

#[test]
fn catalog_three_to_five_applies_four_then_five() {
    let tmp = tempfile::tempdir().unwrap();
    for n in [4, 5] {
        fs::write(
            tmp.path().join(format!("pgbackman_{}.sql", n)),
            format!("-- upgrade to {}\n", n),
        )
        .unwrap();
    }

    let scripts = collect_upgrade_scripts(tmp.path(), 3, 5).unwrap();

    let versions: Vec<i32> = scripts.iter().map(|(v, _)| *v).collect();
    assert_eq!(versions, vec![4, 5]);
    assert!(scripts[0].1.ends_with("pgbackman_4.sql"));
    assert!(scripts[1].1.ends_with("pgbackman_5.sql"));
}

#[test]
fn any_missing_script_aborts_before_any_is_applied() {
    let tmp = tempfile::tempdir().unwrap();
    // Only pgbackman_5.sql exists; pgbackman_4.sql is the hole.
    fs::write(tmp.path().join("pgbackman_5.sql"), "-- upgrade\n").unwrap();

    let e = collect_upgrade_scripts(tmp.path(), 3, 5).unwrap_err();
    assert!(matches!(
        e,
        MigrationError::MissingScript { ref path } if path.ends_with("pgbackman_4.sql")
    ));
}

#[test]
fn shipped_scripts_cover_a_fresh_bootstrap() {
    // The sql/ directory in the repository must contain every script from
    // version 1 through the compiled-in catalog version.
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("sql");

    let scripts = collect_upgrade_scripts(&dir, 0, CATALOG_VERSION).unwrap();
    assert_eq!(scripts.len(), CATALOG_VERSION as usize);
    assert!(scripts[0].1.ends_with(upgrade_script_name(1)));
}
