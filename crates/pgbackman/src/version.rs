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

//! Software and catalog schema version constants.

/// Human-readable software release.
pub const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Catalog schema version this build was compiled against.
///
/// The migrator compares this against the highest version recorded in
/// `catalog_info` and applies `pgbackman_{n}.sql` scripts for every `n`
/// in between. Must be bumped together with a new script under `sql/`.
pub const CATALOG_VERSION: i32 = 3;

/// Filename of the upgrade script for a given catalog version.
pub fn upgrade_script_name(version: i32) -> String {
    format!("pgbackman_{}.sql", version)
}
