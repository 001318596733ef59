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

//! Bulk dbname specifiers for backup definition registration.

use crate::error::ValidationError;
use crate::node::EXCLUDED_DATABASES;

/// Expands to every database on the node minus templates, `postgres` and
/// the exception list.
pub const ALL_DATABASES: &str = "#all_databases#";

/// Like [`ALL_DATABASES`], additionally dropping databases already covered
/// by a backup definition.
pub const DATABASES_WITHOUT_DEFINITIONS: &str = "#databases_without_backup_definitions#";

// Spelling that has circulated in older documentation.
const DATABASES_WITHOUT_BACKUPS: &str = "#databases_without_backups#";

/// Expands a dbname specifier into the concrete database list.
///
/// `node_databases` is the node's full database list; `covered` the names
/// already holding a definition on this node. A plain specifier is split on
/// commas. Order follows `node_databases` for the bulk forms.
pub fn expand_dbname_list(
    spec: &str,
    exceptions: &[String],
    node_databases: &[String],
    covered: &[String],
) -> Result<Vec<String>, ValidationError> {
    let spec = spec.trim();

    if spec == DATABASES_WITHOUT_BACKUPS {
        return Err(ValidationError::DbnameSpecifier {
            got: spec.to_string(),
            expected: DATABASES_WITHOUT_DEFINITIONS,
        });
    }

    let is_excluded = |db: &str| {
        EXCLUDED_DATABASES.contains(&db) || exceptions.iter().any(|e| e == db)
    };

    match spec {
        ALL_DATABASES => Ok(node_databases
            .iter()
            .filter(|db| !is_excluded(db))
            .cloned()
            .collect()),
        DATABASES_WITHOUT_DEFINITIONS => Ok(node_databases
            .iter()
            .filter(|db| !is_excluded(db))
            .filter(|db| !covered.contains(db))
            .cloned()
            .collect()),
        plain => Ok(plain
            .split(',')
            .map(|db| db.trim().to_string())
            .filter(|db| !db.is_empty())
            .collect()),
    }
}

/// Whether a dbname input is one of the bulk specifiers.
pub fn is_bulk_specifier(spec: &str) -> bool {
    matches!(spec.trim(), ALL_DATABASES | DATABASES_WITHOUT_DEFINITIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_databases_excludes_templates_and_exceptions() {
        let node = strings(&[
            "template0", "template1", "postgres", "salesdb", "hrdb", "webdb",
        ]);
        let result =
            expand_dbname_list(ALL_DATABASES, &strings(&["hrdb"]), &node, &[]).unwrap();
        assert_eq!(result, strings(&["salesdb", "webdb"]));
    }

    #[test]
    fn without_definitions_also_drops_covered() {
        let node = strings(&["template0", "postgres", "salesdb", "hrdb", "webdb"]);
        let covered = strings(&["salesdb"]);
        let result =
            expand_dbname_list(DATABASES_WITHOUT_DEFINITIONS, &[], &node, &covered).unwrap();
        assert_eq!(result, strings(&["hrdb", "webdb"]));
    }

    #[test]
    fn plain_list_splits_on_commas() {
        let result = expand_dbname_list("salesdb, webdb", &[], &[], &[]).unwrap();
        assert_eq!(result, strings(&["salesdb", "webdb"]));
    }

    #[test]
    fn misspelled_specifier_names_the_supported_one() {
        let e = expand_dbname_list("#databases_without_backups#", &[], &[], &[]).unwrap_err();
        assert!(matches!(
            e,
            ValidationError::DbnameSpecifier {
                expected: DATABASES_WITHOUT_DEFINITIONS,
                ..
            }
        ));
    }

    #[test]
    fn bulk_specifier_detection() {
        assert!(is_bulk_specifier(ALL_DATABASES));
        assert!(is_bulk_specifier(DATABASES_WITHOUT_DEFINITIONS));
        assert!(!is_bulk_specifier("salesdb"));
    }
}
