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

//! Artifact path convention:
//! `{root}/{node_fqdn}/{dbname}/{YYYY}/{MM}/{DD}/{owner_id}_{bck_id}.{ext}`
//! with extensions dump, dump.log, globals, globals.log, indexes,
//! indexes.log. Encrypted dumps get a `.gpg` suffix. CLUSTER dumps have no
//! database of their own and use the `cluster` directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};

/// The full artifact file set of one backup execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub dir: PathBuf,
    pub dump: PathBuf,
    pub dump_log: PathBuf,
    pub globals: PathBuf,
    pub globals_log: PathBuf,
    pub indexes: PathBuf,
    pub indexes_log: PathBuf,
}

/// Directory a backup of `dbname` on `node_fqdn` lands in on `when`'s day.
pub fn artifact_dir(
    root: &Path,
    node_fqdn: &str,
    dbname: &str,
    when: DateTime<Utc>,
) -> PathBuf {
    let dbdir = if dbname.is_empty() { "cluster" } else { dbname };
    root.join(node_fqdn)
        .join(dbdir)
        .join(format!("{:04}", when.year()))
        .join(format!("{:02}", when.month()))
        .join(format!("{:02}", when.day()))
}

impl ArtifactSet {
    pub fn new(
        root: &Path,
        node_fqdn: &str,
        dbname: &str,
        when: DateTime<Utc>,
        owner_id: i64,
        bck_id: i64,
        encrypted: bool,
    ) -> Self {
        let dir = artifact_dir(root, node_fqdn, dbname, when);
        let stem = format!("{}_{}", owner_id, bck_id);
        let dump_ext = if encrypted { "dump.gpg" } else { "dump" };

        ArtifactSet {
            dump: dir.join(format!("{}.{}", stem, dump_ext)),
            dump_log: dir.join(format!("{}.dump.log", stem)),
            globals: dir.join(format!("{}.globals", stem)),
            globals_log: dir.join(format!("{}.globals.log", stem)),
            indexes: dir.join(format!("{}.indexes", stem)),
            indexes_log: dir.join(format!("{}.indexes.log", stem)),
            dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn paths_follow_the_convention() {
        let when = Utc.with_ymd_and_hms(2024, 3, 7, 2, 30, 0).unwrap();
        let set = ArtifactSet::new(
            Path::new("/srv/pgbackman"),
            "db01.example.org",
            "salesdb",
            when,
            42,
            99,
            false,
        );

        assert_eq!(
            set.dump,
            PathBuf::from("/srv/pgbackman/db01.example.org/salesdb/2024/03/07/42_99.dump")
        );
        assert_eq!(
            set.dump_log,
            PathBuf::from("/srv/pgbackman/db01.example.org/salesdb/2024/03/07/42_99.dump.log")
        );
        assert_eq!(
            set.globals,
            PathBuf::from("/srv/pgbackman/db01.example.org/salesdb/2024/03/07/42_99.globals")
        );
    }

    #[test]
    fn encryption_appends_gpg() {
        let when = Utc.with_ymd_and_hms(2024, 3, 7, 2, 30, 0).unwrap();
        let set = ArtifactSet::new(
            Path::new("/srv"),
            "db01.example.org",
            "salesdb",
            when,
            42,
            99,
            true,
        );
        assert!(set.dump.to_string_lossy().ends_with("42_99.dump.gpg"));
    }

    #[test]
    fn cluster_dumps_use_the_cluster_directory() {
        let when = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        let dir = artifact_dir(Path::new("/srv"), "db01.example.org", "", when);
        assert_eq!(dir, PathBuf::from("/srv/db01.example.org/cluster/2024/12/31"));
    }
}
