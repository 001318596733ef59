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

//! pgbackman-dump: the executor cron and AT entries invoke.
//!
//! Exit code mirrors the dump utility's; failures end up in the catalog
//! either directly or through the pending-log spool.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use pgbackman::executor::{DumpRunner, DumpTarget};
use pgbackman::{Database, Settings, DAL};

#[derive(Parser)]
#[command(
    name = "pgbackman-dump",
    version,
    about = "Run one backup definition or snapshot dump"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recurring backup definition to execute.
    #[arg(long, conflicts_with = "snapshot_id")]
    def_id: Option<i64>,

    /// One-shot snapshot to execute.
    #[arg(long)]
    snapshot_id: Option<i64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let target = match (cli.def_id, cli.snapshot_id) {
        (Some(def_id), None) => DumpTarget::Definition(def_id),
        (None, Some(snapshot_id)) => DumpTarget::Snapshot(snapshot_id),
        _ => {
            eprintln!("exactly one of --def-id / --snapshot-id is required");
            return ExitCode::from(1);
        }
    };

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };
    pgbackman::init_logging(&settings.logging.log_level, None);

    let result = async {
        let url = settings.database.database_url()?;
        let database = Database::new(&url, settings.database.pool_size)?;
        let runner = DumpRunner::bootstrap(DAL::new(database), settings).await?;
        Ok::<_, anyhow::Error>(runner.run(target).await?)
    }
    .await;

    match result {
        Ok(status) => ExitCode::from(status.clamp(0, 255) as u8),
        Err(e) => {
            error!("dump failed: {}", e);
            ExitCode::from(1)
        }
    }
}
