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

//! pgbackman-restore: the executor AT restore entries invoke.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use pgbackman::executor::RestoreRunner;
use pgbackman::{Database, Settings, DAL};

#[derive(Parser)]
#[command(
    name = "pgbackman-restore",
    version,
    about = "Run one restore definition"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restore definition to execute.
    #[arg(long)]
    restore_id: i64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

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
        let runner = RestoreRunner::bootstrap(DAL::new(database), settings).await?;
        Ok::<_, anyhow::Error>(runner.run(cli.restore_id).await?)
    }
    .await;

    match result {
        Ok(status) => ExitCode::from(status.clamp(0, 255) as u8),
        Err(e) => {
            error!("restore failed: {}", e);
            ExitCode::from(1)
        }
    }
}
