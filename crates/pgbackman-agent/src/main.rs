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

//! pgbackman-agent: the per-backup-server daemon.
//!
//! Runs the control daemon (job queue consumer), the maintenance loop and,
//! when enabled, the alerts loop. SIGINT/SIGTERM finish the in-flight work
//! and exit cleanly. Refuses to start on a catalog schema mismatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use pgbackman::alerts::AlertsLoop;
use pgbackman::daemon::at::SystemAt;
use pgbackman::daemon::ControlDaemon;
use pgbackman::maintenance::MaintenanceLoop;
use pgbackman::migrator::Migrator;
use pgbackman::{Database, Settings, DAL};

#[derive(Parser)]
#[command(
    name = "pgbackman-agent",
    version,
    about = "PgBackMan control daemon for one backup server"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    let log_file = if settings.logging.log_file.is_empty() {
        None
    } else {
        Some(PathBuf::from(&settings.logging.log_file))
    };
    pgbackman::init_logging(&settings.logging.log_level, log_file.as_deref());

    let database = Database::new(
        &settings.database.database_url().context("database settings")?,
        settings.database.pool_size,
    )
    .context("initializing catalog pool")?;
    let dal = DAL::new(database);

    // Daemons never run against a mismatched schema.
    Migrator::new(dal.clone(), settings.agent.database_source_dir.clone())
        .ensure_current()
        .await
        .context("catalog version check")?;

    let daemon = Arc::new(
        ControlDaemon::bootstrap(dal.clone(), settings.clone(), Arc::new(SystemAt))
            .await
            .context("control daemon bootstrap")?,
    );
    let maintenance = Arc::new(MaintenanceLoop::new(
        dal.clone(),
        settings.clone(),
        daemon.server().clone(),
    ));

    let daemon_shutdown = daemon.shutdown_sender();
    let maintenance_shutdown = maintenance.shutdown_sender();

    let mut handles = Vec::new();

    {
        let daemon = Arc::clone(&daemon);
        handles.push(tokio::spawn(async move {
            if let Err(e) = daemon.run().await {
                error!("control daemon failed: {}", e);
            }
        }));
    }

    {
        let maintenance = Arc::clone(&maintenance);
        handles.push(tokio::spawn(async move {
            if let Err(e) = maintenance.run().await {
                error!("maintenance loop failed: {}", e);
            }
        }));
    }

    let alerts_shutdown = if settings.alerts.smtp_alerts {
        let alerts = Arc::new(AlertsLoop::new(dal.clone(), settings.alerts.clone()));
        let shutdown = alerts.shutdown_sender();
        handles.push(tokio::spawn(async move {
            if let Err(e) = alerts.run().await {
                error!("alerts loop failed: {}", e);
            }
        }));
        Some(shutdown)
    } else {
        None
    };

    wait_for_signal().await;
    info!("shutdown signal received, finishing in-flight work");

    let _ = daemon_shutdown.send(());
    let _ = maintenance_shutdown.send(());
    if let Some(shutdown) = alerts_shutdown {
        let _ = shutdown.send(());
    }

    for handle in handles {
        let _ = handle.await;
    }

    info!("pgbackman-agent stopped");
    Ok(())
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!("cannot install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}
