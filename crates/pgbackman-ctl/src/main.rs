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

//! pgbackman-ctl: the non-interactive command surface over the admin API.
//!
//! Exit code is 0 on success and 1 on any error, so the commands compose
//! in scripts.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use pgbackman::admin::{
    AdminApi, RegisterBackupDefinition, RegisterRestoreDefinition, RegisterSnapshotDefinition,
    UpdateBackupDefinition,
};
use pgbackman::migrator::{Migrator, VersionCheck};
use pgbackman::{Database, OutputFormat, ResultSet, Settings, DAL};

#[derive(Parser)]
#[command(
    name = "pgbackman-ctl",
    version,
    about = "PostgreSQL backup manager control CLI"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: table, csv or json.
    #[arg(long, global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[command(rename_all = "snake_case")]
enum Commands {
    /// Register a backup server.
    RegisterBackupServer {
        hostname: String,
        domain: String,
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Update a backup server's status or remarks.
    UpdateBackupServer {
        server: String,
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Delete a backup server with no remaining definitions.
    DeleteBackupServer { server: String },
    ShowBackupServers,

    /// Register a PgSQL node.
    RegisterPgsqlNode {
        hostname: String,
        domain: String,
        #[arg(long, default_value = "")]
        pgport: String,
        #[arg(long, default_value = "")]
        admin_user: String,
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Update a PgSQL node.
    UpdatePgsqlNode {
        node: String,
        #[arg(long, default_value = "")]
        pgport: String,
        #[arg(long, default_value = "")]
        admin_user: String,
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Delete a PgSQL node with no remaining definitions.
    DeletePgsqlNode { node: String },
    ShowPgsqlNodes,

    /// Register backup definitions; dbname accepts `#all_databases#` and
    /// `#databases_without_backup_definitions#`.
    RegisterBackupDefinition {
        server: String,
        node: String,
        dbname: String,
        #[arg(long, default_value = "")]
        dbname_exceptions: String,
        #[arg(long, default_value = "")]
        minutes_cron: String,
        #[arg(long, default_value = "")]
        hours_cron: String,
        #[arg(long, default_value = "")]
        day_month_cron: String,
        #[arg(long, default_value = "")]
        month_cron: String,
        #[arg(long, default_value = "")]
        weekday_cron: String,
        #[arg(long, default_value = "")]
        backup_code: String,
        #[arg(long, default_value = "")]
        encryption: String,
        #[arg(long, default_value = "")]
        retention_period: String,
        #[arg(long, default_value = "")]
        retention_redundancy: String,
        #[arg(long, default_value = "")]
        extra_parameters: String,
        #[arg(long, default_value = "")]
        job_status: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Update fields of a backup definition.
    UpdateBackupDefinition {
        def_id: i64,
        #[arg(long, default_value = "")]
        minutes_cron: String,
        #[arg(long, default_value = "")]
        hours_cron: String,
        #[arg(long, default_value = "")]
        day_month_cron: String,
        #[arg(long, default_value = "")]
        month_cron: String,
        #[arg(long, default_value = "")]
        weekday_cron: String,
        #[arg(long, default_value = "")]
        backup_code: String,
        #[arg(long, default_value = "")]
        encryption: String,
        #[arg(long, default_value = "")]
        retention_period: String,
        #[arg(long, default_value = "")]
        retention_redundancy: String,
        #[arg(long, default_value = "")]
        extra_parameters: String,
        #[arg(long, default_value = "")]
        job_status: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Delete a backup definition by id.
    DeleteBackupDefinitionId {
        def_id: i64,
        #[arg(long)]
        force_deletion: bool,
    },
    /// Delete the definitions of a database on a (server, node) pair.
    DeleteBackupDefinitionDbname {
        server: String,
        node: String,
        dbname: String,
        #[arg(long)]
        force_deletion: bool,
    },
    ShowBackupDefinitions {
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        node: Option<String>,
        #[arg(long)]
        dbname: Option<String>,
    },
    /// Reassign definitions between backup servers.
    MoveBackupDefinition {
        from_server: String,
        to_server: String,
        #[arg(long)]
        node: Option<String>,
        #[arg(long)]
        dbname: Option<String>,
        #[arg(long)]
        def_id: Option<i64>,
    },
    ShowEmptyBackupCatalogs,
    ShowDatabasesWithoutBackupDefinitions { node: String },

    /// Register a one-shot snapshot.
    RegisterSnapshotDefinition {
        server: String,
        node: String,
        dbname: String,
        at_time: String,
        #[arg(long, default_value = "")]
        backup_code: String,
        #[arg(long, default_value = "")]
        encryption: String,
        #[arg(long, default_value = "")]
        retention_period: String,
        #[arg(long, default_value = "")]
        extra_parameters: String,
        #[arg(long, default_value = "")]
        tag: String,
        #[arg(long, default_value = "")]
        pg_dump_release: String,
    },
    ShowSnapshotDefinitions,
    ShowSnapshotsInProgress,

    /// Register a one-shot restore of a cataloged backup.
    RegisterRestoreDefinition {
        bck_id: i64,
        server: String,
        target_node: String,
        at_time: String,
        #[arg(long, default_value = "")]
        target_dbname: String,
        #[arg(long, default_value = "")]
        renamed_dbname: String,
        #[arg(long, default_value = "")]
        extra_parameters: String,
        /// Comma-separated roles to recreate on the target.
        #[arg(long, default_value = "")]
        roles_to_restore: String,
    },
    ShowRestoreDefinitions,
    ShowRestoresInProgress,

    ShowBackupCatalog {
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        node: Option<String>,
        #[arg(long)]
        dbname: Option<String>,
    },
    ShowRestoreCatalog {
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        node: Option<String>,
    },
    ShowBackupDetails { bck_id: i64 },
    ShowRestoreDetails { rst_id: i64 },

    ShowBackupServerConfig { server: String },
    UpdateBackupServerConfig {
        server: String,
        parameter: String,
        value: String,
    },
    ShowPgsqlNodeConfig { node: String },
    UpdatePgsqlNodeConfig {
        node: String,
        parameter: String,
        value: String,
    },
    ShowPgbackmanConfig,
    ShowPgbackmanStats,
    ShowBackupServerStats { server: String },
    ShowPgsqlNodeStats { node: String },
    ShowJobsQueue,

    RegisterBackupServerPgBinDir {
        server: String,
        pg_version: String,
        bin_dir: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    UpdateBackupServerPgBinDir {
        server: String,
        pg_version: String,
        bin_dir: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    DeleteBackupServerPgBinDir { server: String, pg_version: String },
    RegisterBackupServerDefaultPgBinDir {
        pg_version: String,
        bin_dir: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    UpdateBackupServerDefaultPgBinDir {
        pg_version: String,
        bin_dir: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    DeleteBackupServerDefaultPgBinDir { pg_version: String },
    ShowBackupServerDefaultConfiguredVersions,

    /// Apply pending catalog schema upgrades.
    UpgradeCatalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    pgbackman::init_logging(&settings.logging.log_level, None);

    let format: OutputFormat = cli
        .output
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let database = Database::new(
        &settings.database.database_url().context("database settings")?,
        settings.database.pool_size,
    )
    .context("initializing catalog pool")?;
    let dal = DAL::new(database);

    let migrator = Migrator::new(dal.clone(), settings.agent.database_source_dir.clone());

    if matches!(cli.command, Commands::UpgradeCatalog) {
        let version = migrator
            .upgrade(None, None)
            .await
            .context("catalog upgrade")?;
        println!("[OK] catalog is at version {}", version);
        return Ok(());
    }

    match migrator.check().await.context("catalog version check")? {
        VersionCheck::UpToDate { .. } => {}
        VersionCheck::UpgradePending { database, software } => bail!(
            "catalog schema is at version {} but this software requires {}; \
             run 'pgbackman-ctl upgrade_catalog'",
            database,
            software
        ),
        VersionCheck::SoftwareTooOld { database, software } => bail!(
            "catalog schema version {} is newer than this software ({}), refusing to run",
            database,
            software
        ),
        VersionCheck::Uninitialized => bail!(
            "catalog has no schema; run 'pgbackman-ctl upgrade_catalog' to initialize it"
        ),
    }

    let api = AdminApi::new(dal);
    run_command(&api, &settings, cli.command, format).await
}

fn print(rs: ResultSet, format: OutputFormat) {
    println!("{}", rs.render(format));
}

fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

async fn run_command(
    api: &AdminApi,
    settings: &Settings,
    command: Commands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        Commands::RegisterBackupServer {
            hostname,
            domain,
            status,
            remarks,
        } => {
            let server = api
                .register_backup_server(&hostname, &domain, &status, &remarks)
                .await?;
            println!("[OK] backup server {} registered with SrvID {}", server.fqdn(), server.server_id);
        }
        Commands::UpdateBackupServer {
            server,
            status,
            remarks,
        } => {
            let server = api
                .update_backup_server(&server, &status, remarks.as_deref())
                .await?;
            println!("[OK] backup server {} updated", server.fqdn());
        }
        Commands::DeleteBackupServer { server } => {
            api.delete_backup_server(&server).await?;
            println!("[OK] backup server deleted");
        }
        Commands::ShowBackupServers => print(api.show_backup_servers().await?, format),

        Commands::RegisterPgsqlNode {
            hostname,
            domain,
            pgport,
            admin_user,
            status,
            remarks,
        } => {
            let node = api
                .register_pgsql_node(&hostname, &domain, &pgport, &admin_user, &status, &remarks)
                .await?;
            println!("[OK] PgSQL node {} registered with NodeID {}", node.fqdn(), node.node_id);
        }
        Commands::UpdatePgsqlNode {
            node,
            pgport,
            admin_user,
            status,
            remarks,
        } => {
            let node = api
                .update_pgsql_node(&node, &pgport, &admin_user, &status, remarks.as_deref())
                .await?;
            println!("[OK] PgSQL node {} updated", node.fqdn());
        }
        Commands::DeletePgsqlNode { node } => {
            api.delete_pgsql_node(&node).await?;
            println!("[OK] PgSQL node deleted");
        }
        Commands::ShowPgsqlNodes => print(api.show_pgsql_nodes().await?, format),

        Commands::RegisterBackupDefinition {
            server,
            node,
            dbname,
            dbname_exceptions,
            minutes_cron,
            hours_cron,
            day_month_cron,
            month_cron,
            weekday_cron,
            backup_code,
            encryption,
            retention_period,
            retention_redundancy,
            extra_parameters,
            job_status,
            remarks,
        } => {
            let registered = api
                .register_backup_definition(RegisterBackupDefinition {
                    backup_server: server,
                    pgsql_node: node,
                    dbname,
                    dbname_exceptions: comma_list(&dbname_exceptions),
                    minutes_cron,
                    hours_cron,
                    day_month_cron,
                    month_cron,
                    weekday_cron,
                    backup_code,
                    encryption,
                    retention_period,
                    retention_redundancy,
                    extra_parameters,
                    job_status,
                    remarks,
                })
                .await?;
            for def in registered {
                println!(
                    "[OK] backup definition {} registered for database '{}'",
                    def.def_id, def.dbname
                );
            }
        }
        Commands::UpdateBackupDefinition {
            def_id,
            minutes_cron,
            hours_cron,
            day_month_cron,
            month_cron,
            weekday_cron,
            backup_code,
            encryption,
            retention_period,
            retention_redundancy,
            extra_parameters,
            job_status,
            remarks,
        } => {
            let def = api
                .update_backup_definition(
                    def_id,
                    UpdateBackupDefinition {
                        minutes_cron,
                        hours_cron,
                        day_month_cron,
                        month_cron,
                        weekday_cron,
                        backup_code,
                        encryption,
                        retention_period,
                        retention_redundancy,
                        extra_parameters,
                        job_status,
                        remarks,
                    },
                )
                .await?;
            println!("[OK] backup definition {} updated", def.def_id);
        }
        Commands::DeleteBackupDefinitionId {
            def_id,
            force_deletion,
        } => {
            api.delete_backup_definition_id(def_id, force_deletion).await?;
            println!("[OK] backup definition {} deleted", def_id);
        }
        Commands::DeleteBackupDefinitionDbname {
            server,
            node,
            dbname,
            force_deletion,
        } => {
            api.delete_backup_definition_dbname(&server, &node, &dbname, force_deletion)
                .await?;
            println!("[OK] backup definitions for '{}' deleted", dbname);
        }
        Commands::ShowBackupDefinitions {
            server,
            node,
            dbname,
        } => print(
            api.show_backup_definitions(server.as_deref(), node.as_deref(), dbname.as_deref())
                .await?,
            format,
        ),
        Commands::MoveBackupDefinition {
            from_server,
            to_server,
            node,
            dbname,
            def_id,
        } => {
            let moved = api
                .move_backup_definition(
                    &from_server,
                    &to_server,
                    node.as_deref(),
                    dbname.as_deref(),
                    def_id,
                )
                .await?;
            println!("[OK] {} backup definition(s) moved", moved.len());
        }
        Commands::ShowEmptyBackupCatalogs => {
            print(api.show_empty_backup_catalogs().await?, format)
        }
        Commands::ShowDatabasesWithoutBackupDefinitions { node } => print(
            api.show_databases_without_backup_definitions(&node).await?,
            format,
        ),

        Commands::RegisterSnapshotDefinition {
            server,
            node,
            dbname,
            at_time,
            backup_code,
            encryption,
            retention_period,
            extra_parameters,
            tag,
            pg_dump_release,
        } => {
            let snapshot = api
                .register_snapshot_definition(RegisterSnapshotDefinition {
                    backup_server: server,
                    pgsql_node: node,
                    dbname,
                    at_time,
                    backup_code,
                    encryption,
                    retention_period,
                    extra_parameters,
                    tag,
                    pg_dump_release,
                })
                .await?;
            println!("[OK] snapshot definition {} registered", snapshot.snapshot_id);
        }
        Commands::ShowSnapshotDefinitions => {
            print(api.show_snapshot_definitions().await?, format)
        }
        Commands::ShowSnapshotsInProgress => {
            print(api.show_snapshots_in_progress().await?, format)
        }

        Commands::RegisterRestoreDefinition {
            bck_id,
            server,
            target_node,
            at_time,
            target_dbname,
            renamed_dbname,
            extra_parameters,
            roles_to_restore,
        } => {
            let restore = api
                .register_restore_definition(RegisterRestoreDefinition {
                    at_time,
                    bck_id,
                    backup_server: server,
                    target_pgsql_node: target_node,
                    target_dbname,
                    renamed_dbname,
                    extra_parameters,
                    roles_to_restore: comma_list(&roles_to_restore),
                })
                .await?;
            println!("[OK] restore definition {} registered", restore.restore_id);
        }
        Commands::ShowRestoreDefinitions => {
            print(api.show_restore_definitions().await?, format)
        }
        Commands::ShowRestoresInProgress => {
            print(api.show_restores_in_progress().await?, format)
        }

        Commands::ShowBackupCatalog {
            server,
            node,
            dbname,
        } => print(
            api.show_backup_catalog(server.as_deref(), node.as_deref(), dbname.as_deref())
                .await?,
            format,
        ),
        Commands::ShowRestoreCatalog { server, node } => print(
            api.show_restore_catalog(server.as_deref(), node.as_deref())
                .await?,
            format,
        ),
        Commands::ShowBackupDetails { bck_id } => {
            print(api.show_backup_details(bck_id).await?, format)
        }
        Commands::ShowRestoreDetails { rst_id } => {
            print(api.show_restore_details(rst_id).await?, format)
        }

        Commands::ShowBackupServerConfig { server } => {
            print(api.show_backup_server_config(&server).await?, format)
        }
        Commands::UpdateBackupServerConfig {
            server,
            parameter,
            value,
        } => {
            api.update_backup_server_config(&server, &parameter, &value)
                .await?;
            println!("[OK] parameter '{}' updated", parameter);
        }
        Commands::ShowPgsqlNodeConfig { node } => {
            print(api.show_pgsql_node_config(&node).await?, format)
        }
        Commands::UpdatePgsqlNodeConfig {
            node,
            parameter,
            value,
        } => {
            api.update_pgsql_node_config(&node, &parameter, &value).await?;
            println!("[OK] parameter '{}' updated", parameter);
        }
        Commands::ShowPgbackmanConfig => {
            print(api.show_pgbackman_config(settings).await?, format)
        }
        Commands::ShowPgbackmanStats => print(api.show_pgbackman_stats().await?, format),
        Commands::ShowBackupServerStats { server } => {
            print(api.show_backup_server_stats(&server).await?, format)
        }
        Commands::ShowPgsqlNodeStats { node } => {
            print(api.show_pgsql_node_stats(&node).await?, format)
        }
        Commands::ShowJobsQueue => print(api.show_jobs_queue().await?, format),

        Commands::RegisterBackupServerPgBinDir {
            server,
            pg_version,
            bin_dir,
            description,
        } => {
            api.register_backup_server_pg_bin_dir(&server, &pg_version, &bin_dir, &description)
                .await?;
            println!("[OK] pg bin dir registered");
        }
        Commands::UpdateBackupServerPgBinDir {
            server,
            pg_version,
            bin_dir,
            description,
        } => {
            api.update_backup_server_pg_bin_dir(&server, &pg_version, &bin_dir, &description)
                .await?;
            println!("[OK] pg bin dir updated");
        }
        Commands::DeleteBackupServerPgBinDir { server, pg_version } => {
            api.delete_backup_server_pg_bin_dir(&server, &pg_version).await?;
            println!("[OK] pg bin dir deleted");
        }
        Commands::RegisterBackupServerDefaultPgBinDir {
            pg_version,
            bin_dir,
            description,
        } => {
            api.register_backup_server_default_pg_bin_dir(&pg_version, &bin_dir, &description)
                .await?;
            println!("[OK] default pg bin dir registered");
        }
        Commands::UpdateBackupServerDefaultPgBinDir {
            pg_version,
            bin_dir,
            description,
        } => {
            api.update_backup_server_default_pg_bin_dir(&pg_version, &bin_dir, &description)
                .await?;
            println!("[OK] default pg bin dir updated");
        }
        Commands::DeleteBackupServerDefaultPgBinDir { pg_version } => {
            api.delete_backup_server_default_pg_bin_dir(&pg_version).await?;
            println!("[OK] default pg bin dir deleted");
        }
        Commands::ShowBackupServerDefaultConfiguredVersions => {
            print(api.show_backup_server_default_configured_versions().await?, format)
        }

        Commands::UpgradeCatalog => unreachable!("handled before the version gate"),
    }

    Ok(())
}
