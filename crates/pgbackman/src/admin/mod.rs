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

//! The admin API: every operation the CLI exposes.
//!
//! Operations are transaction-scoped and return typed records or
//! [`ResultSet`]s; the CLI is input collection plus rendering. All
//! defaulting of empty inputs to stored node/server defaults happens here.

pub mod bulk;
pub mod show;
pub mod validation;

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::dal::{DefinitionDeletion, TopologyDeletion, DAL};
use crate::error::{AdminError, CatalogError, ValidationError};
use crate::models::*;
use crate::models::backup_definition::BackupDefinitionChanges;
use crate::node::{NodeInspectorFactory, PgNodeInspectorFactory};
use crate::output::ResultSet;
use crate::scheduling::{random_in_interval, CronSchedule};
use crate::version::{CATALOG_VERSION, SOFTWARE_VERSION};
use validation::or_default;

/// Node parameters seeded at registration; definition registration falls
/// back to these when the stored parameter is missing.
const NODE_DEFAULTS: &[(&str, &str)] = &[
    ("backup_minutes_interval", "01-59"),
    ("backup_hours_interval", "01-06"),
    ("backup_day_month_cron", "*"),
    ("backup_month_cron", "*"),
    ("backup_weekday_cron", "*"),
    ("backup_code", "FULL"),
    ("encryption", "FALSE"),
    ("retention_period", "7 days"),
    ("retention_redundancy", "1"),
    ("extra_backup_parameters", ""),
    ("backup_job_status", "ACTIVE"),
    ("automatic_deletion_retention", "14 days"),
];

const SERVER_DEFAULTS: &[(&str, &str)] = &[
    ("root_backup_partition", "/srv/pgbackman"),
    ("pgbackman_dump", "/usr/bin/pgbackman-dump"),
    ("pgbackman_restore", "/usr/bin/pgbackman-restore"),
    ("admin_user", "pgbackman"),
];

/// Registration input for `register_backup_definition`. String fields are
/// raw operator input; empty means "use the stored node default".
#[derive(Debug, Clone, Default)]
pub struct RegisterBackupDefinition {
    pub backup_server: String,
    pub pgsql_node: String,
    pub dbname: String,
    pub dbname_exceptions: Vec<String>,
    pub minutes_cron: String,
    pub hours_cron: String,
    pub day_month_cron: String,
    pub month_cron: String,
    pub weekday_cron: String,
    pub backup_code: String,
    pub encryption: String,
    pub retention_period: String,
    pub retention_redundancy: String,
    pub extra_parameters: String,
    pub job_status: String,
    pub remarks: String,
}

/// Registration input for `register_snapshot_definition`.
#[derive(Debug, Clone, Default)]
pub struct RegisterSnapshotDefinition {
    pub backup_server: String,
    pub pgsql_node: String,
    pub dbname: String,
    pub at_time: String,
    pub backup_code: String,
    pub encryption: String,
    pub retention_period: String,
    pub extra_parameters: String,
    pub tag: String,
    pub pg_dump_release: String,
}

/// Registration input for `register_restore_definition`.
#[derive(Debug, Clone, Default)]
pub struct RegisterRestoreDefinition {
    pub at_time: String,
    pub bck_id: i64,
    pub backup_server: String,
    pub target_pgsql_node: String,
    pub target_dbname: String,
    pub renamed_dbname: String,
    pub extra_parameters: String,
    /// Roles the operator wants recreated; ones already on the target are
    /// dropped with a warning.
    pub roles_to_restore: Vec<String>,
}

/// Raw field updates for `update_backup_definition`; empty keeps the value.
#[derive(Debug, Clone, Default)]
pub struct UpdateBackupDefinition {
    pub minutes_cron: String,
    pub hours_cron: String,
    pub day_month_cron: String,
    pub month_cron: String,
    pub weekday_cron: String,
    pub backup_code: String,
    pub encryption: String,
    pub retention_period: String,
    pub retention_redundancy: String,
    pub extra_parameters: String,
    pub job_status: String,
    pub remarks: String,
}

pub struct AdminApi {
    dal: DAL,
    inspectors: Arc<dyn NodeInspectorFactory>,
}

impl AdminApi {
    pub fn new(dal: DAL) -> Self {
        Self {
            dal,
            inspectors: Arc::new(PgNodeInspectorFactory),
        }
    }

    /// Replaces the node inspector factory; used by tests.
    pub fn with_inspectors(dal: DAL, inspectors: Arc<dyn NodeInspectorFactory>) -> Self {
        Self { dal, inspectors }
    }

    pub fn dal(&self) -> &DAL {
        &self.dal
    }

    // ========================================================================
    // Reference resolution
    // ========================================================================

    /// Resolves a backup server from a numeric id or an FQDN.
    pub async fn resolve_server(&self, ident: &str) -> Result<BackupServer, AdminError> {
        let ident = ident.trim();

        let server = if ident.chars().all(|c| c.is_ascii_digit()) && !ident.is_empty() {
            let id: i32 = ident
                .parse()
                .map_err(|_| ValidationError::Invalid(format!("invalid SrvID '{}'", ident)))?;
            self.dal.backup_server().get_by_id(id).await?
        } else {
            let (hostname, domain) = split_fqdn(ident)?;
            self.dal
                .backup_server()
                .get_by_fqdn(&hostname, &domain)
                .await?
        };

        server.ok_or_else(|| AdminError::not_found("backup server", ident))
    }

    /// Resolves a PgSQL node from a numeric id or an FQDN.
    pub async fn resolve_node(&self, ident: &str) -> Result<PgsqlNode, AdminError> {
        let ident = ident.trim();

        let node = if ident.chars().all(|c| c.is_ascii_digit()) && !ident.is_empty() {
            let id: i32 = ident
                .parse()
                .map_err(|_| ValidationError::Invalid(format!("invalid NodeID '{}'", ident)))?;
            self.dal.pgsql_node().get_by_id(id).await?
        } else {
            let (hostname, domain) = split_fqdn(ident)?;
            self.dal.pgsql_node().get_by_fqdn(&hostname, &domain).await?
        };

        node.ok_or_else(|| AdminError::not_found("PgSQL node", ident))
    }

    // ========================================================================
    // Topology
    // ========================================================================

    pub async fn register_backup_server(
        &self,
        hostname: &str,
        domain: &str,
        status: &str,
        remarks: &str,
    ) -> Result<BackupServer, AdminError> {
        if hostname.trim().is_empty() || domain.trim().is_empty() {
            return Err(ValidationError::Invalid(
                "hostname and domain must not be empty".to_string(),
            )
            .into());
        }

        let status: ServerStatus = or_default(status, "RUNNING").parse()?;

        let server = self
            .dal
            .backup_server()
            .register(NewBackupServer {
                hostname: hostname.trim().to_string(),
                domain_name: domain.trim().to_string(),
                status,
                remarks: remarks.to_string(),
            })
            .await
            .map_err(unique_to_constraint("backup server already registered"))?;

        for (parameter, value) in SERVER_DEFAULTS {
            self.dal
                .backup_server()
                .set_config_value(server.server_id, parameter, value)
                .await?;
        }

        info!(server_id = server.server_id, fqdn = %server.fqdn(), "backup server registered");
        Ok(server)
    }

    pub async fn update_backup_server(
        &self,
        ident: &str,
        status: &str,
        remarks: Option<&str>,
    ) -> Result<BackupServer, AdminError> {
        let server = self.resolve_server(ident).await?;

        let status = if status.trim().is_empty() {
            None
        } else {
            Some(status.parse::<ServerStatus>()?)
        };

        Ok(self
            .dal
            .backup_server()
            .update(server.server_id, status, remarks.map(str::to_string))
            .await?)
    }

    pub async fn delete_backup_server(&self, ident: &str) -> Result<(), AdminError> {
        let server = self.resolve_server(ident).await?;

        match self.dal.backup_server().delete(server.server_id).await? {
            TopologyDeletion::Deleted => {
                info!(server_id = server.server_id, "backup server deleted");
                Ok(())
            }
            TopologyDeletion::InUse { definitions } => Err(AdminError::Constraint(format!(
                "backup server {} still has {} backup definition(s)",
                server.fqdn(),
                definitions
            ))),
        }
    }

    pub async fn show_backup_servers(&self) -> Result<ResultSet, AdminError> {
        let servers = self.dal.backup_server().list().await?;
        Ok(show::backup_servers(&servers))
    }

    pub async fn register_pgsql_node(
        &self,
        hostname: &str,
        domain: &str,
        pgport: &str,
        admin_user: &str,
        status: &str,
        remarks: &str,
    ) -> Result<PgsqlNode, AdminError> {
        if hostname.trim().is_empty() || domain.trim().is_empty() {
            return Err(ValidationError::Invalid(
                "hostname and domain must not be empty".to_string(),
            )
            .into());
        }

        let pgport: i32 = or_default(pgport, "5432")
            .parse()
            .map_err(|_| ValidationError::Invalid(format!("invalid port '{}'", pgport)))?;
        let status: NodeStatus = or_default(status, "RUNNING").parse()?;

        let node = self
            .dal
            .pgsql_node()
            .register(NewPgsqlNode {
                hostname: hostname.trim().to_string(),
                domain_name: domain.trim().to_string(),
                pgport,
                admin_user: or_default(admin_user, "postgres").to_string(),
                status,
                remarks: remarks.to_string(),
            })
            .await
            .map_err(unique_to_constraint("PgSQL node already registered"))?;

        for (parameter, value) in NODE_DEFAULTS {
            self.dal
                .pgsql_node()
                .set_config_value(node.node_id, parameter, value)
                .await?;
        }
        self.dal
            .pgsql_node()
            .set_config_value(
                node.node_id,
                "pgnode_backup_partition",
                &format!("/srv/pgbackman/{}", node.fqdn()),
            )
            .await?;
        self.dal
            .pgsql_node()
            .set_config_value(
                node.node_id,
                "pgnode_crontab_file",
                &format!("/etc/cron.d/pgsql_node_{}", node.node_id),
            )
            .await?;

        info!(node_id = node.node_id, fqdn = %node.fqdn(), "PgSQL node registered");
        Ok(node)
    }

    pub async fn update_pgsql_node(
        &self,
        ident: &str,
        pgport: &str,
        admin_user: &str,
        status: &str,
        remarks: Option<&str>,
    ) -> Result<PgsqlNode, AdminError> {
        let node = self.resolve_node(ident).await?;

        let pgport = if pgport.trim().is_empty() {
            None
        } else {
            Some(pgport.trim().parse::<i32>().map_err(|_| {
                ValidationError::Invalid(format!("invalid port '{}'", pgport))
            })?)
        };
        let admin_user = if admin_user.trim().is_empty() {
            None
        } else {
            Some(admin_user.trim().to_string())
        };
        let status = if status.trim().is_empty() {
            None
        } else {
            Some(status.parse::<NodeStatus>()?)
        };

        Ok(self
            .dal
            .pgsql_node()
            .update(
                node.node_id,
                pgport,
                admin_user,
                status,
                remarks.map(str::to_string),
            )
            .await?)
    }

    pub async fn delete_pgsql_node(&self, ident: &str) -> Result<(), AdminError> {
        let node = self.resolve_node(ident).await?;

        match self.dal.pgsql_node().delete(node.node_id).await? {
            TopologyDeletion::Deleted => {
                info!(node_id = node.node_id, "PgSQL node deleted");
                Ok(())
            }
            TopologyDeletion::InUse { definitions } => Err(AdminError::Constraint(format!(
                "PgSQL node {} still has {} backup definition(s)",
                node.fqdn(),
                definitions
            ))),
        }
    }

    pub async fn show_pgsql_nodes(&self) -> Result<ResultSet, AdminError> {
        let nodes = self.dal.pgsql_node().list().await?;
        Ok(show::pgsql_nodes(&nodes))
    }

    // ========================================================================
    // Backup definitions
    // ========================================================================

    /// Registers one or many backup definitions, expanding bulk dbname
    /// specifiers against the target node.
    pub async fn register_backup_definition(
        &self,
        req: RegisterBackupDefinition,
    ) -> Result<Vec<BackupDefinition>, AdminError> {
        let server = self.resolve_server(&req.backup_server).await?;
        let node = self.resolve_node(&req.pgsql_node).await?;

        let node_id = node.node_id;

        let backup_code: BackupCode = or_default(
            &req.backup_code,
            &self.node_default(node_id, "backup_code").await?,
        )
        .parse()?;
        let encryption = status::parse_boolean(or_default(
            &req.encryption,
            &self.node_default(node_id, "encryption").await?,
        ))?;
        let retention_period = or_default(
            &req.retention_period,
            &self.node_default(node_id, "retention_period").await?,
        )
        .to_string();
        validation::parse_interval(&retention_period)?;
        let retention_redundancy = validation::parse_redundancy(or_default(
            &req.retention_redundancy,
            &self.node_default(node_id, "retention_redundancy").await?,
        ))?;
        let job_status: JobStatus = or_default(
            &req.job_status,
            &self.node_default(node_id, "backup_job_status").await?,
        )
        .parse()?;
        let extra_parameters = or_default(
            &req.extra_parameters,
            &self.node_default(node_id, "extra_backup_parameters").await?,
        )
        .to_string();

        let day_month = or_default(
            &req.day_month_cron,
            &self.node_default(node_id, "backup_day_month_cron").await?,
        )
        .to_string();
        let month = or_default(
            &req.month_cron,
            &self.node_default(node_id, "backup_month_cron").await?,
        )
        .to_string();
        let weekday = or_default(
            &req.weekday_cron,
            &self.node_default(node_id, "backup_weekday_cron").await?,
        )
        .to_string();
        let minutes_interval = self.node_default(node_id, "backup_minutes_interval").await?;
        let hours_interval = self.node_default(node_id, "backup_hours_interval").await?;

        // CLUSTER definitions may target the whole instance with an empty
        // dbname; everything else needs at least one database.
        let bulk = bulk::is_bulk_specifier(&req.dbname);
        let databases = if req.dbname.trim().is_empty() {
            if backup_code != BackupCode::Cluster {
                return Err(ValidationError::Invalid(
                    "dbname is required for non-CLUSTER definitions".to_string(),
                )
                .into());
            }
            vec![String::new()]
        } else if bulk {
            let inspector = self.inspectors.for_node(&node);
            let node_databases = inspector
                .list_databases()
                .await
                .map_err(|e| AdminError::Node(e.to_string()))?;
            let covered = self
                .dal
                .pgsql_node()
                .databases_with_definitions(node.node_id)
                .await?;
            bulk::expand_dbname_list(
                &req.dbname,
                &req.dbname_exceptions,
                &node_databases,
                &covered,
            )?
        } else {
            let list = bulk::expand_dbname_list(&req.dbname, &req.dbname_exceptions, &[], &[])?;
            let inspector = self.inspectors.for_node(&node);
            for dbname in &list {
                let exists = inspector
                    .database_exists(dbname)
                    .await
                    .map_err(|e| AdminError::Node(e.to_string()))?;
                if !exists {
                    return Err(AdminError::Constraint(format!(
                        "database '{}' does not exist on {}",
                        dbname,
                        node.fqdn()
                    )));
                }
            }
            list
        };

        let mut rng = StdRng::from_entropy();
        let mut registered = Vec::with_capacity(databases.len());

        for dbname in databases {
            // Bulk registrations always draw minute and hour from the node's
            // configured intervals to spread the load; explicit values win
            // for single registrations.
            let minutes = if bulk || req.minutes_cron.trim().is_empty() {
                random_in_interval(&minutes_interval, 59, &mut rng)?.to_string()
            } else {
                req.minutes_cron.trim().to_string()
            };
            let hours = if bulk || req.hours_cron.trim().is_empty() {
                random_in_interval(&hours_interval, 23, &mut rng)?.to_string()
            } else {
                req.hours_cron.trim().to_string()
            };

            let schedule = CronSchedule::parse(&minutes, &hours, &day_month, &month, &weekday)?;

            let def = self
                .dal
                .backup_definition()
                .register(NewBackupDefinition {
                    backup_server_id: server.server_id,
                    pgsql_node_id: node.node_id,
                    dbname: dbname.clone(),
                    schedule,
                    backup_code,
                    encryption,
                    retention_period: retention_period.clone(),
                    retention_redundancy,
                    extra_parameters: extra_parameters.clone(),
                    job_status,
                    remarks: req.remarks.clone(),
                })
                .await
                .map_err(unique_to_constraint(
                    "an equivalent backup definition already exists",
                ))?;

            info!(def_id = def.def_id, dbname = %dbname, "backup definition registered");
            registered.push(def);
        }

        Ok(registered)
    }

    pub async fn update_backup_definition(
        &self,
        def_id: i64,
        update: UpdateBackupDefinition,
    ) -> Result<BackupDefinition, AdminError> {
        let existing = self
            .dal
            .backup_definition()
            .get_by_id(def_id)
            .await?
            .ok_or_else(|| AdminError::not_found("backup definition", def_id.to_string()))?;

        let schedule = CronSchedule::parse(
            or_default(&update.minutes_cron, &existing.schedule.minutes),
            or_default(&update.hours_cron, &existing.schedule.hours),
            or_default(&update.day_month_cron, &existing.schedule.day_month),
            or_default(&update.month_cron, &existing.schedule.month),
            or_default(&update.weekday_cron, &existing.schedule.weekday),
        )?;

        let mut changes = BackupDefinitionChanges {
            schedule: Some(schedule),
            ..Default::default()
        };

        if !update.backup_code.trim().is_empty() {
            changes.backup_code = Some(update.backup_code.parse()?);
        }
        if !update.encryption.trim().is_empty() {
            changes.encryption = Some(status::parse_boolean(&update.encryption)?);
        }
        if !update.retention_period.trim().is_empty() {
            validation::parse_interval(&update.retention_period)?;
            changes.retention_period = Some(update.retention_period.trim().to_string());
        }
        if !update.retention_redundancy.trim().is_empty() {
            changes.retention_redundancy =
                Some(validation::parse_redundancy(&update.retention_redundancy)?);
        }
        if !update.extra_parameters.trim().is_empty() {
            changes.extra_parameters = Some(update.extra_parameters.clone());
        }
        if !update.job_status.trim().is_empty() {
            changes.job_status = Some(update.job_status.parse()?);
        }
        if !update.remarks.trim().is_empty() {
            changes.remarks = Some(update.remarks.clone());
        }

        self.dal
            .backup_definition()
            .update(def_id, changes)
            .await?
            .ok_or_else(|| AdminError::not_found("backup definition", def_id.to_string()))
    }

    pub async fn delete_backup_definition_id(
        &self,
        def_id: i64,
        force: bool,
    ) -> Result<(), AdminError> {
        let outcome = self.dal.backup_definition().delete(def_id, force).await?;
        self.report_deletion(outcome, &def_id.to_string())
    }

    pub async fn delete_backup_definition_dbname(
        &self,
        server_ident: &str,
        node_ident: &str,
        dbname: &str,
        force: bool,
    ) -> Result<(), AdminError> {
        let server = self.resolve_server(server_ident).await?;
        let node = self.resolve_node(node_ident).await?;

        let outcome = self
            .dal
            .backup_definition()
            .delete_by_dbname(server.server_id, node.node_id, dbname.to_string(), force)
            .await?;
        self.report_deletion(outcome, dbname)
    }

    fn report_deletion(
        &self,
        outcome: Option<DefinitionDeletion>,
        ident: &str,
    ) -> Result<(), AdminError> {
        match outcome {
            Some(DefinitionDeletion::Deleted {
                def_ids,
                artifacts_scheduled,
            }) => {
                info!(
                    ?def_ids,
                    artifacts_scheduled, "backup definition(s) deleted"
                );
                Ok(())
            }
            Some(DefinitionDeletion::HasCatalogRows { count }) => {
                Err(AdminError::Constraint(format!(
                    "definition has {} catalog entries; use force-deletion to remove them",
                    count
                )))
            }
            None => Err(AdminError::not_found("backup definition", ident)),
        }
    }

    pub async fn move_backup_definition(
        &self,
        from_server: &str,
        to_server: &str,
        node_ident: Option<&str>,
        dbname: Option<&str>,
        def_id: Option<i64>,
    ) -> Result<Vec<i64>, AdminError> {
        let from = self.resolve_server(from_server).await?;
        let to = self.resolve_server(to_server).await?;

        if from.server_id == to.server_id {
            return Err(ValidationError::Invalid(
                "source and target backup server are the same".to_string(),
            )
            .into());
        }

        let node_id = match node_ident {
            Some(ident) => Some(self.resolve_node(ident).await?.node_id),
            None => None,
        };

        let moved = self
            .dal
            .backup_definition()
            .move_definitions(
                from.server_id,
                to.server_id,
                node_id,
                dbname.map(str::to_string),
                def_id,
            )
            .await?;

        if moved.is_empty() {
            return Err(AdminError::not_found(
                "backup definition",
                format!("matching definitions on {}", from.fqdn()),
            ));
        }

        info!(count = moved.len(), from = %from.fqdn(), to = %to.fqdn(), "definitions moved");
        Ok(moved)
    }

    pub async fn show_backup_definitions(
        &self,
        server_ident: Option<&str>,
        node_ident: Option<&str>,
        dbname: Option<&str>,
    ) -> Result<ResultSet, AdminError> {
        let server_id = match server_ident {
            Some(ident) => Some(self.resolve_server(ident).await?.server_id),
            None => None,
        };
        let node_id = match node_ident {
            Some(ident) => Some(self.resolve_node(ident).await?.node_id),
            None => None,
        };

        let definitions = self
            .dal
            .backup_definition()
            .list(server_id, node_id, dbname.map(str::to_string))
            .await?;
        Ok(show::backup_definitions(&definitions))
    }

    pub async fn show_empty_backup_catalogs(&self) -> Result<ResultSet, AdminError> {
        let definitions = self.dal.backup_definition().without_catalog_entries().await?;
        Ok(show::backup_definitions(&definitions))
    }

    pub async fn show_databases_without_backup_definitions(
        &self,
        node_ident: &str,
    ) -> Result<ResultSet, AdminError> {
        let node = self.resolve_node(node_ident).await?;

        let inspector = self.inspectors.for_node(&node);
        let node_databases = inspector
            .list_databases()
            .await
            .map_err(|e| AdminError::Node(e.to_string()))?;
        let covered = self
            .dal
            .pgsql_node()
            .databases_with_definitions(node.node_id)
            .await?;

        let databases = bulk::expand_dbname_list(
            bulk::DATABASES_WITHOUT_DEFINITIONS,
            &[],
            &node_databases,
            &covered,
        )?;
        Ok(show::database_list(&databases))
    }

    // ========================================================================
    // Snapshots and restores
    // ========================================================================

    pub async fn register_snapshot_definition(
        &self,
        req: RegisterSnapshotDefinition,
    ) -> Result<SnapshotDefinition, AdminError> {
        let server = self.resolve_server(&req.backup_server).await?;
        let node = self.resolve_node(&req.pgsql_node).await?;

        let backup_code: BackupCode = or_default(
            &req.backup_code,
            &self.node_default(node.node_id, "backup_code").await?,
        )
        .parse()?;

        if req.dbname.trim().is_empty() && backup_code != BackupCode::Cluster {
            return Err(ValidationError::Invalid(
                "dbname is required for non-CLUSTER snapshots".to_string(),
            )
            .into());
        }

        let at_time = validation::parse_at_time(&req.at_time)?;
        let encryption = status::parse_boolean(or_default(
            &req.encryption,
            &self.node_default(node.node_id, "encryption").await?,
        ))?;
        let retention_period = or_default(
            &req.retention_period,
            &self.node_default(node.node_id, "retention_period").await?,
        )
        .to_string();
        validation::parse_interval(&retention_period)?;
        let pg_dump_release = validation::parse_pg_dump_release(&req.pg_dump_release)?;

        let snapshot = self
            .dal
            .snapshot_definition()
            .register(NewSnapshotDefinition {
                backup_server_id: server.server_id,
                pgsql_node_id: node.node_id,
                dbname: req.dbname.trim().to_string(),
                at_time,
                backup_code,
                encryption,
                retention_period,
                extra_parameters: req.extra_parameters.clone(),
                tag: or_default(&req.tag, "snapshot").to_string(),
                pg_dump_release,
            })
            .await?;

        info!(snapshot_id = snapshot.snapshot_id, "snapshot definition registered");
        Ok(snapshot)
    }

    pub async fn show_snapshot_definitions(&self) -> Result<ResultSet, AdminError> {
        let snapshots = self.dal.snapshot_definition().list().await?;
        Ok(show::snapshot_definitions(&snapshots))
    }

    pub async fn show_snapshots_in_progress(&self) -> Result<ResultSet, AdminError> {
        let snapshots = self.dal.snapshot_definition().in_progress().await?;
        Ok(show::snapshot_definitions(&snapshots))
    }

    pub async fn register_restore_definition(
        &self,
        req: RegisterRestoreDefinition,
    ) -> Result<RestoreDefinition, AdminError> {
        let server = self.resolve_server(&req.backup_server).await?;
        let node = self.resolve_node(&req.target_pgsql_node).await?;

        let entry = self
            .dal
            .backup_catalog()
            .get(req.bck_id)
            .await?
            .ok_or_else(|| AdminError::not_found("backup catalog entry", req.bck_id.to_string()))?;

        if entry.execution_status != ExecutionStatus::Succeeded {
            return Err(AdminError::Constraint(format!(
                "backup {} did not succeed and cannot be restored",
                req.bck_id
            )));
        }

        let at_time = validation::parse_at_time(&req.at_time)?;
        let inspector = self.inspectors.for_node(&node);

        let target_dbname = if req.target_dbname.trim().is_empty() {
            entry.dbname.clone()
        } else {
            req.target_dbname.trim().to_string()
        };

        // A rename is only accepted while the new name is still free.
        let renamed_dbname = match req.renamed_dbname.trim() {
            "" => None,
            renamed => {
                let exists = inspector
                    .database_exists(renamed)
                    .await
                    .map_err(|e| AdminError::Node(e.to_string()))?;
                if exists {
                    return Err(AdminError::Constraint(format!(
                        "database '{}' already exists on {}",
                        renamed,
                        node.fqdn()
                    )));
                }
                Some(renamed.to_string())
            }
        };

        let existing_roles = inspector
            .list_roles()
            .await
            .map_err(|e| AdminError::Node(e.to_string()))?;
        let mut roles_to_restore = Vec::new();
        for role in req.roles_to_restore {
            if existing_roles.contains(&role) {
                warn!(role = %role, node = %node.fqdn(), "role exists on target, will be reused");
            } else {
                roles_to_restore.push(role);
            }
        }

        let restore = self
            .dal
            .restore_definition()
            .register(NewRestoreDefinition {
                at_time,
                bck_id: req.bck_id,
                backup_server_id: server.server_id,
                target_pgsql_node_id: node.node_id,
                target_dbname,
                renamed_dbname,
                extra_parameters: req.extra_parameters.clone(),
                roles_to_restore,
            })
            .await?;

        info!(restore_id = restore.restore_id, "restore definition registered");
        Ok(restore)
    }

    pub async fn show_restore_definitions(&self) -> Result<ResultSet, AdminError> {
        let restores = self.dal.restore_definition().list().await?;
        Ok(show::restore_definitions(&restores))
    }

    pub async fn show_restores_in_progress(&self) -> Result<ResultSet, AdminError> {
        let restores = self.dal.restore_definition().in_progress().await?;
        Ok(show::restore_definitions(&restores))
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    pub async fn show_backup_catalog(
        &self,
        server_ident: Option<&str>,
        node_ident: Option<&str>,
        dbname: Option<&str>,
    ) -> Result<ResultSet, AdminError> {
        let server_id = match server_ident {
            Some(ident) => Some(self.resolve_server(ident).await?.server_id),
            None => None,
        };
        let node_id = match node_ident {
            Some(ident) => Some(self.resolve_node(ident).await?.node_id),
            None => None,
        };

        let entries = self
            .dal
            .backup_catalog()
            .list(server_id, node_id, dbname.map(str::to_string))
            .await?;
        Ok(show::backup_catalog(&entries))
    }

    pub async fn show_restore_catalog(
        &self,
        server_ident: Option<&str>,
        node_ident: Option<&str>,
    ) -> Result<ResultSet, AdminError> {
        let server_id = match server_ident {
            Some(ident) => Some(self.resolve_server(ident).await?.server_id),
            None => None,
        };
        let node_id = match node_ident {
            Some(ident) => Some(self.resolve_node(ident).await?.node_id),
            None => None,
        };

        let entries = self.dal.restore_catalog().list(server_id, node_id).await?;
        Ok(show::restore_catalog(&entries))
    }

    pub async fn show_backup_details(&self, bck_id: i64) -> Result<ResultSet, AdminError> {
        let entry = self
            .dal
            .backup_catalog()
            .get(bck_id)
            .await?
            .ok_or_else(|| AdminError::not_found("backup catalog entry", bck_id.to_string()))?;
        Ok(show::backup_details(&entry))
    }

    pub async fn show_restore_details(&self, rst_id: i64) -> Result<ResultSet, AdminError> {
        let entry = self
            .dal
            .restore_catalog()
            .get(rst_id)
            .await?
            .ok_or_else(|| AdminError::not_found("restore catalog entry", rst_id.to_string()))?;
        Ok(show::restore_details(&entry))
    }

    // ========================================================================
    // Config, stats, queue
    // ========================================================================

    pub async fn show_backup_server_config(&self, ident: &str) -> Result<ResultSet, AdminError> {
        let server = self.resolve_server(ident).await?;
        let parameters = self.dal.backup_server().config(server.server_id).await?;
        Ok(show::config_parameters(parameters))
    }

    pub async fn update_backup_server_config(
        &self,
        ident: &str,
        parameter: &str,
        value: &str,
    ) -> Result<(), AdminError> {
        let server = self.resolve_server(ident).await?;

        if parameter.trim().is_empty() {
            return Err(ValidationError::Invalid("parameter must not be empty".to_string()).into());
        }

        self.dal
            .backup_server()
            .set_config_value(server.server_id, parameter.trim(), value)
            .await?;
        Ok(())
    }

    pub async fn show_pgsql_node_config(&self, ident: &str) -> Result<ResultSet, AdminError> {
        let node = self.resolve_node(ident).await?;
        let parameters = self.dal.pgsql_node().config(node.node_id).await?;
        Ok(show::config_parameters(parameters))
    }

    pub async fn update_pgsql_node_config(
        &self,
        ident: &str,
        parameter: &str,
        value: &str,
    ) -> Result<(), AdminError> {
        let node = self.resolve_node(ident).await?;

        if parameter.trim().is_empty() {
            return Err(ValidationError::Invalid("parameter must not be empty".to_string()).into());
        }

        self.dal
            .pgsql_node()
            .set_config_value(node.node_id, parameter.trim(), value)
            .await?;
        Ok(())
    }

    /// Effective configuration plus version information.
    pub async fn show_pgbackman_config(
        &self,
        settings: &crate::config::Settings,
    ) -> Result<ResultSet, AdminError> {
        let database_version = self
            .dal
            .catalog_info()
            .current_version()
            .await
            .map(|v| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()))
            .unwrap_or_else(|_| "unreachable".to_string());

        Ok(show::details(vec![
            ("Software version", SOFTWARE_VERSION.to_string()),
            ("Software catalog version", CATALOG_VERSION.to_string()),
            ("Database catalog version", database_version),
            ("DB host", settings.database.dbhost.clone()),
            ("DB port", settings.database.dbport.to_string()),
            ("DB name", settings.database.dbname.clone()),
            ("DB user", settings.database.dbuser.clone()),
            (
                "Connect retry interval",
                format!("{}s", settings.database.pg_connect_retry_interval),
            ),
            (
                "Backup server override",
                settings.agent.backup_server.clone(),
            ),
            (
                "Database source dir",
                settings.agent.database_source_dir.display().to_string(),
            ),
            ("Tmp dir", settings.agent.tmp_dir.display().to_string()),
            (
                "Poll interval",
                format!("{}s", settings.agent.poll_interval),
            ),
            (
                "Maintenance interval",
                format!("{}s", settings.agent.maintenance_interval),
            ),
            (
                "Pause recovery on slave",
                settings
                    .agent
                    .pause_recovery_process_on_slave
                    .to_string()
                    .to_uppercase(),
            ),
            (
                "SMTP alerts",
                settings.alerts.smtp_alerts.to_string().to_uppercase(),
            ),
            (
                "Alerts check interval",
                format!("{}s", settings.alerts.alerts_check_interval),
            ),
            ("SMTP server", settings.alerts.smtp_server.clone()),
            ("SMTP port", settings.alerts.smtp_port.to_string()),
            ("Log level", settings.logging.log_level.clone()),
            ("Log file", settings.logging.log_file.clone()),
        ]))
    }

    pub async fn show_pgbackman_stats(&self) -> Result<ResultSet, AdminError> {
        let stats = self.dal.stats().pgbackman_stats().await?;
        Ok(show::pgbackman_stats(&stats))
    }

    pub async fn show_backup_server_stats(&self, ident: &str) -> Result<ResultSet, AdminError> {
        let server = self.resolve_server(ident).await?;
        let stats = self.dal.stats().backup_server_stats(server.server_id).await?;
        Ok(show::backup_server_stats(&stats))
    }

    pub async fn show_pgsql_node_stats(&self, ident: &str) -> Result<ResultSet, AdminError> {
        let node = self.resolve_node(ident).await?;
        let stats = self.dal.stats().pgsql_node_stats(node.node_id).await?;
        Ok(show::pgsql_node_stats(&stats))
    }

    pub async fn show_jobs_queue(&self) -> Result<ResultSet, AdminError> {
        let jobs = self.dal.job_queue().list().await?;
        Ok(show::jobs_queue(&jobs))
    }

    // ========================================================================
    // pg_dump bin dirs
    // ========================================================================

    pub async fn register_backup_server_pg_bin_dir(
        &self,
        server_ident: &str,
        pg_version: &str,
        bin_dir: &str,
        description: &str,
    ) -> Result<(), AdminError> {
        let server = self.resolve_server(server_ident).await?;
        let pg_version = validate_known_release(pg_version)?;

        self.dal
            .pg_bin_dir()
            .register(PgBinDir {
                backup_server_id: server.server_id,
                pg_version,
                bin_dir: bin_dir.trim().to_string(),
                description: description.to_string(),
            })
            .await
            .map_err(unique_to_constraint("bin dir already registered"))?;
        Ok(())
    }

    pub async fn update_backup_server_pg_bin_dir(
        &self,
        server_ident: &str,
        pg_version: &str,
        bin_dir: &str,
        description: &str,
    ) -> Result<(), AdminError> {
        let server = self.resolve_server(server_ident).await?;
        let pg_version = validate_known_release(pg_version)?;

        let updated = self
            .dal
            .pg_bin_dir()
            .update(PgBinDir {
                backup_server_id: server.server_id,
                pg_version: pg_version.clone(),
                bin_dir: bin_dir.trim().to_string(),
                description: description.to_string(),
            })
            .await?;

        if !updated {
            return Err(AdminError::not_found("pg bin dir", pg_version));
        }
        Ok(())
    }

    pub async fn delete_backup_server_pg_bin_dir(
        &self,
        server_ident: &str,
        pg_version: &str,
    ) -> Result<(), AdminError> {
        let server = self.resolve_server(server_ident).await?;

        let deleted = self
            .dal
            .pg_bin_dir()
            .delete(server.server_id, pg_version.trim())
            .await?;
        if !deleted {
            return Err(AdminError::not_found("pg bin dir", pg_version));
        }
        Ok(())
    }

    pub async fn show_backup_server_pg_bin_dirs(
        &self,
        server_ident: &str,
    ) -> Result<ResultSet, AdminError> {
        let server = self.resolve_server(server_ident).await?;
        let entries = self.dal.pg_bin_dir().list_for_server(server.server_id).await?;
        Ok(show::pg_bin_dirs(&entries))
    }

    pub async fn register_backup_server_default_pg_bin_dir(
        &self,
        pg_version: &str,
        bin_dir: &str,
        description: &str,
    ) -> Result<(), AdminError> {
        let pg_version = validate_known_release(pg_version)?;

        self.dal
            .pg_bin_dir()
            .register_default(DefaultPgBinDir {
                pg_version,
                bin_dir: bin_dir.trim().to_string(),
                description: description.to_string(),
            })
            .await
            .map_err(unique_to_constraint("default bin dir already registered"))?;
        Ok(())
    }

    pub async fn update_backup_server_default_pg_bin_dir(
        &self,
        pg_version: &str,
        bin_dir: &str,
        description: &str,
    ) -> Result<(), AdminError> {
        let pg_version = validate_known_release(pg_version)?;

        let updated = self
            .dal
            .pg_bin_dir()
            .update_default(DefaultPgBinDir {
                pg_version: pg_version.clone(),
                bin_dir: bin_dir.trim().to_string(),
                description: description.to_string(),
            })
            .await?;

        if !updated {
            return Err(AdminError::not_found("default pg bin dir", pg_version));
        }
        Ok(())
    }

    pub async fn delete_backup_server_default_pg_bin_dir(
        &self,
        pg_version: &str,
    ) -> Result<(), AdminError> {
        let deleted = self.dal.pg_bin_dir().delete_default(pg_version.trim()).await?;
        if !deleted {
            return Err(AdminError::not_found("default pg bin dir", pg_version));
        }
        Ok(())
    }

    pub async fn show_backup_server_default_configured_versions(
        &self,
    ) -> Result<ResultSet, AdminError> {
        let entries = self.dal.pg_bin_dir().list_defaults().await?;
        Ok(show::default_pg_bin_dirs(&entries))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Stored node parameter with the compiled-in fallback.
    async fn node_default(&self, node_id: i32, parameter: &str) -> Result<String, AdminError> {
        if let Some(value) = self
            .dal
            .pgsql_node()
            .get_config_value(node_id, parameter)
            .await?
        {
            return Ok(value);
        }

        Ok(NODE_DEFAULTS
            .iter()
            .find(|(name, _)| *name == parameter)
            .map(|(_, value)| value.to_string())
            .unwrap_or_default())
    }
}

fn split_fqdn(fqdn: &str) -> Result<(String, String), ValidationError> {
    match fqdn.split_once('.') {
        Some((hostname, domain)) if !hostname.is_empty() && !domain.is_empty() => {
            Ok((hostname.to_string(), domain.to_string()))
        }
        _ => Err(ValidationError::Invalid(format!(
            "'{}' is not a numeric id or an FQDN",
            fqdn
        ))),
    }
}

fn validate_known_release(raw: &str) -> Result<String, AdminError> {
    match validation::parse_pg_dump_release(raw)? {
        Some(version) => Ok(version),
        None => Err(ValidationError::PgDumpRelease(raw.to_string()).into()),
    }
}

/// Maps a unique-violation query error to a constraint error with a
/// readable message; everything else passes through.
fn unique_to_constraint(message: &'static str) -> impl Fn(CatalogError) -> AdminError {
    move |e| match e {
        CatalogError::Query(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => AdminError::Constraint(message.to_string()),
        other => AdminError::Catalog(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_splits_on_first_dot() {
        assert_eq!(
            split_fqdn("bkp01.example.org").unwrap(),
            ("bkp01".to_string(), "example.org".to_string())
        );
        assert!(split_fqdn("localhost").is_err());
        assert!(split_fqdn(".example.org").is_err());
    }
}
