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

//! The alerts loop: ERROR catalog rows become outbound mail.
//!
//! Rows are scanned on `alerts_check_interval`; a successful delivery
//! stamps `alerted_at`, which is the acknowledgment that suppresses
//! re-delivery. Delivery failures leave the row unstamped for the next
//! scan.

use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::AlertSettings;
use crate::dal::DAL;
use crate::error::WorkerError;
use crate::models::{BackupCatalogEntry, RestoreCatalogEntry};

/// Fallback template when `alerts_template` is missing.
const DEFAULT_TEMPLATE: &str = "\
Subject: [PgBackMan] {kind} {id} finished with ERROR

The {kind} with ID {id} on PgSQL node {node_id} (database '{dbname}')
finished with status ERROR on backup server {server_id}.

Return code: {return_code}
Error:
{error}
";

/// Fills the alert template. Recognized placeholders: {kind}, {id},
/// {server_id}, {node_id}, {dbname}, {return_code}, {error}.
pub fn render_template(
    template: &str,
    kind: &str,
    id: i64,
    server_id: i32,
    node_id: i32,
    dbname: &str,
    return_code: i32,
    error: &str,
) -> String {
    template
        .replace("{kind}", kind)
        .replace("{id}", &id.to_string())
        .replace("{server_id}", &server_id.to_string())
        .replace("{node_id}", &node_id.to_string())
        .replace("{dbname}", dbname)
        .replace("{return_code}", &return_code.to_string())
        .replace("{error}", error)
}

/// Splits a rendered template into subject and body. The first line may
/// carry a `Subject: ` prefix; without one a generic subject is used.
pub fn split_subject(rendered: &str) -> (String, String) {
    let mut lines = rendered.lines();

    match lines.next().and_then(|l| l.strip_prefix("Subject: ")) {
        Some(subject) => {
            let body: Vec<&str> = lines.collect();
            (
                subject.to_string(),
                body.join("\n").trim_start().to_string(),
            )
        }
        None => (
            "[PgBackMan] backup error".to_string(),
            rendered.to_string(),
        ),
    }
}

/// Outbound mail sink. The SMTP implementation is swapped for a memory
/// sink in tests.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), WorkerError>;
}

/// lettre-based SMTP delivery per the `[alerts]` config block.
pub struct SmtpSink {
    settings: AlertSettings,
}

impl SmtpSink {
    pub fn new(settings: AlertSettings) -> Self {
        Self { settings }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, WorkerError> {
        let mut builder = if self.settings.smtp_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.settings.smtp_server)
                .map_err(|e| WorkerError::Alert(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.settings.smtp_server)
        };

        builder = builder.port(self.settings.smtp_port);

        if !self.settings.smtp_user.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.settings.smtp_user.clone(),
                self.settings.smtp_password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl AlertSink for SmtpSink {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), WorkerError> {
        let message = Message::builder()
            .from(
                self.settings
                    .smtp_from_address
                    .parse()
                    .map_err(|e| WorkerError::Alert(format!("bad from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| WorkerError::Alert(format!("bad to address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| WorkerError::Alert(e.to_string()))?;

        self.transport()?
            .send(message)
            .await
            .map_err(|e| WorkerError::Alert(e.to_string()))?;

        Ok(())
    }
}

pub struct AlertsLoop {
    dal: DAL,
    settings: AlertSettings,
    sink: Box<dyn AlertSink>,
    shutdown: broadcast::Sender<()>,
}

impl AlertsLoop {
    pub fn new(dal: DAL, settings: AlertSettings) -> Self {
        let sink = Box::new(SmtpSink::new(settings.clone()));
        Self::with_sink(dal, settings, sink)
    }

    pub fn with_sink(dal: DAL, settings: AlertSettings, sink: Box<dyn AlertSink>) -> Self {
        Self {
            dal,
            settings,
            sink,
            shutdown: broadcast::channel(1).0,
        }
    }

    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    pub async fn run(&self) -> Result<(), WorkerError> {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if let Err(e) = self.run_cycle().await {
                error!("alerts cycle failed: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.check_interval()) => {}
                _ = shutdown.recv() => break,
            }
        }

        info!("alerts loop stopped");
        Ok(())
    }

    /// One scan over the unalerted ERROR rows of both catalogs.
    pub async fn run_cycle(&self) -> Result<(), WorkerError> {
        let template = self.load_template();

        for entry in self.dal.backup_catalog().error_unalerted().await? {
            match self.alert_backup(&template, &entry).await {
                Ok(()) => {
                    self.dal.backup_catalog().mark_alerted(entry.bck_id).await?;
                    info!(bck_id = entry.bck_id, "backup error alerted");
                }
                Err(e) => warn!(bck_id = entry.bck_id, "alert delivery failed: {}", e),
            }
        }

        for entry in self.dal.restore_catalog().error_unalerted().await? {
            match self.alert_restore(&template, &entry).await {
                Ok(()) => {
                    self.dal.restore_catalog().mark_alerted(entry.rst_id).await?;
                    info!(rst_id = entry.rst_id, "restore error alerted");
                }
                Err(e) => warn!(rst_id = entry.rst_id, "alert delivery failed: {}", e),
            }
        }

        Ok(())
    }

    fn load_template(&self) -> String {
        match std::fs::read_to_string(Path::new(&self.settings.alerts_template)) {
            Ok(template) => template,
            Err(_) => DEFAULT_TEMPLATE.to_string(),
        }
    }

    async fn recipient_for_server(&self, server_id: i32) -> Result<String, WorkerError> {
        Ok(self
            .dal
            .backup_server()
            .get_config_value(server_id, "alerts_mail_to")
            .await?
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "root@localhost".to_string()))
    }

    async fn alert_backup(
        &self,
        template: &str,
        entry: &BackupCatalogEntry,
    ) -> Result<(), WorkerError> {
        let rendered = render_template(
            template,
            "backup",
            entry.bck_id,
            entry.backup_server_id,
            entry.pgsql_node_id,
            &entry.dbname,
            entry.execution_return_code,
            &entry.error_message,
        );
        let (subject, body) = split_subject(&rendered);
        let to = self.recipient_for_server(entry.backup_server_id).await?;

        self.sink.deliver(&to, &subject, &body).await
    }

    async fn alert_restore(
        &self,
        template: &str,
        entry: &RestoreCatalogEntry,
    ) -> Result<(), WorkerError> {
        let rendered = render_template(
            template,
            "restore",
            entry.rst_id,
            entry.backup_server_id,
            entry.target_pgsql_node_id,
            &entry.target_dbname,
            entry.execution_return_code,
            &entry.error_message,
        );
        let (subject, body) = split_subject(&rendered);
        let to = self.recipient_for_server(entry.backup_server_id).await?;

        self.sink.deliver(&to, &subject, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholders_fill_in() {
        let rendered = render_template(
            DEFAULT_TEMPLATE,
            "backup",
            42,
            1,
            3,
            "salesdb",
            2,
            "pg_dump: connection refused",
        );

        assert!(rendered.contains("backup 42 finished with ERROR"));
        assert!(rendered.contains("database 'salesdb'"));
        assert!(rendered.contains("Return code: 2"));
        assert!(rendered.contains("connection refused"));
    }

    #[test]
    fn subject_line_splits_off() {
        let (subject, body) = split_subject("Subject: hello\n\nworld");
        assert_eq!(subject, "hello");
        assert_eq!(body, "world");

        let (subject, body) = split_subject("no subject line");
        assert_eq!(subject, "[PgBackMan] backup error");
        assert_eq!(body, "no subject line");
    }
}
