//! Background delivery through an SMTP relay.
//!
//! Once the relay has accepted a message, delivery no longer depends on
//! this process.

use std::env;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    Message, Transport, transport::smtp::SmtpTransport,
    transport::smtp::authentication::Credentials,
};
use tracing::{debug, info, instrument};

use super::{BackgroundAgent, NotificationRequest};
use crate::config::{EmailConfig, NotificationsConfig};
use crate::{MeteoError, Result};

#[derive(Clone)]
pub struct EmailAgent {
    config: EmailConfig,
    app_name: String,
    password: String,
}

impl std::fmt::Debug for EmailAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailAgent")
            .field("relay", &self.config.relay)
            .field("to", &self.config.to)
            .finish_non_exhaustive()
    }
}

impl EmailAgent {
    /// Agent for the configured relay, if an email section exists and its
    /// password is set in the environment
    pub fn from_config(config: &NotificationsConfig) -> Option<Self> {
        let email = config.email.as_ref()?;
        let password = match env::var(&email.password_env) {
            Ok(password) if !password.is_empty() => password,
            _ => {
                debug!(
                    "{} is not set, background notifications disabled",
                    email.password_env
                );
                return None;
            }
        };

        Some(Self {
            config: email.clone(),
            app_name: config.app_name.clone(),
            password,
        })
    }

    fn create_mailer(&self) -> anyhow::Result<SmtpTransport> {
        let credentials = Credentials::new(self.config.username.clone(), self.password.clone());

        let mailer = SmtpTransport::relay(&self.config.relay)
            .with_context(|| format!("Invalid SMTP relay '{}'", self.config.relay))?
            .credentials(credentials)
            .build();

        Ok(mailer)
    }

    fn build_message(&self, request: &NotificationRequest) -> anyhow::Result<Message> {
        let email = Message::builder()
            .from(
                format!("{} <{}>", self.app_name, self.config.from)
                    .parse()
                    .context("Failed to parse from address")?,
            )
            .to(self
                .config
                .to
                .parse()
                .context("Failed to parse to address")?)
            .subject(format!("[{}] {}", request.category, request.title))
            .body(request.body.clone())?;

        Ok(email)
    }
}

#[async_trait]
impl BackgroundAgent for EmailAgent {
    fn is_controlling(&self) -> bool {
        true
    }

    #[instrument(skip(self, request), fields(category = %request.category))]
    async fn show_notification(&self, request: &NotificationRequest) -> Result<()> {
        let email = self
            .build_message(request)
            .map_err(|e| MeteoError::transport(format!("{e:#}")))?;
        let mailer = self
            .create_mailer()
            .map_err(|e| MeteoError::transport(format!("{e:#}")))?;

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| MeteoError::transport(format!("Email task failed: {e}")))?
            .map_err(|e| MeteoError::transport(format!("Failed to send email: {e}")))?;

        info!("Sent notification email to {}", self.config.to);
        Ok(())
    }
}
