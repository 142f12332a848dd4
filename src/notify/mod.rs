//! Alert delivery with channel fallback.
//!
//! A notification goes to exactly one of three channels: the background
//! agent, a foreground desktop notification, or the in-terminal banner. The
//! banner cannot fail, so every other failure lands there.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{MeteoError, Result};

pub mod banner;
pub mod desktop;
pub mod dispatcher;
pub mod email;

pub use banner::{BannerBoard, BannerPhase, TerminalBanner};
pub use desktop::DesktopNotifier;
pub use dispatcher::{Delivery, Dispatcher, Route};
pub use email::EmailAgent;

/// One notification, titled with the location it concerns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    /// Grouping tag: `search`, `rain`, `temp` or `welcome`
    pub category: String,
}

impl NotificationRequest {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            category: category.into(),
        }
    }
}

/// User decision about system notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// Never asked
    #[default]
    Default,
}

impl Permission {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Default => "default",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "granted" => Ok(Permission::Granted),
            "denied" => Ok(Permission::Denied),
            "default" => Ok(Permission::Default),
            other => Err(MeteoError::validation(format!(
                "Unknown notification permission '{other}'"
            ))),
        }
    }
}

/// Where the current permission decision is read from
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn permission(&self) -> Result<Permission>;
}

/// Delivery path that outlives the current process
#[async_trait]
pub trait BackgroundAgent: Send + Sync {
    /// Whether the agent is active and will take deliveries
    fn is_controlling(&self) -> bool;

    async fn show_notification(&self, request: &NotificationRequest) -> Result<()>;
}

/// System notification shown while the process runs
pub trait ForegroundNotifier: Send + Sync {
    /// Whether the platform can display notifications at all
    fn is_supported(&self) -> bool;

    fn show(&self, request: &NotificationRequest) -> Result<()>;
}

/// In-interface fallback surface. Never fails.
pub trait BannerSurface: Send + Sync {
    fn show(&self, request: &NotificationRequest);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_round_trips_through_str() {
        for permission in [Permission::Granted, Permission::Denied, Permission::Default] {
            assert_eq!(permission.as_str().parse::<Permission>().unwrap(), permission);
        }
        assert_eq!(" Granted ".parse::<Permission>().unwrap(), Permission::Granted);
        assert!("maybe".parse::<Permission>().is_err());
    }

    #[test]
    fn test_default_permission_is_unasked() {
        assert_eq!(Permission::default(), Permission::Default);
    }
}
