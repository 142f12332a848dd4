//! Persisted user preferences: theme, notification permission and the
//! committed session

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::notify::{Permission, PermissionSource};
use crate::session::SessionState;
use crate::storage::Store;
use crate::{MeteoError, Result};

const THEME_KEY: &str = "meteo-pwa-theme";
const PERMISSION_KEY: &str = "meteo-notification-permission";
const SESSION_KEY: &str = "meteo-session";

/// Terminal palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = MeteoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(MeteoError::validation(format!("Unknown theme '{other}'"))),
        }
    }
}

#[derive(Clone)]
pub struct Preferences {
    store: Arc<Store>,
}

impl Preferences {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Saved theme. Anything other than "dark" reads as light.
    pub async fn theme(&self) -> Result<Theme> {
        let saved = self.store.get::<String>(THEME_KEY).await?;
        Ok(match saved.as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        })
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store.put(THEME_KEY, theme.as_str()).await?;
        info!("Theme set to {}", theme);
        Ok(())
    }

    /// Flip the saved theme and return the new one
    pub async fn toggle_theme(&self) -> Result<Theme> {
        let theme = self.theme().await?.toggled();
        self.set_theme(theme).await?;
        Ok(theme)
    }

    pub async fn notification_permission(&self) -> Result<Permission> {
        Ok(self
            .store
            .get::<Permission>(PERMISSION_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_notification_permission(&self, permission: Permission) -> Result<()> {
        self.store.put(PERMISSION_KEY, &permission).await?;
        info!("Notification permission set to {}", permission);
        Ok(())
    }

    /// Last committed session, empty if nothing was ever displayed
    pub async fn session(&self) -> Result<SessionState> {
        Ok(self
            .store
            .get::<SessionState>(SESSION_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_session(&self, session: &SessionState) -> Result<()> {
        self.store.put(SESSION_KEY, session).await?;
        Ok(())
    }
}

#[async_trait]
impl PermissionSource for Preferences {
    async fn permission(&self) -> Result<Permission> {
        self.notification_permission().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use tempfile::TempDir;

    fn preferences(dir: &TempDir) -> Preferences {
        Preferences::new(Arc::new(Store::open(dir.path(), "preferences").unwrap()))
    }

    #[tokio::test]
    async fn test_theme_defaults_to_light() {
        let dir = TempDir::new().unwrap();
        assert_eq!(preferences(&dir).theme().await.unwrap(), Theme::Light);
    }

    #[tokio::test]
    async fn test_toggle_theme_persists() {
        let dir = TempDir::new().unwrap();
        let preferences = preferences(&dir);

        assert_eq!(preferences.toggle_theme().await.unwrap(), Theme::Dark);
        assert_eq!(preferences.theme().await.unwrap(), Theme::Dark);
        assert_eq!(preferences.toggle_theme().await.unwrap(), Theme::Light);
    }

    #[tokio::test]
    async fn test_permission_round_trip() {
        let dir = TempDir::new().unwrap();
        let preferences = preferences(&dir);

        assert_eq!(preferences.permission().await.unwrap(), Permission::Default);
        preferences
            .set_notification_permission(Permission::Denied)
            .await
            .unwrap();
        assert_eq!(preferences.permission().await.unwrap(), Permission::Denied);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let dir = TempDir::new().unwrap();
        let preferences = preferences(&dir);
        assert!(preferences.session().await.unwrap().current.is_none());

        let session = SessionState::default().commit(Location::new("Oslo, Norway", 59.91, 10.75));
        preferences.save_session(&session).await.unwrap();
        assert_eq!(preferences.session().await.unwrap(), session);
    }

    #[test]
    fn test_theme_parsing() {
        assert_eq!("DARK".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }
}
