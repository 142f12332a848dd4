//! Desktop notifications through the platform notification service

use notify_rust::Notification;
use tracing::debug;

use super::{ForegroundNotifier, NotificationRequest};
use crate::config::NotificationsConfig;
use crate::{MeteoError, Result};

/// Foreground channel backed by `notify-rust`
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    enabled: bool,
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(config: &NotificationsConfig) -> Self {
        Self {
            enabled: config.desktop,
            app_name: config.app_name.clone(),
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn has_session() -> bool {
        ["DISPLAY", "WAYLAND_DISPLAY", "DBUS_SESSION_BUS_ADDRESS"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn has_session() -> bool {
        true
    }
}

impl ForegroundNotifier for DesktopNotifier {
    fn is_supported(&self) -> bool {
        self.enabled && Self::has_session()
    }

    fn show(&self, request: &NotificationRequest) -> Result<()> {
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(&request.title)
            .body(&request.body);

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.hint(notify_rust::Hint::Category(request.category.clone()));

        notification
            .show()
            .map_err(|e| MeteoError::transport(format!("Desktop notification failed: {e}")))?;

        debug!("Desktop notification shown: {}", request.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_notifier_is_unsupported() {
        let config = NotificationsConfig {
            desktop: false,
            ..NotificationsConfig::default()
        };
        assert!(!DesktopNotifier::new(&config).is_supported());
    }
}
