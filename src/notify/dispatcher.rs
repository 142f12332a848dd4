//! Channel selection and fallback

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::{
    BackgroundAgent, BannerSurface, ForegroundNotifier, NotificationRequest, Permission,
    PermissionSource,
};

/// Channel chosen for one dispatch, resolved before anything is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// No notification capability on this host
    Unsupported,
    /// Capability present but the user has not granted it
    NotPermitted(Permission),
    Background,
    Foreground,
}

/// Channel that actually delivered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Background,
    Foreground,
    Banner,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Delivery::Background => "background",
            Delivery::Foreground => "foreground",
            Delivery::Banner => "banner",
        };
        f.write_str(name)
    }
}

/// Sends notifications through the best available channel
#[derive(Clone)]
pub struct Dispatcher {
    permissions: Arc<dyn PermissionSource>,
    background: Option<Arc<dyn BackgroundAgent>>,
    foreground: Arc<dyn ForegroundNotifier>,
    banner: Arc<dyn BannerSurface>,
}

impl Dispatcher {
    pub fn new(
        permissions: Arc<dyn PermissionSource>,
        background: Option<Arc<dyn BackgroundAgent>>,
        foreground: Arc<dyn ForegroundNotifier>,
        banner: Arc<dyn BannerSurface>,
    ) -> Self {
        Self {
            permissions,
            background,
            foreground,
            banner,
        }
    }

    fn controlling_agent(&self) -> Option<&Arc<dyn BackgroundAgent>> {
        self.background
            .as_ref()
            .filter(|agent| agent.is_controlling())
    }

    /// Whether any system notification channel exists on this host
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.foreground.is_supported() || self.controlling_agent().is_some()
    }

    /// Resolve the channel for the next dispatch
    pub async fn route(&self) -> Route {
        if !self.is_supported() {
            return Route::Unsupported;
        }

        let permission = match self.permissions.permission().await {
            Ok(permission) => permission,
            Err(e) => {
                warn!("Could not read notification permission: {}", e);
                Permission::Default
            }
        };

        match permission {
            Permission::Granted if self.controlling_agent().is_some() => Route::Background,
            Permission::Granted => Route::Foreground,
            other => Route::NotPermitted(other),
        }
    }

    /// Deliver `message` about `location`. Never fails; every failure ends
    /// on the banner.
    #[instrument(skip(self, message))]
    pub async fn dispatch(&self, location: &str, message: &str, category: &str) -> Delivery {
        let request = NotificationRequest::new(location, message, category);
        let route = self.route().await;
        debug!("Resolved notification route: {:?}", route);

        match route {
            Route::Unsupported | Route::NotPermitted(_) => self.show_banner(&request),
            Route::Background => {
                let Some(agent) = self.controlling_agent() else {
                    return self.show_banner(&request);
                };
                match agent.show_notification(&request).await {
                    Ok(()) => {
                        info!("Delivered '{}' notification in background", category);
                        Delivery::Background
                    }
                    Err(e) => {
                        warn!("Background notification failed: {}", e);
                        self.show_banner(&request)
                    }
                }
            }
            Route::Foreground => match self.foreground.show(&request) {
                Ok(()) => {
                    info!("Delivered '{}' notification on the desktop", category);
                    Delivery::Foreground
                }
                Err(e) => {
                    warn!("Desktop notification failed: {}", e);
                    self.show_banner(&request)
                }
            },
        }
    }

    fn show_banner(&self, request: &NotificationRequest) -> Delivery {
        self.banner.show(request);
        Delivery::Banner
    }
}
