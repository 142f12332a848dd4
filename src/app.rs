//! Search pipeline and the user-facing operations built on it
//!
//! Every error is shown on the view's error line where it happens and then
//! returned, so callers only decide the exit status.

use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::alerts::{self, AlertFinding, AlertRules};
use crate::favorites::Favorites;
use crate::models::{Location, WeatherReport};
use crate::notify::{Delivery, Dispatcher, Permission};
use crate::preferences::{Preferences, Theme};
use crate::render::{WeatherView, format_search_message};
use crate::session::{SearchFlow, SearchPhase, SessionCell, SessionState};
use crate::weather::{Geocoder, WeatherSource};
use crate::{MeteoError, Result};

const EMPTY_QUERY_MESSAGE: &str = "Please enter a city name.";
const WELCOME_MESSAGE: &str = "Notifications are now enabled! 🎉";

/// Result of a search that reached the display
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub location: Location,
    pub report: WeatherReport,
    pub findings: Vec<AlertFinding>,
    /// Category and channel of every notification sent, in order
    pub deliveries: Vec<(String, Delivery)>,
}

/// Notification availability as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Unsupported,
    Permission(Permission),
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStatus::Unsupported => f.write_str("unsupported"),
            NotificationStatus::Permission(permission) => write!(f, "{permission}"),
        }
    }
}

pub struct MeteoApp {
    geocoder: Arc<dyn Geocoder>,
    weather: Arc<dyn WeatherSource>,
    view: Arc<dyn WeatherView>,
    dispatcher: Dispatcher,
    preferences: Preferences,
    favorites: Favorites,
    session: SessionCell,
    rules: AlertRules,
    app_name: String,
}

impl MeteoApp {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        weather: Arc<dyn WeatherSource>,
        view: Arc<dyn WeatherView>,
        dispatcher: Dispatcher,
        preferences: Preferences,
        favorites: Favorites,
    ) -> Self {
        Self {
            geocoder,
            weather,
            view,
            dispatcher,
            preferences,
            favorites,
            session: SessionCell::default(),
            rules: AlertRules::default(),
            app_name: "Meteo".to_string(),
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: AlertRules) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Restore the last committed session from preferences
    pub async fn restore_session(&self) -> Result<()> {
        let saved = self.preferences.session().await?;
        self.session.replace(saved);
        Ok(())
    }

    #[must_use]
    pub fn session(&self) -> SessionState {
        self.session.snapshot()
    }

    fn fail<T>(&self, error: MeteoError) -> Result<T> {
        self.view.show_error(&error.user_message());
        Err(error)
    }

    /// Geocode `query`, then fetch and display its weather
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return self.fail(MeteoError::validation(EMPTY_QUERY_MESSAGE));
        }

        let mut flow = SearchFlow::start();
        self.view.show_loading();
        self.view.hide_error();
        flow.advance(SearchPhase::Geocoding);

        let location = match self.geocoder.geocode(query).await {
            Ok(Some(place)) => Location::from(place),
            Ok(None) => return self.abort(flow, MeteoError::not_found(query)),
            Err(e) => return self.abort(flow, e),
        };

        self.fetch_and_display(location, flow).await
    }

    /// Fetch and display a known location, skipping geocoding
    pub async fn show_location(&self, location: Location) -> Result<SearchOutcome> {
        self.fetch_and_display(location, SearchFlow::start()).await
    }

    /// Show the favorite with exactly this name
    pub async fn show_favorite(&self, name: &str) -> Result<SearchOutcome> {
        match self.favorites.get(name).await.or_else(|e| self.fail(e))? {
            Some(location) => self.show_location(location).await,
            None => self.fail(MeteoError::validation(format!(
                "No favorite named \"{name}\"."
            ))),
        }
    }

    fn abort<T>(&self, mut flow: SearchFlow, error: MeteoError) -> Result<T> {
        warn!(search = flow.id(), "Search failed: {}", error);
        flow.advance(SearchPhase::Failed);
        self.view.hide_loading();
        self.fail(error)
    }

    #[instrument(skip(self, flow), fields(search = flow.id(), location = %location.display_name))]
    async fn fetch_and_display(
        &self,
        location: Location,
        mut flow: SearchFlow,
    ) -> Result<SearchOutcome> {
        self.view.show_loading();
        self.view.hide_error();
        flow.advance(SearchPhase::FetchingWeather);

        let report = match self
            .weather
            .forecast(location.latitude, location.longitude)
            .await
        {
            Ok(report) => report,
            Err(e) => return self.abort(flow, e),
        };

        let committed = self.session.commit(location.clone());
        if let Err(e) = self.preferences.save_session(&committed).await {
            warn!("Could not persist session: {}", e);
        }

        self.view.display_weather(&location, &report);
        flow.advance(SearchPhase::Displayed);

        let mut deliveries = Vec::new();
        let delivery = self
            .dispatcher
            .dispatch(&location.display_name, &format_search_message(&report), "search")
            .await;
        deliveries.push(("search".to_string(), delivery));

        let findings = alerts::evaluate(&report.hourly, report.current_hour(), &self.rules);
        if findings.is_empty() {
            info!("No alerts for {}", location.display_name);
        }
        for finding in &findings {
            let category = finding.kind.category();
            let delivery = self
                .dispatcher
                .dispatch(
                    &location.display_name,
                    &finding.message(&self.rules),
                    category,
                )
                .await;
            deliveries.push((category.to_string(), delivery));
        }

        self.view.hide_loading();

        Ok(SearchOutcome {
            location,
            report,
            findings,
            deliveries,
        })
    }

    pub async fn list_favorites(&self) -> Result<Vec<Location>> {
        let favorites = self.favorites.list().await.or_else(|e| self.fail(e))?;
        self.view.show_favorites(&favorites);
        Ok(favorites)
    }

    /// Save the location on display. Returns `false` if it was already saved.
    pub async fn add_current_favorite(&self) -> Result<bool> {
        let Some(location) = self.session.snapshot().current else {
            return self.fail(MeteoError::validation("Search for a city first."));
        };

        let added = self
            .favorites
            .add(&location)
            .await
            .or_else(|e| self.fail(e))?;
        if added {
            self.view
                .show_info(&format!("⭐ Added {} to favorites", location.display_name));
        } else {
            self.view
                .show_info(&format!("{} is already a favorite", location.display_name));
        }
        Ok(added)
    }

    pub async fn remove_favorite(&self, name: &str) -> Result<bool> {
        let removed = self
            .favorites
            .remove(name)
            .await
            .or_else(|e| self.fail(e))?;
        if removed {
            self.view.show_info(&format!("🗑️ Removed {name} from favorites"));
        }
        Ok(removed)
    }

    pub async fn theme(&self) -> Result<Theme> {
        self.preferences.theme().await.or_else(|e| self.fail(e))
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<Theme> {
        self.preferences
            .set_theme(theme)
            .await
            .or_else(|e| self.fail(e))?;
        Ok(theme)
    }

    pub async fn toggle_theme(&self) -> Result<Theme> {
        self.preferences.toggle_theme().await.or_else(|e| self.fail(e))
    }

    pub async fn notification_status(&self) -> Result<NotificationStatus> {
        if !self.dispatcher.is_supported() {
            return Ok(NotificationStatus::Unsupported);
        }
        let permission = self
            .preferences
            .notification_permission()
            .await
            .or_else(|e| self.fail(e))?;
        Ok(NotificationStatus::Permission(permission))
    }

    /// Grant permission and send the welcome notification
    pub async fn enable_notifications(&self) -> Result<Delivery> {
        if !self.dispatcher.is_supported() {
            return self.fail(MeteoError::Unsupported);
        }
        let permission = self
            .preferences
            .notification_permission()
            .await
            .or_else(|e| self.fail(e))?;
        if permission == Permission::Denied {
            return self.fail(MeteoError::PermissionDenied);
        }

        self.preferences
            .set_notification_permission(Permission::Granted)
            .await
            .or_else(|e| self.fail(e))?;
        let delivery = self
            .dispatcher
            .dispatch(&self.app_name, WELCOME_MESSAGE, "welcome")
            .await;
        self.view.show_info("✅ Test notification sent!");
        Ok(delivery)
    }

    pub async fn block_notifications(&self) -> Result<()> {
        self.preferences
            .set_notification_permission(Permission::Denied)
            .await
            .or_else(|e| self.fail(e))
    }

    pub async fn reset_notifications(&self) -> Result<()> {
        self.preferences
            .set_notification_permission(Permission::Default)
            .await
            .or_else(|e| self.fail(e))
    }
}
