//! Configuration management for the meteo application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::MeteoError;
use ::config::{Config, Environment, File};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the meteo application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeteoConfig {
    /// Geocoding and forecast API settings
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Alert thresholds
    #[serde(default)]
    pub alerts: AlertsConfig,
    /// Notification delivery settings
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Offline shell cache settings
    #[serde(default)]
    pub assets: AssetsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the geocoding API
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,
    /// Base URL of the forecast API
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,
    /// Language used for geocoding results
    #[serde(default = "default_language")]
    pub language: String,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Alert evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Number of upcoming hours scanned for alerts
    #[serde(default = "default_lookahead_hours")]
    pub lookahead_hours: u32,
    /// Temperature in Celsius that must be strictly exceeded
    #[serde(default = "default_temperature_threshold")]
    pub temperature_threshold_c: f64,
    /// WMO weather codes treated as precipitation
    #[serde(default = "default_rain_codes")]
    pub rain_codes: Vec<i32>,
}

/// Notification delivery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Allow desktop notifications
    #[serde(default = "default_desktop_notifications")]
    pub desktop: bool,
    /// Application name shown by the notification daemon
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Seconds an in-terminal banner stays visible
    #[serde(default = "default_banner_visible_secs")]
    pub banner_visible_secs: u64,
    /// Milliseconds of the banner removal transition
    #[serde(default = "default_banner_transition_ms")]
    pub banner_transition_ms: u64,
    /// Optional SMTP relay used as the background delivery agent
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// SMTP relay settings for background delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host
    pub relay: String,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// SMTP username
    pub username: String,
    /// Environment variable holding the SMTP password
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

/// Local storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the preference and asset stores
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

/// Offline shell cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Snapshot name; bump it to invalidate older snapshots
    #[serde(default = "default_assets_version")]
    pub version: String,
    /// Origin serving the static shell
    #[serde(default = "default_assets_origin")]
    pub origin: String,
    /// Path of the shell document served to offline navigations
    #[serde(default = "default_root_document")]
    pub root_document: String,
    /// Paths cached at install time
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,
    /// Host fragments that are always sent to the network
    #[serde(default = "default_network_only_hosts")]
    pub network_only_hosts: Vec<String>,
    /// Address `meteo serve` listens on
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_forecast_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_user_agent() -> String {
    format!("meteo/{}", env!("CARGO_PKG_VERSION"))
}

fn default_lookahead_hours() -> u32 {
    4
}

fn default_temperature_threshold() -> f64 {
    10.0
}

fn default_rain_codes() -> Vec<i32> {
    vec![
        51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 71, 73, 75, 77, 80, 81, 82, 85, 86, 95, 96, 99,
    ]
}

fn default_desktop_notifications() -> bool {
    true
}

fn default_app_name() -> String {
    "Meteo".to_string()
}

fn default_banner_visible_secs() -> u64 {
    5
}

fn default_banner_transition_ms() -> u64 {
    300
}

fn default_password_env() -> String {
    "METEO_SMTP_PASSWORD".to_string()
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("meteo"))
        .unwrap_or_else(|| PathBuf::from(".meteo"))
        .to_string_lossy()
        .into_owned()
}

fn default_assets_version() -> String {
    "meteo-pwa-v1".to_string()
}

fn default_assets_origin() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_root_document() -> String {
    "/Meteo/index.html".to_string()
}

fn default_manifest() -> Vec<String> {
    [
        "/Meteo/",
        "/Meteo/index.html",
        "/Meteo/style.css",
        "/Meteo/app.js",
        "/Meteo/manifest.json",
        "/Meteo/icons/icon-72.png",
        "/Meteo/icons/icon-96.png",
        "/Meteo/icons/icon-128.png",
        "/Meteo/icons/icon-144.png",
        "/Meteo/icons/icon-152.png",
        "/Meteo/icons/icon-192.png",
        "/Meteo/icons/icon-384.png",
        "/Meteo/icons/icon-512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_network_only_hosts() -> Vec<String> {
    vec!["open-meteo.com".to_string(), "geocoding-api".to_string()]
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_base_url: default_geocoding_base_url(),
            forecast_base_url: default_forecast_base_url(),
            language: default_language(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            lookahead_hours: default_lookahead_hours(),
            temperature_threshold_c: default_temperature_threshold(),
            rain_codes: default_rain_codes(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            desktop: default_desktop_notifications(),
            app_name: default_app_name(),
            banner_visible_secs: default_banner_visible_secs(),
            banner_transition_ms: default_banner_transition_ms(),
            email: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            version: default_assets_version(),
            origin: default_assets_origin(),
            root_document: default_root_document(),
            manifest: default_manifest(),
            network_only_hosts: default_network_only_hosts(),
            listen: default_listen(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl StorageConfig {
    /// Directory of the preferences keyspace
    #[must_use]
    pub fn preferences_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("preferences")
    }

    /// Directory of the offline asset keyspace
    #[must_use]
    pub fn assets_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("assets")
    }
}

impl MeteoConfig {
    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(::config::FileFormat::Toml),
            );
        }

        // METEO_ALERTS__TEMPERATURE_THRESHOLD_C=15 style overrides
        builder = builder.add_source(
            Environment::with_prefix("METEO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: MeteoConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("meteo").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.geocoding_base_url.is_empty() {
            self.weather.geocoding_base_url = default_geocoding_base_url();
        }
        if self.weather.forecast_base_url.is_empty() {
            self.weather.forecast_base_url = default_forecast_base_url();
        }
        if self.weather.language.is_empty() {
            self.weather.language = default_language();
        }
        if self.weather.user_agent.is_empty() {
            self.weather.user_agent = default_user_agent();
        }
        if self.alerts.lookahead_hours == 0 {
            self.alerts.lookahead_hours = default_lookahead_hours();
        }
        if self.notifications.banner_visible_secs == 0 {
            self.notifications.banner_visible_secs = default_banner_visible_secs();
        }
        if self.storage.data_dir.is_empty() {
            self.storage.data_dir = default_data_dir();
        }
        if self.assets.version.is_empty() {
            self.assets.version = default_assets_version();
        }
        if self.assets.root_document.is_empty() {
            self.assets.root_document = default_root_document();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.alerts.lookahead_hours > 24 {
            return Err(
                MeteoError::config("Alert lookahead cannot exceed 24 hours").into(),
            );
        }

        let threshold = self.alerts.temperature_threshold_c;
        if !threshold.is_finite() || !(-90.0..=60.0).contains(&threshold) {
            return Err(MeteoError::config(
                "Temperature threshold must be between -90 and 60 °C",
            )
            .into());
        }

        if self.notifications.banner_visible_secs > 60 {
            return Err(
                MeteoError::config("Banner visibility cannot exceed 60 seconds").into(),
            );
        }

        if self.notifications.banner_transition_ms > 5_000 {
            return Err(MeteoError::config(
                "Banner transition cannot exceed 5000 milliseconds",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(MeteoError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(MeteoError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("Geocoding", &self.weather.geocoding_base_url),
            ("Forecast", &self.weather.forecast_base_url),
            ("Asset origin", &self.assets.origin),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(MeteoError::config(format!(
                    "{name} URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if self.assets.manifest.is_empty() {
            return Err(MeteoError::config("Asset manifest cannot be empty").into());
        }

        if !self.assets.root_document.starts_with('/') {
            return Err(
                MeteoError::config("Asset root document must be an absolute path").into(),
            );
        }

        if let Some(email) = &self.notifications.email {
            if email.relay.is_empty() || email.to.is_empty() || email.from.is_empty() {
                return Err(MeteoError::config(
                    "Email notifications need a relay, a sender and a recipient",
                )
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MeteoConfig::default();
        assert_eq!(
            config.weather.geocoding_base_url,
            "https://geocoding-api.open-meteo.com/v1"
        );
        assert_eq!(config.weather.forecast_base_url, "https://api.open-meteo.com/v1");
        assert_eq!(config.alerts.lookahead_hours, 4);
        assert_eq!(config.alerts.temperature_threshold_c, 10.0);
        assert!(config.alerts.rain_codes.contains(&61));
        assert!(!config.alerts.rain_codes.contains(&3));
        assert_eq!(config.notifications.banner_visible_secs, 5);
        assert_eq!(config.notifications.banner_transition_ms, 300);
        assert_eq!(config.assets.version, "meteo-pwa-v1");
        assert_eq!(config.assets.manifest.len(), 13);
        assert_eq!(config.logging.level, "info");
        assert!(config.notifications.email.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = MeteoConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = MeteoConfig::default();
        config.alerts.lookahead_hours = 48;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("lookahead cannot exceed"));

        let mut config = MeteoConfig::default();
        config.alerts.temperature_threshold_c = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_urls() {
        let mut config = MeteoConfig::default();
        config.assets.origin = "ftp://example.org".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Asset origin URL"));
    }

    #[test]
    fn test_apply_defaults_fills_blanks() {
        let mut config = MeteoConfig::default();
        config.alerts.lookahead_hours = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.alerts.lookahead_hours, 4);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[alerts]\ntemperature_threshold_c = 25.0\nlookahead_hours = 6\n\n[weather]\nlanguage = \"fr\""
        )
        .unwrap();

        let config = MeteoConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.alerts.temperature_threshold_c, 25.0);
        assert_eq!(config.alerts.lookahead_hours, 6);
        assert_eq!(config.weather.language, "fr");
        assert_eq!(config.assets.version, "meteo-pwa-v1");
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = MeteoConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("meteo"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
