//! `meteo` - weather lookup with rain and temperature alerts
//!
//! This library geocodes city names, fetches current conditions and the
//! hourly forecast, checks the next hours against alert thresholds and
//! delivers the resulting notifications through the best available channel.
//! It also keeps favorites and preferences, and serves the web shell from an
//! offline snapshot.

pub mod alerts;
pub mod app;
pub mod assets;
pub mod cli;
pub mod config;
pub mod error;
pub mod favorites;
pub mod models;
pub mod notify;
pub mod preferences;
pub mod render;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use alerts::{AlertFinding, AlertKind, AlertRules, evaluate};
pub use app::{MeteoApp, NotificationStatus, SearchOutcome};
pub use assets::{AssetCache, AssetRouter};
pub use config::MeteoConfig;
pub use error::MeteoError;
pub use models::{ForecastPoint, Location, WeatherReport};
pub use notify::{Delivery, Dispatcher, NotificationRequest, Permission};
pub use preferences::Theme;
pub use weather::{Geocoder, OpenMeteoClient, WeatherSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, MeteoError>;
