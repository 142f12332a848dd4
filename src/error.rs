//! Error types and handling for the meteo application

use thiserror::Error;

/// Main error type for the meteo application
#[derive(Error, Debug)]
pub enum MeteoError {
    /// The geocoder returned no match for a query
    #[error("Location not found: {query}")]
    NotFound { query: String },

    /// A network call was rejected or answered with a non-success status
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// Notification permission was refused
    #[error("Notification permission denied")]
    PermissionDenied,

    /// Notifications are not available on this platform
    #[error("Notifications are not supported on this platform")]
    Unsupported,

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Local key-value store errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MeteoError {
    /// Create a new not-found error for a geocoding query
    pub fn not_found<S: Into<String>>(query: S) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            MeteoError::NotFound { query } => {
                format!("City \"{query}\" not found. Check the spelling.")
            }
            MeteoError::Transport { message } => message.clone(),
            MeteoError::PermissionDenied => {
                "Notifications are blocked. Re-enable them with `meteo notifications reset`."
                    .to_string()
            }
            MeteoError::Unsupported => {
                "Notifications are not supported on this platform.".to_string()
            }
            MeteoError::Validation { message } => message.clone(),
            MeteoError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            MeteoError::Storage { .. } => {
                "Local storage failed. You may need to clear the meteo data directory.".to_string()
            }
            MeteoError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for MeteoError {
    fn from(err: reqwest::Error) -> Self {
        MeteoError::transport(format!("Network error: {err}"))
    }
}

impl From<anyhow::Error> for MeteoError {
    fn from(err: anyhow::Error) -> Self {
        MeteoError::storage(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let not_found = MeteoError::not_found("Atlantis");
        assert!(matches!(not_found, MeteoError::NotFound { .. }));

        let transport = MeteoError::transport("connection refused");
        assert!(matches!(transport, MeteoError::Transport { .. }));

        let validation = MeteoError::validation("empty");
        assert!(matches!(validation, MeteoError::Validation { .. }));
    }

    #[test]
    fn test_user_messages() {
        let not_found = MeteoError::not_found("Atlantis");
        assert!(not_found.user_message().contains("\"Atlantis\" not found"));

        let transport = MeteoError::transport("Weather request failed with status 500");
        assert_eq!(
            transport.user_message(),
            "Weather request failed with status 500"
        );

        assert!(MeteoError::PermissionDenied.user_message().contains("blocked"));
        assert!(MeteoError::Unsupported.user_message().contains("not supported"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MeteoError = io_err.into();
        assert!(matches!(err, MeteoError::Io { .. }));
    }

    #[test]
    fn test_anyhow_maps_to_storage() {
        let err: MeteoError = anyhow::anyhow!("keyspace closed").into();
        assert!(matches!(err, MeteoError::Storage { .. }));
    }
}
