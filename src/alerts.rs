//! Threshold alerts over the next few forecast hours.
//!
//! The evaluator walks lead hours `1..=lookahead` after the current hour and
//! reports the earliest rain hour and the earliest hour above the temperature
//! threshold. Both findings are independent of each other.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::AlertsConfig;
use crate::models::ForecastPoint;

/// Thresholds the evaluator checks against
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRules {
    /// Number of upcoming hours scanned
    pub lookahead_hours: u32,
    /// Weather codes that count as precipitation
    pub rain_codes: HashSet<i32>,
    /// Temperature that must be strictly exceeded, in Celsius
    pub temp_threshold: f64,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self::from(&AlertsConfig::default())
    }
}

impl From<&AlertsConfig> for AlertRules {
    fn from(config: &AlertsConfig) -> Self {
        Self {
            lookahead_hours: config.lookahead_hours,
            rain_codes: config.rain_codes.iter().copied().collect(),
            temp_threshold: config.temperature_threshold_c,
        }
    }
}

impl AlertRules {
    #[must_use]
    pub fn is_rain(&self, point: &ForecastPoint) -> bool {
        self.rain_codes.contains(&point.weather_code)
    }

    #[must_use]
    pub fn is_high_temp(&self, point: &ForecastPoint) -> bool {
        point.temperature_c > self.temp_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Rain,
    HighTemp,
}

impl AlertKind {
    /// Notification category used for grouping on the receiving side
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            AlertKind::Rain => "rain",
            AlertKind::HighTemp => "temp",
        }
    }
}

/// One triggered alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertFinding {
    pub kind: AlertKind,
    /// Hours from now, within `1..=lookahead_hours`
    pub lead_hours: u32,
    /// Forecast temperature for high-temperature findings
    pub value: Option<f64>,
}

impl AlertFinding {
    /// Message body shown to the user
    #[must_use]
    pub fn message(&self, rules: &AlertRules) -> String {
        match self.kind {
            AlertKind::Rain => {
                let plural = if self.lead_hours > 1 { "s" } else { "" };
                format!("🌧️ Rain expected in {} hour{plural}!", self.lead_hours)
            }
            AlertKind::HighTemp => format!(
                "🌡️ Temperature above {}°C expected ({}°C)",
                rules.temp_threshold,
                self.value.unwrap_or(rules.temp_threshold).round()
            ),
        }
    }
}

/// Scan the lookahead window of `forecast` starting after `current_hour`.
///
/// Lead hours whose index falls past the end of the series are skipped.
/// Returns at most one rain finding followed by at most one high-temperature
/// finding.
#[must_use]
pub fn evaluate(
    forecast: &[ForecastPoint],
    current_hour: usize,
    rules: &AlertRules,
) -> Vec<AlertFinding> {
    let mut rain: Option<AlertFinding> = None;
    let mut high_temp: Option<AlertFinding> = None;

    for lead in 1..=rules.lookahead_hours {
        let Some(point) = current_hour
            .checked_add(lead as usize)
            .and_then(|index| forecast.get(index))
        else {
            continue;
        };

        tracing::trace!(
            lead,
            code = point.weather_code,
            temperature = point.temperature_c,
            "Scanning forecast hour"
        );

        if rain.is_none() && rules.is_rain(point) {
            rain = Some(AlertFinding {
                kind: AlertKind::Rain,
                lead_hours: lead,
                value: None,
            });
        }

        if high_temp.is_none() && rules.is_high_temp(point) {
            high_temp = Some(AlertFinding {
                kind: AlertKind::HighTemp,
                lead_hours: lead,
                value: Some(point.temperature_c),
            });
        }

        if rain.is_some() && high_temp.is_some() {
            break;
        }
    }

    rain.into_iter().chain(high_temp).collect()
}
