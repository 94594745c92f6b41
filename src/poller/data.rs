//! Data structures shared between the poller and its consumers.

use crate::error::CounterError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::time::Instant;

/// The series being sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Current world population
    #[default]
    Population,
    /// U.S. national debt in dollars
    Debt,
}

impl Category {
    /// Wire name of the category (`"population"` / `"debt"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Population => "population",
            Category::Debt => "debt",
        }
    }

    /// Human readable label used by the display.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Population => "World Population",
            Category::Debt => "National Debt",
        }
    }

    /// The other category.
    pub fn toggled(&self) -> Self {
        match self {
            Category::Population => Category::Debt,
            Category::Debt => Category::Population,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "population" => Ok(Category::Population),
            "debt" => Ok(Category::Debt),
            other => Err(CounterError::config_error(format!(
                "Unknown category '{}', expected 'population' or 'debt'",
                other
            ))),
        }
    }
}

/// One accepted sample and the instant it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub taken_at: Instant,
}

impl Sample {
    pub fn new(value: f64, taken_at: Instant) -> Self {
        Self { value, taken_at }
    }

    /// Per-second rate of change from `previous` to `self`.
    ///
    /// Returns `None` when no time has passed between the two samples or the
    /// result is not finite.
    pub fn rate_since(&self, previous: &Sample) -> Option<f64> {
        let elapsed = self
            .taken_at
            .checked_duration_since(previous.taken_at)?
            .as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let rate = (self.value - previous.value) / elapsed;
        rate.is_finite().then_some(rate)
    }
}

/// Failure record delivered through the error callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchError {
    /// What went wrong, as reported by the sample source
    pub message: String,
    /// When the failure was observed (ISO-8601 on the wire)
    pub timestamp: DateTime<Utc>,
    /// The category that was being sampled
    pub category: Category,
}

impl FetchError {
    /// Build a failure record stamped with the current time.
    pub fn new(message: impl Into<String>, category: Category) -> Self {
        let message = message.into();
        Self {
            message: if message.is_empty() {
                "Unknown error".to_string()
            } else {
                message
            },
            timestamp: Utc::now(),
            category,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} for {}",
            self.message,
            self.timestamp.to_rfc3339(),
            self.category
        )
    }
}

/// Everything the poller can report, as a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum PollerEvent {
    Data(f64),
    Error(FetchError),
    Rate(f64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_category_parsing() {
        assert_eq!("population".parse::<Category>().unwrap(), Category::Population);
        assert_eq!(" Debt ".parse::<Category>().unwrap(), Category::Debt);
        assert!("gdp".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_toggle() {
        assert_eq!(Category::Population.toggled(), Category::Debt);
        assert_eq!(Category::Debt.toggled(), Category::Population);
    }

    #[test]
    fn test_rate_between_samples() {
        let t0 = Instant::now();
        let first = Sample::new(100.0, t0);
        let second = Sample::new(110.0, t0 + Duration::from_secs(2));
        assert_eq!(second.rate_since(&first), Some(5.0));
    }

    #[test]
    fn test_rate_zero_elapsed_is_skipped() {
        let t0 = Instant::now();
        let first = Sample::new(100.0, t0);
        let second = Sample::new(110.0, t0);
        assert_eq!(second.rate_since(&first), None);
    }

    #[test]
    fn test_fetch_error_serializes_iso_timestamp() {
        let error = FetchError::new("timeout", Category::Debt);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["category"], "debt");
        assert_eq!(json["message"], "timeout");
        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_fetch_error_never_has_empty_message() {
        let error = FetchError::new("", Category::Population);
        assert_eq!(error.message, "Unknown error");
    }
}
