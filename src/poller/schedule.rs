//! Progressive refetch interval policy.

use crate::error::{CounterError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One step of the schedule: while elapsed session time is below `until`,
/// fetch every `every`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalTier {
    #[serde(with = "secs")]
    pub until: Duration,
    #[serde(with = "secs")]
    pub every: Duration,
}

/// Maps elapsed session time to the delay before the next fetch.
///
/// Tiers are checked in order with a strict less-than on `until`; once every
/// tier has been outgrown, `otherwise` applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalPolicy {
    pub tiers: Vec<IntervalTier>,
    #[serde(with = "secs")]
    pub otherwise: Duration,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
            .with_tier(Duration::from_secs(15), Duration::from_secs(1))
            .with_tier(Duration::from_secs(5 * 60), Duration::from_secs(5))
            .with_tier(Duration::from_secs(60 * 60), Duration::from_secs(60))
            .with_tier(Duration::from_secs(5 * 60 * 60), Duration::from_secs(15 * 60))
    }
}

impl IntervalPolicy {
    /// Create a policy with no tiers that always waits `otherwise`.
    pub fn new(otherwise: Duration) -> Self {
        Self {
            tiers: Vec::new(),
            otherwise,
        }
    }

    /// Append a tier. Tiers must be added in ascending `until` order.
    pub fn with_tier(mut self, until: Duration, every: Duration) -> Self {
        self.tiers.push(IntervalTier { until, every });
        self
    }

    /// Interval to wait given how long the session has been running.
    pub fn interval_for(&self, elapsed: Duration) -> Duration {
        self.tiers
            .iter()
            .find(|tier| elapsed < tier.until)
            .map(|tier| tier.every)
            .unwrap_or(self.otherwise)
    }

    /// Check that tiers ascend, intervals are non-zero and never shrink.
    pub fn validate(&self) -> Result<()> {
        let mut previous: Option<&IntervalTier> = None;
        for tier in &self.tiers {
            if tier.every.is_zero() {
                return Err(CounterError::config_error(
                    "Interval tiers must have a non-zero interval",
                ));
            }
            if let Some(prev) = previous {
                if tier.until <= prev.until {
                    return Err(CounterError::config_error(format!(
                        "Interval tier boundaries must ascend ({:?} after {:?})",
                        tier.until, prev.until
                    )));
                }
                if tier.every < prev.every {
                    return Err(CounterError::config_error(format!(
                        "Interval tiers must not shrink ({:?} after {:?})",
                        tier.every, prev.every
                    )));
                }
            }
            previous = Some(tier);
        }
        if self.otherwise.is_zero() {
            return Err(CounterError::config_error(
                "Final interval must be non-zero",
            ));
        }
        if let Some(last) = previous {
            if self.otherwise < last.every {
                return Err(CounterError::config_error(
                    "Final interval must not be shorter than the last tier",
                ));
            }
        }
        Ok(())
    }
}

/// Durations are configured as fractional seconds.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_default_tiers() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.interval_for(secs(0.0)), secs(1.0));
        assert_eq!(policy.interval_for(secs(14.999)), secs(1.0));
        assert_eq!(policy.interval_for(secs(15.0)), secs(5.0));
        assert_eq!(policy.interval_for(secs(299.9)), secs(5.0));
        assert_eq!(policy.interval_for(secs(300.0)), secs(60.0));
        assert_eq!(policy.interval_for(secs(3599.0)), secs(60.0));
        assert_eq!(policy.interval_for(secs(3600.0)), secs(900.0));
        assert_eq!(policy.interval_for(secs(17999.0)), secs(900.0));
        assert_eq!(policy.interval_for(secs(18000.0)), secs(3600.0));
        assert_eq!(policy.interval_for(secs(1_000_000.0)), secs(3600.0));
    }

    #[test]
    fn test_interval_never_decreases() {
        let policy = IntervalPolicy::default();
        let mut previous = Duration::ZERO;
        for step in 0..40_000u64 {
            let current = policy.interval_for(Duration::from_millis(step * 500));
            assert!(current >= previous, "interval shrank at step {}", step);
            previous = current;
        }
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert!(IntervalPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unordered_tiers() {
        let policy = IntervalPolicy::new(secs(60.0))
            .with_tier(secs(30.0), secs(1.0))
            .with_tier(secs(10.0), secs(5.0));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let policy = IntervalPolicy::new(secs(60.0)).with_tier(secs(30.0), Duration::ZERO);
        assert!(policy.validate().is_err());
        assert!(IntervalPolicy::new(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_policy_from_json() {
        let json = r#"{"tiers":[{"until":10,"every":0.5}],"otherwise":2}"#;
        let policy: IntervalPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.interval_for(secs(3.0)), secs(0.5));
        assert_eq!(policy.interval_for(secs(10.0)), secs(2.0));
    }
}
