//! Dashboard server configuration.

use crate::error::Result;
use crate::poller::IntervalPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default slack on top of the current refetch interval before the served
/// state counts as stale.
pub const DEFAULT_STALE_GRACE_SECS: u64 = 5;

/// Configuration for the dashboard server and the poller behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to enable CORS
    pub enable_cors: bool,
    /// Refetch schedule of the served poller
    pub schedule: IntervalPolicy,
    /// Seconds of slack before missing data is reported as stale
    pub stale_grace_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
            schedule: IntervalPolicy::default(),
            stale_grace_secs: DEFAULT_STALE_GRACE_SECS,
        }
    }
}

impl WebConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    pub fn with_schedule(mut self, schedule: IntervalPolicy) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_stale_grace_secs(mut self, secs: u64) -> Self {
        self.stale_grace_secs = secs;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Longest gap between values that is still on schedule, `elapsed` into
    /// the session.
    pub fn expected_interval(&self, elapsed: Duration) -> Duration {
        self.schedule.interval_for(elapsed) + Duration::from_secs(self.stale_grace_secs)
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule.validate()
    }
}
