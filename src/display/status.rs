//! Consumer-side view of a poller: current value, severity and staleness.

use crate::display::abacus::AbacusFrame;
use crate::poller::data::{Category, PollerEvent};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Error messages kept for display.
pub const MAX_ERROR_MESSAGES: usize = 50;

/// Errors at which the indicator turns from warning to error.
pub const CRITICAL_ERROR_COUNT: usize = 3;

/// Status indicator colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLed {
    #[default]
    Neutral,
    Warning,
    Error,
}

impl StatusLed {
    pub fn from_error_count(count: usize) -> Self {
        if count >= CRITICAL_ERROR_COUNT {
            StatusLed::Error
        } else if count >= 1 {
            StatusLed::Warning
        } else {
            StatusLed::Neutral
        }
    }

    /// Tooltip text for the indicator.
    pub fn describe(&self, error_count: usize) -> String {
        match self {
            StatusLed::Neutral => "System status: Normal".to_string(),
            StatusLed::Warning => format!(
                "Warning: {} error{} detected",
                error_count,
                if error_count == 1 { "" } else { "s" }
            ),
            StatusLed::Error => format!("Alert: {} errors detected", error_count),
        }
    }
}

/// State a display keeps, fed from [`PollerEvent`]s.
#[derive(Debug, Clone)]
pub struct DashboardState {
    category: Category,
    value: Option<f64>,
    rate: Option<f64>,
    error_count: usize,
    error_messages: VecDeque<String>,
    last_update: Option<Instant>,
}

/// Serializable snapshot of a [`DashboardState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub category: Category,
    pub label: String,
    pub value: Option<f64>,
    pub rate_per_second: Option<f64>,
    pub loading: bool,
    pub led: StatusLed,
    pub status: String,
    pub error_count: usize,
    pub error_messages: Vec<String>,
    pub abacus: AbacusFrame,
}

impl DashboardState {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            value: None,
            rate: None,
            error_count: 0,
            error_messages: VecDeque::new(),
            last_update: None,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// True until the first value for the current category arrives.
    pub fn is_loading(&self) -> bool {
        self.value.is_none()
    }

    pub fn led(&self) -> StatusLed {
        StatusLed::from_error_count(self.error_count)
    }

    /// Switch category. The old value belongs to another series, so the
    /// display goes back to loading until fresh data arrives.
    pub fn set_category(&mut self, category: Category) {
        if category != self.category {
            self.category = category;
            self.value = None;
            self.rate = None;
        }
    }

    /// Fold one poller event into the state.
    pub fn apply(&mut self, event: &PollerEvent, now: Instant) {
        match event {
            PollerEvent::Data(value) => {
                self.value = Some(*value);
                self.last_update = Some(now);
            }
            PollerEvent::Rate(rate) => self.rate = Some(*rate),
            PollerEvent::Error(error) => {
                self.error_count += 1;
                if self.error_messages.len() == MAX_ERROR_MESSAGES {
                    self.error_messages.pop_front();
                }
                self.error_messages.push_back(format!(
                    "{}: {}",
                    error.timestamp.to_rfc3339(),
                    error.message
                ));
            }
        }
    }

    pub fn reset_errors(&mut self) {
        self.error_count = 0;
        self.error_messages.clear();
    }

    /// No value has arrived for longer than `expected` since the last one.
    pub fn is_stale(&self, now: Instant, expected: Duration) -> bool {
        self.last_update
            .map(|at| now.saturating_duration_since(at) > expected)
            .unwrap_or(false)
    }

    pub fn view(&self) -> DashboardView {
        let led = self.led();
        DashboardView {
            category: self.category,
            label: self.category.label().to_string(),
            value: self.value,
            rate_per_second: self.rate,
            loading: self.is_loading(),
            led,
            status: led.describe(self.error_count),
            error_count: self.error_count,
            error_messages: self.error_messages.iter().cloned().collect(),
            abacus: AbacusFrame::from_value(self.value.unwrap_or(0.0), self.is_loading()),
        }
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(Category::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::data::FetchError;

    fn failure() -> PollerEvent {
        PollerEvent::Error(FetchError::new("offline", Category::Population))
    }

    #[test]
    fn test_led_escalation() {
        assert_eq!(StatusLed::from_error_count(0), StatusLed::Neutral);
        assert_eq!(StatusLed::from_error_count(1), StatusLed::Warning);
        assert_eq!(StatusLed::from_error_count(2), StatusLed::Warning);
        assert_eq!(StatusLed::from_error_count(3), StatusLed::Error);
        assert_eq!(StatusLed::from_error_count(30), StatusLed::Error);
    }

    #[test]
    fn test_led_descriptions() {
        assert_eq!(StatusLed::Neutral.describe(0), "System status: Normal");
        assert_eq!(StatusLed::Warning.describe(1), "Warning: 1 error detected");
        assert_eq!(StatusLed::Warning.describe(2), "Warning: 2 errors detected");
        assert_eq!(StatusLed::Error.describe(4), "Alert: 4 errors detected");
    }

    #[tokio::test]
    async fn test_apply_events() {
        let now = Instant::now();
        let mut state = DashboardState::new(Category::Population);
        assert!(state.is_loading());

        state.apply(&PollerEvent::Data(100.0), now);
        state.apply(&PollerEvent::Rate(2.5), now);
        assert_eq!(state.value(), Some(100.0));
        assert_eq!(state.rate(), Some(2.5));
        assert!(!state.is_loading());

        state.apply(&failure(), now);
        assert_eq!(state.led(), StatusLed::Warning);
        state.apply(&failure(), now);
        state.apply(&failure(), now);
        assert_eq!(state.led(), StatusLed::Error);
        assert_eq!(state.value(), Some(100.0));

        state.reset_errors();
        assert_eq!(state.led(), StatusLed::Neutral);
        assert!(state.view().error_messages.is_empty());
    }

    #[tokio::test]
    async fn test_error_messages_bounded() {
        let mut state = DashboardState::default();
        for _ in 0..MAX_ERROR_MESSAGES + 5 {
            state.apply(&failure(), Instant::now());
        }
        let view = state.view();
        assert_eq!(view.error_messages.len(), MAX_ERROR_MESSAGES);
        assert_eq!(view.error_count, MAX_ERROR_MESSAGES + 5);
        assert!(view.error_messages[0].ends_with(": offline"));
    }

    #[tokio::test]
    async fn test_category_switch_reloads() {
        let mut state = DashboardState::new(Category::Population);
        state.apply(&PollerEvent::Data(8e9), Instant::now());
        state.set_category(Category::Debt);
        assert!(state.is_loading());
        assert_eq!(state.view().label, "National Debt");

        state.apply(&PollerEvent::Data(5.0), Instant::now());
        state.set_category(Category::Debt);
        assert_eq!(state.value(), Some(5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness() {
        let mut state = DashboardState::default();
        let start = Instant::now();
        assert!(!state.is_stale(start, Duration::from_secs(1)));

        state.apply(&PollerEvent::Data(1.0), start);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!state.is_stale(Instant::now(), Duration::from_secs(5)));
        assert!(state.is_stale(Instant::now(), Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_view_serializes() {
        let mut state = DashboardState::new(Category::Debt);
        state.apply(&PollerEvent::Data(42.0), Instant::now());
        let json = serde_json::to_value(state.view()).unwrap();
        assert_eq!(json["category"], "debt");
        assert_eq!(json["led"], "neutral");
        assert_eq!(json["loading"], false);
        assert_eq!(json["abacus"]["digits"][9], 2);
    }
}
