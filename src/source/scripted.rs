//! Deterministic sample source for tests and demos.

use crate::error::{CounterError, Result};
use crate::poller::{data::Category, traits::SampleSource};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// One recorded request against a [`ScriptedSource`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceCall {
    pub category: Category,
    pub at: Instant,
}

#[derive(Debug, Clone)]
enum Outcome {
    Value(f64),
    Failure(String),
}

/// Replays queued outcomes in order and records every request.
///
/// When the script runs dry the fallback value is returned, or a failure if
/// no fallback was configured.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Outcome>>,
    calls: Mutex<Vec<SourceCall>>,
    fallback: Option<f64>,
    latency: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned once the script is exhausted.
    pub fn with_fallback(mut self, value: f64) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_value(&self, value: f64) {
        lock(&self.script).push_back(Outcome::Value(value));
    }

    /// Queue a failure carrying `message`.
    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.script).push_back(Outcome::Failure(message.into()));
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn get_sample(&self, category: Category) -> Result<f64> {
        lock(&self.calls).push(SourceCall {
            category,
            at: Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let next = lock(&self.script).pop_front();
        match next {
            Some(Outcome::Value(value)) => Ok(value),
            Some(Outcome::Failure(message)) => Err(CounterError::source_error(message)),
            None => self
                .fallback
                .ok_or_else(|| CounterError::source_error("Script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script_in_order() {
        let source = ScriptedSource::new();
        source.push_value(1.0);
        source.push_failure("offline");

        assert_eq!(source.get_sample(Category::Population).await.unwrap(), 1.0);
        let err = source.get_sample(Category::Debt).await.unwrap_err();
        assert_eq!(err.message(), "offline");
        assert!(source.get_sample(Category::Debt).await.is_err());

        let categories: Vec<Category> = source.calls().iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            vec![Category::Population, Category::Debt, Category::Debt]
        );
    }

    #[tokio::test]
    async fn test_fallback_after_script() {
        let source = ScriptedSource::new().with_fallback(9.0);
        tokio_test::assert_ok!(source.get_sample(Category::Population).await);
        assert_eq!(source.get_sample(Category::Population).await.unwrap(), 9.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let source = ScriptedSource::new()
            .with_fallback(1.0)
            .with_latency(Duration::from_secs(2));
        let before = Instant::now();
        source.get_sample(Category::Population).await.unwrap();
        assert_eq!(before.elapsed(), Duration::from_secs(2));
    }
}
