//! The three delivery channels of a poller.

use crate::poller::data::{FetchError, PollerEvent};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

pub type DataCallback = Arc<dyn Fn(f64) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(FetchError) + Send + Sync>;
pub type RateCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Callbacks fixed at poller construction.
#[derive(Clone)]
pub struct Callbacks {
    pub(crate) on_data: DataCallback,
    pub(crate) on_error: ErrorCallback,
    pub(crate) on_rate: RateCallback,
}

impl Callbacks {
    pub fn new(
        on_data: impl Fn(f64) + Send + Sync + 'static,
        on_error: impl Fn(FetchError) + Send + Sync + 'static,
        on_rate: impl Fn(f64) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_data: Arc::new(on_data),
            on_error: Arc::new(on_error),
            on_rate: Arc::new(on_rate),
        }
    }

    /// Callbacks that forward every delivery into a channel, in order.
    ///
    /// Deliveries after the receiver is dropped are discarded.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PollerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let data_tx = tx.clone();
        let error_tx = tx.clone();
        let callbacks = Self::new(
            move |value| {
                let _ = data_tx.send(PollerEvent::Data(value));
            },
            move |error| {
                let _ = error_tx.send(PollerEvent::Error(error));
            },
            move |rate| {
                let _ = tx.send(PollerEvent::Rate(rate));
            },
        );
        (callbacks, rx)
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}
