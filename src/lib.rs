//! # Abacus Counter - Live World Counters on an Abacus
//!
//! Polls a slowly changing counter (world population or U.S. national debt),
//! derives its rate of change and lays the value out on a ten-rod abacus.
//!
//! ## Features
//!
//! - **Progressive polling**: every second at first, backing off to hourly over five hours
//! - **Rate tracking**: per-second change computed from consecutive samples
//! - **Injected sources**: any [`SampleSource`]; a simulated one ships with the crate
//! - **Dashboard state**: abacus layout, status indicator and staleness checks
//! - **Web API**: JSON state and category toggle over HTTP
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use abacus_counter::{Callbacks, Category, Poller, SimulatedCounters};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let callbacks = Callbacks::new(
//!         |value| println!("value: {}", value),
//!         |error| eprintln!("error: {}", error),
//!         |rate| println!("rate: {:.2}/s", rate),
//!     );
//!     let poller = Poller::new(Arc::new(SimulatedCounters::new()), callbacks);
//!     poller.start(Category::Population);
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     poller.stop();
//! }
//! ```

pub mod display;
pub mod error;
pub mod poller;
pub mod source;
pub mod web;

// Re-export public API
pub use display::{AbacusFrame, DashboardState, DashboardView, StatusLed};
pub use error::{CounterError, Result};
pub use poller::{
    Callbacks, Category, FetchError, IntervalPolicy, Poller, PollerEvent, Sample, SampleSource,
};
pub use source::{ScriptedSource, SimulatedCounters, WorldCounters};
pub use web::{start_web_server, AppState, WebConfig};

/// Number of rods (decimal digits) on the abacus
pub const ABACUS_DIGITS: usize = 10;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
