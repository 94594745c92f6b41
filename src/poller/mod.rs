//! Adaptive polling of a numeric series.
//!
//! A [`Poller`] samples a [`SampleSource`] on a progressive schedule, turns
//! consecutive samples into a per-second rate and reports values, rates and
//! failures through three independent callbacks.

pub mod callbacks;
pub mod data;
pub mod fetcher;
pub mod schedule;
pub mod traits;

// Re-export commonly used items
pub use callbacks::Callbacks;
pub use data::{Category, FetchError, PollerEvent, Sample};
pub use fetcher::Poller;
pub use schedule::IntervalPolicy;
pub use traits::SampleSource;
