//! Sample sources the poller can be pointed at.

pub mod scripted;
pub mod simulated;

pub use scripted::{ScriptedSource, SourceCall};
pub use simulated::{SimulatedCounters, WorldCounters};
