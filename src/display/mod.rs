//! What a display needs from the poller: the abacus layout of the current
//! value and a status indicator driven by delivered errors.

pub mod abacus;
pub mod status;

pub use abacus::AbacusFrame;
pub use status::{DashboardState, DashboardView, StatusLed};
