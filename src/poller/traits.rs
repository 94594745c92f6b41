//! The seam between the poller and whatever produces values.

use crate::error::Result;
use crate::poller::data::Category;
use async_trait::async_trait;

/// Asynchronous producer of one numeric sample per category.
///
/// Implementations collapse every kind of failure (network, timeout,
/// malformed data) into a single [`CounterError::Source`](crate::CounterError::Source).
/// Any per-request timeout is the source's own business; the poller never
/// cancels a request in flight.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fetch the current value of `category`.
    async fn get_sample(&self, category: Category) -> Result<f64>;

    /// Short name used in log output.
    fn name(&self) -> &str;
}
