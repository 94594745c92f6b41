//! The adaptive poller: session lifecycle, single-flight fetching and rate
//! derivation.

use crate::error::Result;
use crate::poller::{
    callbacks::Callbacks,
    data::{Category, FetchError, Sample},
    schedule::IntervalPolicy,
    traits::SampleSource,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Repeatedly samples a [`SampleSource`] on a progressive schedule.
///
/// All results leave through the [`Callbacks`] given at construction; the
/// poller has no getters. Invariants:
///
/// - At most one scheduling timer is live, and every fetch (scheduled or
///   triggered by [`set_category`](Poller::set_category)) runs under a single
///   in-flight guard, so samples are accepted strictly in order.
/// - Liveness of the session is checked immediately before each delivery, so
///   a fetch that completes after [`stop`](Poller::stop) delivers nothing. A
///   callback already past that check when `stop` runs on another thread
///   still completes.
///
/// `start` and `set_category` spawn tokio tasks and must be called from
/// within a runtime.
pub struct Poller {
    shared: Arc<Shared>,
}

struct Shared {
    source: Arc<dyn SampleSource>,
    callbacks: Callbacks,
    policy: IntervalPolicy,
    session: Mutex<Session>,
    in_flight: tokio::sync::Mutex<()>,
}

struct Session {
    id: Uuid,
    /// Bumped whenever a session ends; work tagged with an older value is dropped.
    generation: u64,
    active: bool,
    category: Category,
    started_at: Instant,
    last_sample: Option<Sample>,
    consecutive_errors: u32,
    timer: Option<JoinHandle<()>>,
}

impl Session {
    fn is_live(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }

    fn end(&mut self) {
        self.active = false;
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Poller {
    /// Create an idle poller with the default progressive schedule.
    pub fn new(source: Arc<dyn SampleSource>, callbacks: Callbacks) -> Self {
        Self::build(source, callbacks, IntervalPolicy::default())
    }

    /// Create an idle poller with a custom interval policy.
    ///
    /// Fails with [`CounterError::Config`](crate::error::CounterError::Config)
    /// if the policy does not pass [`IntervalPolicy::validate`].
    pub fn with_policy(
        source: Arc<dyn SampleSource>,
        callbacks: Callbacks,
        policy: IntervalPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        Ok(Self::build(source, callbacks, policy))
    }

    fn build(source: Arc<dyn SampleSource>, callbacks: Callbacks, policy: IntervalPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                callbacks,
                policy,
                session: Mutex::new(Session {
                    id: Uuid::nil(),
                    generation: 0,
                    active: false,
                    category: Category::default(),
                    started_at: Instant::now(),
                    last_sample: None,
                    consecutive_errors: 0,
                    timer: None,
                }),
                in_flight: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Begin a session sampling `category`.
    ///
    /// The first fetch happens one interval after the call. Calling `start`
    /// on a running poller ends the current session and begins a new one with
    /// a fresh elapsed-time clock.
    pub fn start(&self, category: Category) {
        let mut session = self.shared.session();
        if session.active {
            info!(
                "Restarting polling session {} ({} -> {})",
                session.id, session.category, category
            );
            session.end();
        }

        session.id = Uuid::new_v4();
        session.active = true;
        session.category = category;
        session.started_at = Instant::now();

        let generation = session.generation;
        let shared = Arc::clone(&self.shared);
        session.timer = Some(tokio::spawn(run_schedule(shared, generation)));

        info!(
            "Started polling session {} for {} via {}",
            session.id,
            category,
            self.shared.source.name()
        );
    }

    /// End the session and cancel the pending tick. No-op when idle.
    pub fn stop(&self) {
        let mut session = self.shared.session();
        if !session.active {
            return;
        }
        session.end();
        info!("Stopped polling session {}", session.id);
    }

    /// Switch the sampled series.
    ///
    /// On an active poller this triggers one immediate fetch in addition to
    /// the regular schedule; the next scheduled tick keeps its time. The
    /// immediate fetch samples whichever category is current when it runs.
    /// An idle poller records the category but does not fetch; the next
    /// `start` supplies its own category anyway.
    pub fn set_category(&self, category: Category) {
        let mut session = self.shared.session();
        let previous = std::mem::replace(&mut session.category, category);

        if !session.active {
            debug!(
                "Category set to {} on an idle poller, no fetch triggered",
                category
            );
            return;
        }

        info!(
            "Session {} switched from {} to {}",
            session.id, previous, category
        );
        let generation = session.generation;
        drop(session);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            shared.fetch_once(generation).await;
        });
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invoke `deliver` only if the session that produced the value is still live.
    fn deliver(&self, generation: u64, deliver: impl FnOnce(&Callbacks)) -> bool {
        if !self.session().is_live(generation) {
            return false;
        }
        deliver(&self.callbacks);
        true
    }

    /// Run one fetch cycle. Returns whether the session is still live.
    async fn fetch_once(&self, generation: u64) -> bool {
        let _flight = self.in_flight.lock().await;

        let (category, session_id) = {
            let session = self.session();
            if !session.is_live(generation) {
                return false;
            }
            (session.category, session.id)
        };

        let requested_at = Instant::now();
        match self.source.get_sample(category).await {
            Ok(value) => {
                let sample = Sample::new(value, requested_at);
                let previous = {
                    let mut session = self.session();
                    if !session.is_live(generation) {
                        return false;
                    }
                    session.consecutive_errors = 0;
                    session.last_sample.replace(sample)
                };

                if let Some(previous) = previous {
                    match sample.rate_since(&previous) {
                        Some(rate) => {
                            debug!("Session {}: {} changing at {:.3}/s", session_id, category, rate);
                            if !self.deliver(generation, |cb| (cb.on_rate)(rate)) {
                                return false;
                            }
                        }
                        None => debug!(
                            "Session {}: no time elapsed since previous sample, rate skipped",
                            session_id
                        ),
                    }
                }

                if !self.deliver(generation, |cb| (cb.on_data)(value)) {
                    return false;
                }
            }
            Err(err) => {
                let consecutive_errors = {
                    let mut session = self.session();
                    if !session.is_live(generation) {
                        return false;
                    }
                    session.consecutive_errors += 1;
                    session.consecutive_errors
                };
                warn!(
                    consecutive_errors,
                    "Session {}: failed to sample {}: {}", session_id, category, err
                );

                let failure = FetchError::new(err.message(), category);
                if !self.deliver(generation, |cb| (cb.on_error)(failure)) {
                    return false;
                }
            }
        }

        self.session().is_live(generation)
    }
}

/// Timer loop of one session: wait one interval, fetch, repeat.
async fn run_schedule(shared: Arc<Shared>, generation: u64) {
    loop {
        let delay = {
            let session = shared.session();
            if !session.is_live(generation) {
                return;
            }
            let elapsed = session.started_at.elapsed();
            let delay = shared.policy.interval_for(elapsed);
            debug!(
                "Session {}: next fetch in {:?} ({:.1}s elapsed)",
                session.id,
                delay,
                elapsed.as_secs_f64()
            );
            delay
        };

        time::sleep(delay).await;

        if !shared.fetch_once(generation).await {
            return;
        }
    }
}
