//! Simulated world counters.
//!
//! Produces values shaped like the live counters published on
//! worldometers.info without any network access. Snapshots are cached for
//! a configurable duration, mirroring how the real scraper avoids hammering
//! the site.

use crate::error::{CounterError, Result};
use crate::poller::{data::Category, traits::SampleSource};
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Baseline world population before jitter.
pub const BASE_POPULATION: u64 = 8_065_300_000;

/// Baseline U.S. national debt in dollars before jitter.
pub const BASE_NATIONAL_DEBT: u64 = 34_000_000_000_000;

/// Default lifetime of a cached snapshot.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(60);

const BIRTHS_PER_SECOND: f64 = 4.3;
const DEATHS_PER_SECOND: f64 = 1.8;
const NET_GROWTH_PER_SECOND: f64 = 2.5;

/// A complete set of counters at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldCounters {
    /// When this snapshot was generated
    pub generated_at: DateTime<Utc>,
    pub world_population: WorldPopulation,
    pub government_and_economics: GovernmentAndEconomics,
}

/// Population counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldPopulation {
    pub current_population: u64,
    pub births_today: u64,
    pub births_this_year: u64,
    pub deaths_today: u64,
    pub deaths_this_year: u64,
    pub net_population_growth_today: u64,
    pub net_population_growth_this_year: u64,
}

/// Government spending and debt counters, in dollars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernmentAndEconomics {
    pub us_national_debt: u64,
    pub public_healthcare_expenditure_today: u64,
    pub public_education_expenditure_today: u64,
    pub public_military_expenditure_today: u64,
}

impl WorldCounters {
    /// Value of the counter backing `category`.
    pub fn value_for(&self, category: Category) -> f64 {
        match category {
            Category::Population => self.world_population.current_population as f64,
            Category::Debt => self.government_and_economics.us_national_debt as f64,
        }
    }

    fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::rng();
        let seconds_today = now.num_seconds_from_midnight() as f64;
        let per_day = |rate: f64| (seconds_today * rate) as u64;

        Self {
            generated_at: now,
            world_population: WorldPopulation {
                current_population: BASE_POPULATION + rng.random_range(0..100_000u64),
                births_today: per_day(BIRTHS_PER_SECOND),
                births_this_year: 73_000_000 + per_day(BIRTHS_PER_SECOND),
                deaths_today: per_day(DEATHS_PER_SECOND),
                deaths_this_year: 42_000_000 + per_day(DEATHS_PER_SECOND),
                net_population_growth_today: per_day(NET_GROWTH_PER_SECOND),
                net_population_growth_this_year: 31_000_000 + per_day(NET_GROWTH_PER_SECOND),
            },
            government_and_economics: GovernmentAndEconomics {
                us_national_debt: BASE_NATIONAL_DEBT + rng.random_range(0..10_000_000u64),
                public_healthcare_expenditure_today: 18_000_000_000
                    + rng.random_range(0..1_000_000u64),
                public_education_expenditure_today: 14_000_000_000
                    + rng.random_range(0..1_000_000u64),
                public_military_expenditure_today: 5_000_000_000 + rng.random_range(0..1_000_000u64),
            },
        }
    }
}

struct CacheEntry {
    counters: WorldCounters,
    fetched_at: Instant,
}

/// Mock counters source. Construct one and hand it to the poller; there is
/// no shared global instance.
pub struct SimulatedCounters {
    cache: Mutex<Option<CacheEntry>>,
    cache_duration: Duration,
    latency: Duration,
    failure_probability: f64,
}

impl Default for SimulatedCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCounters {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
            cache_duration: DEFAULT_CACHE_DURATION,
            latency: Duration::ZERO,
            failure_probability: 0.0,
        }
    }

    /// How long a generated snapshot is served before a new one is made.
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = duration;
        self
    }

    /// Simulated response time of each request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Chance in `[0, 1]` that a request fails.
    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn cache(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current counters, served from cache while it is fresh.
    pub fn world_counters(&self) -> WorldCounters {
        let mut cache = self.cache();
        if let Some(entry) = cache.as_ref() {
            if entry.fetched_at.elapsed() < self.cache_duration {
                return entry.counters.clone();
            }
        }

        debug!("Generating fresh world counters");
        let counters = WorldCounters::generate(Utc::now());
        *cache = Some(CacheEntry {
            counters: counters.clone(),
            fetched_at: Instant::now(),
        });
        counters
    }

    /// Discard the cache and generate a new snapshot.
    pub fn reload(&self) -> WorldCounters {
        self.cache().take();
        self.world_counters()
    }
}

#[async_trait]
impl SampleSource for SimulatedCounters {
    async fn get_sample(&self, category: Category) -> Result<f64> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failure_probability > 0.0
            && rand::rng().random_bool(self.failure_probability)
        {
            return Err(CounterError::source_error(format!(
                "Simulated outage while fetching {}",
                category
            )));
        }

        Ok(self.world_counters().value_for(category))
    }

    fn name(&self) -> &str {
        "simulated-worldometer"
    }
}
