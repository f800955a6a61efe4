//! Centralized configuration for Seedling.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::session::{DEFAULT_NUMWANT, history::DEFAULT_HISTORY_CAPACITY};

/// Central configuration for all Seedling components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct SeedlingConfig {
    pub network: NetworkConfig,
    pub session: SessionConfig,
}

/// Tracker communication configuration.
///
/// Controls HTTP timeouts and the retry schedule used when an announce is
/// allowed to retry.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// HTTP request timeout for tracker communication
    pub tracker_timeout: Duration,
    /// Maximum retry rounds over the tracker list for retryable announces
    pub max_retry_attempts: u32,
    /// First backoff delay, doubled after every failed round
    pub retry_base_delay: Duration,
    /// Upper bound for the backoff delay
    pub retry_max_delay: Duration,
    /// Maximum redirects followed per announce
    pub max_redirects: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tracker_timeout: Duration::from_secs(30),
            max_retry_attempts: 5,
            retry_base_delay: Duration::from_secs(5),
            retry_max_delay: Duration::from_secs(300), // 5 minutes
            max_redirects: 3,
        }
    }
}

/// Announce session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Number of announce snapshots kept for display
    pub history_capacity: usize,
    /// Peers requested from the tracker while the session is running
    pub numwant: u32,
    /// How often the status display redraws
    pub status_refresh: Duration,
    /// Fixed seed for the traffic model; random per process when unset
    pub deterministic_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            numwant: DEFAULT_NUMWANT,
            status_refresh: Duration::from_secs(1),
            deterministic_seed: None,
        }
    }
}

impl SessionConfig {
    /// Random source for the client identity and the traffic model.
    ///
    /// Reproducible when a deterministic seed is configured.
    pub fn seeded_rng(&self) -> ChaCha8Rng {
        let seed = self.deterministic_seed.unwrap_or_else(rand::random);
        tracing::debug!("Session random seed: {}", seed);
        ChaCha8Rng::seed_from_u64(seed)
    }
}

impl SeedlingConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("SEEDLING_TRACKER_TIMEOUT")
            && let Ok(seconds) = timeout.parse::<u64>()
        {
            config.network.tracker_timeout = Duration::from_secs(seconds);
        }

        if let Ok(retries) = std::env::var("SEEDLING_MAX_RETRIES")
            && let Ok(count) = retries.parse::<u32>()
        {
            config.network.max_retry_attempts = count;
        }

        if let Ok(seed) = std::env::var("SEEDLING_SEED")
            && let Ok(seed_value) = seed.parse::<u64>()
        {
            config.session.deterministic_seed = Some(seed_value);
        }

        if let Ok(numwant) = std::env::var("SEEDLING_NUMWANT")
            && let Ok(count) = numwant.parse::<u32>()
        {
            config.session.numwant = count;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Fixed seed and no backoff delays so tests are fast and reproducible.
    pub fn for_testing() -> Self {
        Self {
            network: NetworkConfig {
                tracker_timeout: Duration::from_secs(5),
                max_retry_attempts: 2,
                retry_base_delay: Duration::ZERO,
                retry_max_delay: Duration::ZERO,
                max_redirects: 0,
            },
            session: SessionConfig {
                status_refresh: Duration::from_millis(10),
                deterministic_seed: Some(42),
                ..SessionConfig::default()
            },
        }
    }
}
