//! Manually driven environment for tests.
//!
//! [`ManualEnv`] holds a virtual clock that only moves when a test calls
//! [`ManualEnv::advance`] (or awaits [`Environment::sleep`]), and a seeded RNG.
//! Clones share the same clock and RNG.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::env::Environment;

/// Environment with a manual clock and deterministic randomness.
#[derive(Clone)]
pub struct ManualEnv {
    origin: Instant,
    offset_nanos: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl ManualEnv {
    /// Create an environment whose RNG is seeded with `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: Arc::new(AtomicU64::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Time elapsed on the virtual clock since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for ManualEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl std::fmt::Debug for ManualEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualEnv").field("elapsed", &self.elapsed()).finish_non_exhaustive()
    }
}

impl Environment for ManualEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_moves_only_when_advanced() {
        let env = ManualEnv::default();
        let start = env.now();
        assert_eq!(env.now(), start);

        env.advance(Duration::from_secs(3));
        assert_eq!(env.now() - start, Duration::from_secs(3));
    }

    #[test]
    fn clones_share_clock() {
        let env = ManualEnv::default();
        let other = env.clone();
        other.advance(Duration::from_millis(250));
        assert_eq!(env.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn same_seed_same_bytes() {
        let a = ManualEnv::with_seed(42);
        let b = ManualEnv::with_seed(42);
        assert_eq!(a.random_u64(), b.random_u64());
    }
}
