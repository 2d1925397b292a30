//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` runs protocol logic on real monotonic time, Tokio sleeps and
//! OS randomness. The server and the CLI share it. Behavior is
//! non-deterministic by nature; tests use a manual environment instead.

use std::time::Duration;

use crate::env::Environment;

/// Production environment using system time and OS randomness.
///
/// Session ids are drawn from getrandom so they cannot be guessed by other
/// clients.
///
/// Requires the `system` feature.
///
/// # Panics
///
/// Panics if the OS RNG fails. Session ids cannot be issued without it.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1);
    }

    #[test]
    fn session_ids_differ() {
        let env = SystemEnv::new();
        assert_ne!(env.random_u64(), env.random_u64());
    }

    #[tokio::test]
    async fn system_env_sleep_works() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(50)).await;

        assert!(env.now() - start >= Duration::from_millis(50));
    }
}
