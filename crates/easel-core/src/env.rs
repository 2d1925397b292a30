//! Environment abstraction for deterministic testing.
//!
//! Protocol logic never reads the system clock or OS entropy directly. The
//! server and client state machines are generic over [`Environment`], so
//! production code runs on real time while tests drive a manual clock.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`. Test environments may offset it
    /// from a fixed origin.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code should await this, never protocol logic.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
