//! Time-ordered node identity generation
//!
//! Identifiers carry a 48-bit millisecond timestamp prefix followed by the
//! version nibble (7), the variant bits (binary 10) and 74 random bits.

use super::NodeId;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;
use uuid::Builder;

/// Source of fresh node identifiers
pub trait NodeIdGenerator: Send + Sync {
    /// Mint a new identifier
    fn generate(&self) -> NodeId;
}

/// Millisecond wall clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Milliseconds since the Unix epoch
    pub fn now_millis() -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Generator producing time-prefixed identifiers from an injected random source
pub struct TimeOrderedIdGenerator<R> {
    rng: Mutex<R>,
    clock: fn() -> u64,
}

impl TimeOrderedIdGenerator<OsRng> {
    /// Generator drawing from operating-system entropy and the system clock
    pub fn from_os_entropy() -> Self {
        Self::new(OsRng, SystemClock::now_millis)
    }
}

impl Default for TimeOrderedIdGenerator<OsRng> {
    fn default() -> Self {
        Self::from_os_entropy()
    }
}

impl<R> TimeOrderedIdGenerator<R>
where
    R: RngCore + CryptoRng + Send,
{
    /// Create a generator from a random source and a millisecond clock
    pub fn new(rng: R, clock: fn() -> u64) -> Self {
        Self {
            rng: Mutex::new(rng),
            clock,
        }
    }
}

impl<R> NodeIdGenerator for TimeOrderedIdGenerator<R>
where
    R: RngCore + CryptoRng + Send,
{
    fn generate(&self) -> NodeId {
        let mut random = [0u8; 10];
        self.rng.lock().fill_bytes(&mut random);
        let uuid = Builder::from_unix_timestamp_millis((self.clock)(), &random).into_uuid();
        NodeId::from_uuid(uuid)
    }
}

impl<R> fmt::Debug for TimeOrderedIdGenerator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeOrderedIdGenerator").finish_non_exhaustive()
    }
}
