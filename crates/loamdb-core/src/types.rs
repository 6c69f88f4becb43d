//! Scalar key and time types shared by the value model and the mappers.

use derive_more::{Add, AddAssign, Deref, Display, FromStr};
use rand_chacha::{
    ChaCha20Rng,
    rand_core::{Rng, SeedableRng},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use ulid::Ulid as WrappedUlid;

///
/// Timestamp
/// (in seconds)
///

#[derive(
    Add,
    AddAssign,
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    FromStr,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(u64::MIN);
    pub const MAX: Self = Self(u64::MAX);

    /// Construct from seconds.
    #[must_use]
    pub const fn from_seconds(secs: u64) -> Self {
        Self(secs)
    }

    /// Construct from milliseconds (truncate to seconds).
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms / 1_000)
    }

    #[allow(clippy::cast_sign_loss)]
    pub fn parse_rfc3339(s: &str) -> Result<Self, TimestampError> {
        let dt = OffsetDateTime::parse(s, &Rfc3339).map_err(|_| TimestampError::InvalidFormat)?;
        let ts = dt.unix_timestamp();
        if ts < 0 {
            return Err(TimestampError::BeforeEpoch);
        }

        Ok(Self(ts as u64))
    }

    pub fn parse_flexible(s: &str) -> Result<Self, TimestampError> {
        // Try integer seconds
        if let Ok(n) = s.parse::<u64>() {
            return Ok(Self(n));
        }

        // Try RFC3339
        Self::parse_rfc3339(s)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(u: u64) -> Self {
        Self(u)
    }
}

impl std::ops::Add<u64> for Timestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl std::ops::Sub<u64> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_sub(rhs))
    }
}

///
/// TimestampError
///

#[derive(Debug, ThisError)]
pub enum TimestampError {
    #[error("timestamp is not integer seconds or RFC-3339")]
    InvalidFormat,

    #[error("timestamp before epoch")]
    BeforeEpoch,
}

///
/// UlidError
///

#[derive(Debug, ThisError)]
pub enum UlidError {
    #[error("invalid ulid string")]
    InvalidString,

    #[error("monotonic error - overflow")]
    GeneratorOverflow,
}

///
/// Ulid
///

#[derive(Clone, Copy, Debug, Deref, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Ulid(WrappedUlid);

impl Ulid {
    #[must_use]
    pub const fn nil() -> Self {
        Self(WrappedUlid::nil())
    }

    #[must_use]
    pub const fn from_parts(timestamp_ms: u64, random: u128) -> Self {
        Self(WrappedUlid::from_parts(timestamp_ms, random))
    }

    #[must_use]
    pub const fn from_u128(n: u128) -> Self {
        Self(WrappedUlid::from_bytes(n.to_be_bytes()))
    }

    /// Millisecond timestamp component.
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    /// Monotonic increment; returns `None` on overflow.
    #[must_use]
    pub fn increment(&self) -> Option<Self> {
        self.0.increment().map(Self)
    }

    /// from_str
    #[expect(clippy::should_implement_trait)]
    pub fn from_str(encoded: &str) -> Result<Self, UlidError> {
        let this = WrappedUlid::from_string(encoded).map_err(|_| UlidError::InvalidString)?;

        Ok(Self(this))
    }
}

impl Default for Ulid {
    fn default() -> Self {
        Self(WrappedUlid::nil())
    }
}

impl From<WrappedUlid> for Ulid {
    fn from(ulid: WrappedUlid) -> Self {
        Self(ulid)
    }
}

// The wrapped crate's serde support is feature-gated behind `std`; encode as
// the canonical Crockford string instead.
impl Serialize for Ulid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Ulid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;

        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

///
/// UlidGenerator
///
/// Monotonic key generator; increments within the same millisecond so key
/// order is maintained. Owned by the database handle, never global.
///

pub struct UlidGenerator {
    previous: Ulid,
    rng: ChaCha20Rng,
}

impl UlidGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            previous: Ulid::nil(),
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Monotonic ULID generation for the given wall-clock millisecond.
    pub fn generate(&mut self, now_ms: u64) -> Result<Ulid, UlidError> {
        let last_ts = self.previous.timestamp_ms();

        // maybe time went backward, or it is the same ms.
        // increment instead of generating a new random so that it is monotonic
        if now_ms <= last_ts {
            if let Some(next) = self.previous.increment() {
                self.previous = next;

                return Ok(self.previous);
            }

            return Err(UlidError::GeneratorOverflow);
        }

        let rand = self.next_u128();
        let ulid = Ulid::from_parts(now_ms, rand);

        self.previous = ulid;

        Ok(ulid)
    }

    fn next_u128(&mut self) -> u128 {
        (u128::from(self.rng.next_u64()) << 64) | u128::from(self.rng.next_u64())
    }
}

///
/// TESTS
///
