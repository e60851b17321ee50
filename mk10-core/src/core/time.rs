// mk10-core/src/core/time.rs
// ============================================================================
// Module: MK10 Time Model
// Description: Deterministic timestamps derived from the evidence sequence.
// Purpose: Keep every recorded instant a function of run inputs, never the wall clock.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! MK10-PRO does not trust wall-clock time. Every timestamp in evidence is
//! `base_time + seq * EVENT_INTERVAL_MILLIS`, where `base_time` is either
//! supplied by the caller or derived from the plan fingerprint. The core never
//! calls into the system clock; hosts that want real time must supply it
//! explicitly at context construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed interval between consecutive evidence events, in milliseconds.
pub const EVENT_INTERVAL_MILLIS: i64 = 1;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided or derived; the core never reads the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns this timestamp shifted by the given number of milliseconds.
    #[must_use]
    pub const fn plus_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Derives a base time from a plan fingerprint: `epoch + (fingerprint mod
    /// 2^31) seconds`, reading the low 32 bits of the big-endian digest.
    #[must_use]
    pub fn from_fingerprint_hex(fingerprint_hex: &str) -> Self {
        let start = fingerprint_hex.len().saturating_sub(8);
        let tail = fingerprint_hex.get(start..).unwrap_or("");
        let low = u32::from_str_radix(tail, 16).unwrap_or(0);
        let seconds = i64::from(low & 0x7fff_ffff);
        Self(seconds.saturating_mul(1000))
    }
}

// ============================================================================
// SECTION: Evidence Clock
// ============================================================================

/// Deterministic clock assigning timestamps to evidence events.
///
/// # Invariants
/// - `at_seq(s) == base_time + s * EVENT_INTERVAL_MILLIS` for every sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvidenceClock {
    /// Base instant for the run.
    base_time: Timestamp,
}

impl EvidenceClock {
    /// Creates a clock anchored at the given base time.
    #[must_use]
    pub const fn new(base_time: Timestamp) -> Self {
        Self {
            base_time,
        }
    }

    /// Returns the base time of the run.
    #[must_use]
    pub const fn base_time(self) -> Timestamp {
        self.base_time
    }

    /// Returns the timestamp for the event at the given sequence number.
    #[must_use]
    pub fn at_seq(self, seq: u64) -> Timestamp {
        let offset = i64::try_from(seq).unwrap_or(i64::MAX).saturating_mul(EVENT_INTERVAL_MILLIS);
        self.base_time.plus_millis(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_one_interval_per_seq() {
        let clock = EvidenceClock::new(Timestamp::from_unix_millis(1000));
        assert_eq!(clock.at_seq(0), Timestamp::from_unix_millis(1000));
        assert_eq!(clock.at_seq(1), Timestamp::from_unix_millis(1001));
        assert_eq!(clock.at_seq(42), Timestamp::from_unix_millis(1042));
    }

    #[test]
    fn fingerprint_base_time_uses_low_31_bits() {
        // Low 32 bits 0xffffffff, masked to 0x7fffffff seconds.
        let ts = Timestamp::from_fingerprint_hex("00ffffffff");
        assert_eq!(ts.as_unix_millis(), 0x7fff_ffff_i64 * 1000);
    }

    #[test]
    fn fingerprint_base_time_is_deterministic() {
        let a = Timestamp::from_fingerprint_hex("ab34cd");
        let b = Timestamp::from_fingerprint_hex("ab34cd");
        assert_eq!(a, b);
    }
}
