//! Time window and key-id arithmetic (spec §3, §4.1).
//!
//! EECP timestamps are milliseconds since the Unix epoch, matching the wire
//! format's `timestamp` fields. Rotation slots are derived, never stored.

use crate::errors::{EecpError, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Millis = u64;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> Millis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Millis
}

/// Allowed rotation intervals, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationInterval {
    /// Rotate every 5 minutes.
    Five,
    /// Rotate every 15 minutes.
    Fifteen,
    /// Rotate every 30 minutes.
    Thirty,
    /// Rotate every 60 minutes.
    Sixty,
}

impl RotationInterval {
    /// Parse a raw minute count, rejecting anything outside `{5,15,30,60}`.
    pub fn from_minutes(minutes: u32) -> Result<Self> {
        match minutes {
            5 => Ok(Self::Five),
            15 => Ok(Self::Fifteen),
            30 => Ok(Self::Thirty),
            60 => Ok(Self::Sixty),
            other => Err(EecpError::config(format!(
                "rotation_interval_minutes must be one of 5, 15, 30, 60 (got {other})"
            ))),
        }
    }

    /// The interval in minutes.
    pub fn minutes(self) -> u32 {
        match self {
            Self::Five => 5,
            Self::Fifteen => 15,
            Self::Thirty => 30,
            Self::Sixty => 60,
        }
    }

    /// The interval in milliseconds.
    pub fn millis(self) -> Millis {
        u64::from(self.minutes()) * 60_000
    }
}

/// The validity window of a workspace, plus its rotation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Window start (workspace creation), inclusive.
    pub start: Millis,
    /// Window end (workspace expiry), exclusive.
    pub end: Millis,
    /// Rotation cadence.
    pub rotation_interval: RotationInterval,
    /// Grace period appended to every key's validity, in milliseconds.
    pub grace_period_ms: Millis,
}

impl TimeWindow {
    /// Validate and construct a new time window.
    pub fn new(
        start: Millis,
        end: Millis,
        rotation_interval: RotationInterval,
        grace_period_ms: Millis,
    ) -> Result<Self> {
        if end <= start {
            return Err(EecpError::config(
                "time_window.end must be after time_window.start",
            ));
        }
        Ok(Self {
            start,
            end,
            rotation_interval,
            grace_period_ms,
        })
    }

    /// Extend the window end (and therefore workspace expiry) by `minutes`.
    pub fn extend_by_minutes(&mut self, minutes: u32) {
        self.end += u64::from(minutes) * 60_000;
    }

    /// The rotation slot index active at `now`, given the window start.
    ///
    /// A step function of `now`, monotone non-decreasing, that transitions
    /// exactly at multiples of the rotation interval past `start`
    /// (invariant 4).
    pub fn slot_at(&self, now: Millis) -> u64 {
        let elapsed = now.saturating_sub(self.start);
        elapsed / self.rotation_interval.millis()
    }

    /// The key id valid at `now` (`"key-<n>"`).
    pub fn current_key_id(&self, now: Millis) -> KeyId {
        KeyId::from_slot(self.slot_at(now))
    }

    /// The `[valid_from, valid_until)` bounds of `key_id`, plus its grace end.
    pub fn key_bounds(&self, key_id: KeyId) -> (Millis, Millis, Millis) {
        let interval = self.rotation_interval.millis();
        let valid_from = self.start + key_id.slot() * interval;
        let valid_until = valid_from + interval;
        let grace_period_end = valid_until + self.grace_period_ms;
        (valid_from, valid_until, grace_period_end)
    }

    /// Whether `key_id` is valid (including grace period) at `now`
    /// (invariant 11).
    pub fn is_valid(&self, key_id: KeyId, now: Millis) -> bool {
        let (valid_from, _valid_until, grace_period_end) = self.key_bounds(key_id);
        now >= valid_from && now < grace_period_end
    }

    /// Whether `key_id` is presently in its grace period (past validity, not
    /// yet destroyed).
    pub fn in_grace_period(&self, key_id: KeyId, now: Millis) -> bool {
        let (_valid_from, valid_until, grace_period_end) = self.key_bounds(key_id);
        now >= valid_until && now < grace_period_end
    }
}

/// A rotation-slot key identifier of the form `"key-<n>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    /// Build a key id from a raw rotation slot.
    pub fn from_slot(slot: u64) -> Self {
        Self(slot)
    }

    /// The underlying rotation slot.
    pub fn slot(self) -> u64 {
        self.0
    }

    /// Parse the `"key-<n>"` wire form, rejecting any other shape
    /// (spec §4.1: `^key-(\d+)$`).
    pub fn parse(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("key-")
            .ok_or_else(|| EecpError::crypto(format!("invalid key id: {s}")))?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EecpError::crypto(format!("invalid key id: {s}")));
        }
        let slot = digits
            .parse::<u64>()
            .map_err(|_| EecpError::crypto(format!("invalid key id: {s}")))?;
        Ok(Self(slot))
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "key-{}", self.0)
    }
}

impl serde::Serialize for KeyId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for KeyId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        KeyId::parse(&s).map_err(serde::de::Error::custom)
    }
}
