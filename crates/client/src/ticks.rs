// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversion of upstream reservation timestamps (100 ns ticks since
//! 0001-01-01) into absolute times.

use chrono::{DateTime, Utc};

/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch.
const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;

/// 100 ns ticks per millisecond.
const TICKS_PER_MILLISECOND: i64 = 10_000;

/// Decode a tick timestamp into an absolute time.
///
/// Returns `None` when the resulting instant falls outside the range
/// `chrono` can represent.
pub fn ticks_to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    let millis = (ticks - TICKS_AT_UNIX_EPOCH) / TICKS_PER_MILLISECOND;
    DateTime::from_timestamp_millis(millis)
}

#[cfg(test)]
#[path = "ticks_tests.rs"]
mod tests;
