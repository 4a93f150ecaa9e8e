// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Time-ordered document identifiers.
//!
//! Identifiers are UUIDv7 strings. The leading 48 bits carry the creation
//! time in milliseconds, so lexicographic order of the hyphenated form is
//! creation order and the creation instant can be recovered from the id.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::{Builder, ContextV7, NoContext, Timestamp, Uuid};

/// How far the shared clock may run ahead of a requested instant before the
/// id is minted at that instant instead.
const MAX_CLOCK_LEAD_MS: i64 = 1_000;

/// Clock and counter shared by every id minted in this process.
static CONTEXT: Mutex<ContextV7> = Mutex::new(ContextV7::new());

fn unix_parts(at: DateTime<Utc>) -> (u64, u32) {
    (at.timestamp().max(0) as u64, at.timestamp_subsec_nanos())
}

fn timestamp_millis(ts: &Timestamp) -> i64 {
    let (secs, nanos) = ts.to_unix();
    (secs as i64).saturating_mul(1_000) + (nanos / 1_000_000) as i64
}

/// Generate a new identifier stamped with `at`.
///
/// Ids minted by this process at non-decreasing instants sort in the order
/// they were generated, including within one millisecond. An instant well
/// behind the shared clock (a backdated record) keeps its own timestamp and
/// gets random low bits.
pub fn new_id_at(at: DateTime<Utc>) -> String {
    let (secs, nanos) = unix_parts(at);

    let ts = Timestamp::from_unix(&CONTEXT, secs, nanos);
    let ts = if timestamp_millis(&ts) - at.timestamp_millis() > MAX_CLOCK_LEAD_MS {
        Timestamp::from_unix(NoContext, secs, nanos)
    } else {
        ts
    };

    Uuid::new_v7(ts).to_string()
}

/// Smallest identifier that can be minted at or after `at`.
pub fn id_floor(at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis().max(0) as u64;
    Builder::from_unix_timestamp_millis(millis, &[0u8; 10])
        .into_uuid()
        .to_string()
}

/// Creation instant embedded in an identifier, if it is a UUIDv7.
pub fn id_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let uuid = Uuid::parse_str(id).ok()?;
    let (secs, nanos) = uuid.get_timestamp()?.to_unix();
    DateTime::from_timestamp(secs as i64, nanos)
}
