//! Shared primitive types used across the entitlement engine.

/// Wall-clock UTC time in milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// A monotonic clock reading in milliseconds. Unlike wall-clock time it
/// never jumps backward, which is what makes tamper detection possible.
pub type ElapsedMs = i64;

/// Opaque purchase identifier issued by the purchase source.
pub type PurchaseToken = String;

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;
