//! The purchase source seam — the external system of record for
//! subscription confirmations.
//!
//! The real store-facing implementation lives outside this crate; the
//! engine only ever sees confirmed purchases through this trait.

use crate::{
    error::EntitlementResult,
    types::{PurchaseToken, TimestampMs},
};
use serde::{Deserialize, Serialize};

/// A confirmed purchase as reported by the purchase source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseConfirmation {
    pub product_id: String,
    /// Store-reported purchase time; non-positive means unknown.
    pub purchase_time_utc: TimestampMs,
    pub token: PurchaseToken,
    pub auto_renewing: bool,
}

/// Supplies purchase confirmations. Implementations may hit the network;
/// callers must treat any error as "no fresh information available".
pub trait PurchaseSource: Send {
    /// The currently active purchase, if the source can name one.
    fn query_active_purchase(&mut self) -> EntitlementResult<Option<PurchaseConfirmation>>;
}

/// Purchase source for offline tooling: never reports a purchase.
pub struct NullPurchaseSource;

impl PurchaseSource for NullPurchaseSource {
    fn query_active_purchase(&mut self) -> EntitlementResult<Option<PurchaseConfirmation>> {
        Ok(None)
    }
}
