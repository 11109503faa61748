//! The entitlement manager — stateful shell around the pure evaluator.
//!
//! RULES:
//!   - The manager is the single owner of record read-modify-write; no
//!     other component touches the store's record slot.
//!   - Persistence or purchase-source failures are treated as "no fresh
//!     information": the manager falls back to the cached record and the
//!     evaluator's fail-open semantics. A storage error must never lock
//!     the user out.

use crate::{
    clock::Clock,
    error::EntitlementResult,
    evaluator::evaluate,
    policy::EntitlementPolicy,
    purchase::{PurchaseConfirmation, PurchaseSource},
    record::{EntitlementState, SubscriptionRecord},
    store::{EntitlementStore, TransitionLogEntry},
    types::{TimestampMs, DAY_MS},
};

const META_RENEW_PROMPT_SUPPRESS_UNTIL: &str = "renew_prompt_suppress_until";

/// Reports whether usable offline content exists (e.g. an already
/// downloaded or sideloaded model). Derived from whatever content
/// inventory the host application keeps.
pub trait ContentInventory: Send {
    fn has_local_content(&self) -> bool;
}

/// Public facing abstraction for entitlement checks used by the UI layer.
pub trait EntitlementProvider {
    /// True when the user may access full app functionality.
    fn is_feature_access_allowed(&self) -> bool;
    /// Current raw entitlement state.
    fn current_state(&self) -> EntitlementState;
    /// Human readable label for diagnostics / UI.
    fn access_mode_label(&self) -> &'static str;
    /// Syncs from the purchase source if the throttle interval elapsed,
    /// or always when forced; otherwise just re-evaluates.
    fn refresh_if_needed(&mut self, force: bool) -> EntitlementResult<EntitlementState>;
}

pub struct EntitlementManager {
    store: EntitlementStore,
    purchase_source: Box<dyn PurchaseSource>,
    inventory: Box<dyn ContentInventory>,
    clock: Box<dyn Clock>,
    policy: EntitlementPolicy,
    state: EntitlementState,
    cached_record: Option<SubscriptionRecord>,
    last_sync_attempt_utc: TimestampMs,
}

impl EntitlementManager {
    pub fn new(
        store: EntitlementStore,
        purchase_source: Box<dyn PurchaseSource>,
        inventory: Box<dyn ContentInventory>,
        clock: Box<dyn Clock>,
        policy: EntitlementPolicy,
    ) -> Self {
        Self {
            store,
            purchase_source,
            inventory,
            clock,
            policy,
            state: EntitlementState::NotEntitled,
            cached_record: None,
            last_sync_attempt_utc: 0,
        }
    }

    pub fn policy(&self) -> &EntitlementPolicy {
        &self.policy
    }

    /// Last record seen by an evaluation, without touching the store.
    pub fn current_record(&self) -> Option<&SubscriptionRecord> {
        self.cached_record.as_ref()
    }

    /// Run one evaluation against the persisted record and publish the
    /// resulting state.
    pub fn evaluate_state(&mut self) -> EntitlementResult<EntitlementState> {
        let now = self.clock.now_utc_ms();
        let elapsed = self.clock.elapsed_monotonic_ms();

        // A failed read is "no fresh information" — keep the cached record.
        let record = match self.store.read_record() {
            Ok(r) => {
                self.cached_record = r.clone();
                r
            }
            Err(e) => {
                log::warn!("record read failed, using cached record: {e}");
                self.cached_record.clone()
            }
        };

        if self.policy.debug_force_survival {
            self.publish_state(EntitlementState::SurvivalMode);
            return Ok(self.state);
        }

        let eval = evaluate(
            record.as_ref(),
            now,
            elapsed,
            self.inventory.has_local_content(),
            &self.policy,
        );

        if let Some(updated) = eval.updated {
            if record.as_ref() != Some(&updated) {
                if let Err(e) = self.store.write_record(&updated) {
                    log::warn!("record write failed: {e}");
                }
            }
            self.cached_record = Some(updated);
        }

        self.publish_state(eval.state);
        Ok(self.state)
    }

    /// `true` when the sync throttle interval has elapsed.
    pub fn should_attempt_sync(&self) -> bool {
        self.clock.now_utc_ms() - self.last_sync_attempt_utc > self.policy.min_sync_interval_ms
    }

    /// Ask the purchase source for the current truth and reconcile.
    ///
    /// An active purchase supersedes everything. No active purchase with a
    /// known record means the subscription lapsed or was revoked early:
    /// the state drops to `NotEntitled`, except that an expired record
    /// already in survival mode stays there. A source error degrades to a
    /// plain re-evaluation.
    pub fn sync_from_source(&mut self) -> EntitlementResult<EntitlementState> {
        self.last_sync_attempt_utc = self.clock.now_utc_ms();

        match self.purchase_source.query_active_purchase() {
            Ok(Some(purchase)) => {
                self.apply_purchase(&purchase)?;
            }
            Ok(None) => {
                let record = match self.cached_record.clone() {
                    Some(r) => Some(r),
                    None => {
                        let r = self.store.read_record().unwrap_or_else(|e| {
                            log::warn!("record read failed during sync: {e}");
                            None
                        });
                        self.cached_record = r.clone();
                        r
                    }
                };
                if let Some(rec) = record {
                    let expired = self.clock.now_utc_ms() >= rec.last_known_expiry_utc;
                    if self.state == EntitlementState::SurvivalMode && expired {
                        self.publish_state(EntitlementState::SurvivalMode);
                    } else {
                        self.publish_state(EntitlementState::NotEntitled);
                    }
                }
            }
            Err(e) => {
                log::warn!("purchase source unavailable, re-evaluating from cache: {e}");
                return self.evaluate_state();
            }
        }
        Ok(self.state)
    }

    /// Apply a confirmed purchase. Confirmations for foreign products are
    /// ignored and `false` is returned. The new record fully supersedes
    /// any prior one.
    pub fn apply_purchase(&mut self, purchase: &PurchaseConfirmation) -> EntitlementResult<bool> {
        if purchase.product_id != self.policy.product_id_annual {
            log::debug!("ignoring purchase for foreign product {}", purchase.product_id);
            return Ok(false);
        }
        let now = self.clock.now_utc_ms();
        let elapsed = self.clock.elapsed_monotonic_ms();
        let record = SubscriptionRecord::from_purchase(purchase, now, elapsed, &self.policy);
        // Access is granted even when the write fails — the purchase is
        // confirmed, persistence is best effort.
        if let Err(e) = self.store.write_record(&record) {
            log::warn!("record write failed after purchase: {e}");
        }
        self.cached_record = Some(record);
        self.publish_state(EntitlementState::Active);
        Ok(true)
    }

    /// The last verification is old enough that the UI may hint at
    /// verification debt. Never gates access.
    pub fn has_verification_debt(&self) -> bool {
        match &self.cached_record {
            Some(rec) => {
                self.clock.now_utc_ms() - rec.last_verification_utc
                    > self.policy.verification_debt_after_ms
            }
            None => false,
        }
    }

    /// Whether the UI should nudge the user to renew: only when access is
    /// not fully paid-up, survival mode has ever begun, the record is
    /// expired, and the prompt is not currently suppressed.
    pub fn should_show_renewal_prompt(&self) -> bool {
        if self.state == EntitlementState::Active {
            return false;
        }
        let Some(rec) = &self.cached_record else {
            return false;
        };
        if rec.survival_mode_activated_at_utc.is_none() {
            return false;
        }
        let now = self.clock.now_utc_ms();
        if now < rec.last_known_expiry_utc {
            return false;
        }
        let suppress_until = self
            .store
            .get_meta(META_RENEW_PROMPT_SUPPRESS_UNTIL)
            .unwrap_or_else(|e| {
                log::warn!("meta read failed: {e}");
                None
            })
            .unwrap_or(0);
        now >= suppress_until
    }

    pub fn suppress_renewal_prompt(&mut self, days: i64) -> EntitlementResult<()> {
        let until = self.clock.now_utc_ms() + days * DAY_MS;
        self.store.set_meta(META_RENEW_PROMPT_SUPPRESS_UNTIL, until)
    }

    /// Retained transition history, oldest first.
    pub fn transition_log(&self) -> EntitlementResult<Vec<TransitionLogEntry>> {
        self.store.transitions()
    }

    /// Publish a state change: persist it into the record, append to the
    /// bounded transition log, and log. No-op when nothing changed.
    fn publish_state(&mut self, new: EntitlementState) {
        if new == self.state {
            return;
        }
        let old = self.state;
        self.state = new;

        if let Some(rec) = &mut self.cached_record {
            if rec.entitlement_state != new {
                rec.entitlement_state = new;
                if let Err(e) = self.store.write_record(rec) {
                    log::warn!("record write failed on state change: {e}");
                }
            }
        }

        let entry = TransitionLogEntry {
            id: None,
            at_utc: self.clock.now_utc_ms(),
            from_state: old,
            to_state: new,
        };
        if let Err(e) = self
            .store
            .append_transition(&entry, self.policy.transition_log_cap)
        {
            log::warn!("transition log append failed: {e}");
        }
        log::info!("entitlement transition: {old} -> {new}");
    }
}

impl EntitlementProvider for EntitlementManager {
    fn is_feature_access_allowed(&self) -> bool {
        self.state.grants_access()
    }

    fn current_state(&self) -> EntitlementState {
        self.state
    }

    fn access_mode_label(&self) -> &'static str {
        self.state.label()
    }

    fn refresh_if_needed(&mut self, force: bool) -> EntitlementResult<EntitlementState> {
        if force || self.should_attempt_sync() {
            self.sync_from_source()
        } else {
            self.evaluate_state()
        }
    }
}

impl std::fmt::Debug for EntitlementManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementManager")
            .field("state", &self.state)
            .field("cached_record", &self.cached_record)
            .field("last_sync_attempt_utc", &self.last_sync_attempt_utc)
            .finish_non_exhaustive()
    }
}
