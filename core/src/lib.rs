//! crisis-core — the Crisis AI entitlement engine.
//!
//! Decides whether a user retains access to the app given the persisted
//! subscription record, the current wall clock, elapsed monotonic time,
//! and whether usable offline content exists. The engine tolerates clock
//! tampering and prolonged offline periods without ever hard-locking the
//! user out: ambiguity resolves toward access (survival mode), by policy.
//!
//! Layout:
//!   - [`evaluator`] — the pure decision function.
//!   - [`manager`]   — stateful shell: persistence, purchase sync,
//!     transition log, published state.
//!   - [`store`]     — SQLite persistence (only module that touches SQL).
//!   - [`purchase`], [`clock`] — external-collaborator seams.

pub mod clock;
pub mod error;
pub mod evaluator;
pub mod manager;
pub mod policy;
pub mod purchase;
pub mod record;
pub mod store;
pub mod types;
