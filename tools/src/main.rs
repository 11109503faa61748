//! entitlement-runner: headless CLI for the Crisis AI entitlement engine.
//!
//! Usage:
//!   entitlement-runner status --db ent.db
//!   entitlement-runner evaluate --db ent.db --has-content
//!   entitlement-runner evaluate --db ent.db --now 1700000000000 --elapsed 50000
//!   entitlement-runner apply-purchase --db ent.db --token tok123 --start 1700000000000
//!   entitlement-runner log --db ent.db
//!   entitlement-runner suppress-prompt --db ent.db --days 7

use anyhow::Result;
use crisis_core::{
    clock::{Clock, ManualClock, SystemClock},
    manager::{ContentInventory, EntitlementManager, EntitlementProvider},
    policy::EntitlementPolicy,
    purchase::{NullPurchaseSource, PurchaseConfirmation},
    record::SubscriptionRecord,
    store::EntitlementStore,
    types::TimestampMs,
};
use std::env;

#[derive(serde::Serialize)]
struct StatusView {
    state: String,
    access_allowed: bool,
    verification_debt: bool,
    renewal_prompt_due: bool,
    record: Option<SubscriptionRecord>,
    transition_count: usize,
}

/// Fixed content-availability signal supplied on the command line. The
/// real application derives this from its model inventory.
struct FlagInventory(bool);

impl ContentInventory for FlagInventory {
    fn has_local_content(&self) -> bool {
        self.0
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let has_content = args.iter().any(|a| a == "--has-content");

    let store = EntitlementStore::open(db)?;
    store.migrate()?;

    let policy = match str_arg(&args, "--policy") {
        Some(path) => EntitlementPolicy::load(path)?,
        None => EntitlementPolicy::default(),
    };

    // --now/--elapsed pin the clock for reproducible runs; otherwise the
    // system clock is used.
    let clock: Box<dyn Clock> = match (i64_arg(&args, "--now"), i64_arg(&args, "--elapsed")) {
        (None, None) => Box::new(SystemClock::new()),
        (now, elapsed) => Box::new(ManualClock::new(
            now.unwrap_or_else(current_millis),
            elapsed.unwrap_or(0),
        )),
    };

    let mut manager = EntitlementManager::new(
        store,
        Box::new(NullPurchaseSource),
        Box::new(FlagInventory(has_content)),
        clock,
        policy,
    );

    match command {
        "status" => {
            manager.evaluate_state()?;
            print_status(&manager)?;
        }
        "evaluate" => {
            let force = args.iter().any(|a| a == "--force");
            manager.refresh_if_needed(force)?;
            print_status(&manager)?;
        }
        "apply-purchase" => {
            let purchase = PurchaseConfirmation {
                product_id: str_arg(&args, "--product")
                    .unwrap_or("crisis_ai_annual")
                    .to_string(),
                purchase_time_utc: i64_arg(&args, "--start").unwrap_or(0),
                token: str_arg(&args, "--token").unwrap_or("").to_string(),
                auto_renewing: !args.iter().any(|a| a == "--no-auto-renew"),
            };
            let applied = manager.apply_purchase(&purchase)?;
            if !applied {
                log::warn!("purchase ignored: unknown product {}", purchase.product_id);
            }
            print_status(&manager)?;
        }
        "log" => {
            for entry in manager.transition_log()? {
                println!("{entry}");
            }
        }
        "suppress-prompt" => {
            let days = i64_arg(&args, "--days").unwrap_or(1);
            manager.evaluate_state()?;
            manager.suppress_renewal_prompt(days)?;
            println!("renewal prompt suppressed for {days} day(s)");
        }
        other => {
            anyhow::bail!(
                "unknown command '{other}' (expected status | evaluate | apply-purchase | log | suppress-prompt)"
            );
        }
    }

    Ok(())
}

fn print_status(manager: &EntitlementManager) -> Result<()> {
    let view = StatusView {
        state: manager.access_mode_label().to_string(),
        access_allowed: manager.is_feature_access_allowed(),
        verification_debt: manager.has_verification_debt(),
        renewal_prompt_due: manager.should_show_renewal_prompt(),
        record: manager.current_record().cloned(),
        transition_count: manager.transition_log()?.len(),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn str_arg<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn i64_arg(args: &[String], name: &str) -> Option<i64> {
    str_arg(args, name).and_then(|v| v.parse().ok())
}

fn current_millis() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
