//! Store behavior: single-slot record round trips, the absent-vs-zero
//! survival timestamp distinction, and the bounded transition log.

use crisis_core::{
    record::{EntitlementState, SubscriptionRecord},
    store::{EntitlementStore, TransitionLogEntry},
};

fn sample_record() -> SubscriptionRecord {
    SubscriptionRecord {
        purchase_start_utc: 1_700_000_000_000,
        last_known_expiry_utc: 1_731_536_000_000,
        last_verification_utc: 1_700_000_100_000,
        system_elapsed_realtime_at_verification: 42_000,
        purchase_token: "tok-abc".into(),
        entitlement_state: EntitlementState::Active,
        survival_mode_activated_at_utc: None,
        clock_suspicious: false,
        auto_renewing: true,
    }
}

fn open_store() -> EntitlementStore {
    let store = EntitlementStore::in_memory().unwrap();
    store.migrate().unwrap();
    store
}

#[test]
fn read_empty_returns_none() {
    let store = open_store();
    assert!(store.read_record().unwrap().is_none());
}

#[test]
fn record_round_trip() {
    let store = open_store();
    let rec = sample_record();

    store.write_record(&rec).unwrap();
    let read = store.read_record().unwrap().unwrap();

    assert_eq!(read, rec);
}

#[test]
fn absent_survival_timestamp_is_distinct_from_zero() {
    let store = open_store();

    let mut rec = sample_record();
    store.write_record(&rec).unwrap();
    assert_eq!(
        store.read_record().unwrap().unwrap().survival_mode_activated_at_utc,
        None
    );

    rec.survival_mode_activated_at_utc = Some(0);
    store.write_record(&rec).unwrap();
    assert_eq!(
        store.read_record().unwrap().unwrap().survival_mode_activated_at_utc,
        Some(0)
    );
}

#[test]
fn write_overwrites_the_single_slot() {
    let store = open_store();

    let first = sample_record();
    store.write_record(&first).unwrap();

    let mut second = sample_record();
    second.purchase_token = "tok-replacement".into();
    second.entitlement_state = EntitlementState::SurvivalMode;
    second.survival_mode_activated_at_utc = Some(1_731_536_000_001);
    store.write_record(&second).unwrap();

    let read = store.read_record().unwrap().unwrap();
    assert_eq!(read, second, "the slot holds only the latest record");
}

#[test]
fn unknown_state_string_reads_as_not_entitled() {
    // A record written by a future version may carry a state this build
    // does not know; the safe default applies.
    assert_eq!(
        EntitlementState::parse("grace_plus"),
        EntitlementState::NotEntitled
    );
}

#[test]
fn transition_log_is_capped() {
    let store = open_store();
    let cap = 50;

    for i in 0..60 {
        let entry = TransitionLogEntry {
            id: None,
            at_utc: 1_000 + i,
            from_state: EntitlementState::Active,
            to_state: EntitlementState::SurvivalMode,
        };
        store.append_transition(&entry, cap).unwrap();
    }

    let entries = store.transitions().unwrap();
    assert_eq!(entries.len(), cap);
    // The oldest ten lines were trimmed.
    assert_eq!(entries.first().unwrap().at_utc, 1_010);
    assert_eq!(entries.last().unwrap().at_utc, 1_059);
}

#[test]
fn transitions_come_back_oldest_first() {
    let store = open_store();

    let states = [
        (EntitlementState::NotEntitled, EntitlementState::Active),
        (EntitlementState::Active, EntitlementState::SurvivalMode),
        (EntitlementState::SurvivalMode, EntitlementState::Active),
    ];
    for (i, (from, to)) in states.iter().enumerate() {
        store
            .append_transition(
                &TransitionLogEntry {
                    id: None,
                    at_utc: i as i64,
                    from_state: *from,
                    to_state: *to,
                },
                50,
            )
            .unwrap();
    }

    let entries = store.transitions().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].from_state, EntitlementState::NotEntitled);
    assert_eq!(entries[2].to_state, EntitlementState::Active);
}

#[test]
fn meta_round_trip() {
    let store = open_store();

    assert_eq!(store.get_meta("renew_prompt_suppress_until").unwrap(), None);
    store.set_meta("renew_prompt_suppress_until", 123_456).unwrap();
    assert_eq!(
        store.get_meta("renew_prompt_suppress_until").unwrap(),
        Some(123_456)
    );
    store.set_meta("renew_prompt_suppress_until", 654_321).unwrap();
    assert_eq!(
        store.get_meta("renew_prompt_suppress_until").unwrap(),
        Some(654_321)
    );
}
