// Property tests for the snapshot engine and day-file naming.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use dayledger::correction::build_adjustment;
use dayledger::daily::{parse_file_name, resolve_file_name, NamingScheme};
use dayledger::entries::{EntryBody, LedgerEntry, Leg, NewEntry, Payload};
use dayledger::invariants::InvariantChecks;
use dayledger::snapshot::{apply_entry, replay, reverse_entry, Snapshot};
use dayledger::types::ids::EntryId;
use dayledger::types::money::{Amount, Currency};
use dayledger::utils::helper::sanitize_user_name;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_account() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("bank".to_string()),
        Just("cash".to_string()),
        Just("card".to_string()),
    ]
}

fn arb_currency() -> impl Strategy<Value = Currency> {
    prop_oneof![Just("TWD"), Just("USD"), Just("JPY")].prop_map(|code| Currency::new(code).unwrap())
}

/// Up to 100 million in minor units.
fn arb_amount() -> impl Strategy<Value = Amount> {
    (1i64..10_000_000_000).prop_map(Amount::from_minor)
}

fn arb_leg() -> impl Strategy<Value = Leg> {
    (arb_account(), arb_amount(), arb_currency()).prop_map(|(account, amount, currency)| Leg::new(account, amount, currency))
}

/// Any valid movement (adjustments are built from these separately).
fn arb_body() -> impl Strategy<Value = EntryBody> {
    prop_oneof![
        arb_leg().prop_map(|debit| EntryBody::Expense { debit }),
        arb_leg().prop_map(|credit| EntryBody::Income { credit }),
        (arb_leg(), arb_leg())
            .prop_filter("transfer to itself", |(d, c)| d.account != c.account || d.currency != c.currency)
            .prop_map(|(debit, credit)| EntryBody::Transfer { debit, credit }),
        (arb_leg(), arb_leg())
            .prop_filter("exchange needs two currencies", |(d, c)| d.currency != c.currency)
            .prop_map(|(debit, credit)| EntryBody::Exchange { debit, credit }),
    ]
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
}

fn stamp(new_entry: NewEntry, sequence: u64) -> LedgerEntry {
    let hash = new_entry.content_hash();
    new_entry.into_entry(EntryId::compose("20240301", &hash, sequence), hash, None)
}

fn entries_from(bodies: Vec<EntryBody>) -> Vec<LedgerEntry> {
    bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| {
            let new_entry = NewEntry::new(at(i as i64), Payload::new("misc", "", body)).unwrap();
            stamp(new_entry, i as u64 + 1)
        })
        .collect()
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..40_000).prop_map(|days| NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + chrono::Duration::days(days))
}

// ---------------------------------------------------------------------------
// Inverse law
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn reverse_undoes_apply(
        history in prop::collection::vec(arb_body(), 0..20),
        body in arb_body(),
    ) {
        let start = replay(&Snapshot::empty(), &entries_from(history));
        let entry = stamp(NewEntry::new(at(99_999), Payload::new("x", "", body)).unwrap(), 1_000);

        let after = apply_entry(&start, &entry);
        prop_assert_eq!(reverse_entry(&after, &entry), start.clone());
        prop_assert_eq!(apply_entry(&reverse_entry(&start, &entry), &entry), start);
    }

    #[test]
    fn reverse_undoes_adjustments(
        original in arb_body(),
        replacement in arb_body(),
        history in prop::collection::vec(arb_body(), 0..10),
    ) {
        let original = stamp(NewEntry::new(at(1), Payload::new("x", "", original)).unwrap(), 1);
        let adjustment = build_adjustment(&original, Payload::new("y", "", replacement.clone()), at(2)).unwrap();
        let adjustment = stamp(adjustment, 2);

        let start = replay(&apply_entry(&Snapshot::empty(), &original), &entries_from(history));
        let after = apply_entry(&start, &adjustment);
        prop_assert_eq!(reverse_entry(&after, &adjustment), start);

        // Net effect: as if the replacement had been appended instead.
        let replaced = stamp(NewEntry::new(at(1), Payload::new("y", "", replacement)).unwrap(), 1);
        prop_assert_eq!(
            apply_entry(&apply_entry(&Snapshot::empty(), &original), &adjustment),
            apply_entry(&Snapshot::empty(), &replaced)
        );
    }
}

// ---------------------------------------------------------------------------
// Conservation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn totals_match_account_sums(bodies in prop::collection::vec(arb_body(), 0..40)) {
        let snapshot = replay(&Snapshot::empty(), &entries_from(bodies));
        prop_assert!(InvariantChecks::check_conservation(&snapshot).is_ok());
    }
}

// ---------------------------------------------------------------------------
// File name resolution
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn file_names_are_deterministic(date in arb_date(), user in r"[ -~]{0,24}") {
        let first = resolve_file_name(date, &user);
        let second = resolve_file_name(date, &user);
        prop_assert_eq!(&first, &second);

        let parsed = parse_file_name(&first).unwrap();
        prop_assert_eq!(parsed.scheme, NamingScheme::Current);
        prop_assert_eq!(parsed.date, date);
        prop_assert_eq!(parsed.user, sanitize_user_name(&user));
    }

    #[test]
    fn different_days_never_share_a_name(date in arb_date(), offset in 1i64..1000, user in "[a-z]{1,12}") {
        let other = date + chrono::Duration::days(offset);
        prop_assert_ne!(resolve_file_name(date, &user), resolve_file_name(other, &user));
    }
}
