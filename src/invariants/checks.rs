use std::collections::{BTreeMap, HashSet};
use crate::daily::file::DailyLedgerFile;
use crate::error::{Error, InvariantViolation, Result};
use crate::snapshot::{self, Snapshot};
use crate::types::money::{Amount, Currency};

pub struct InvariantChecks;

impl InvariantChecks {
    /// Per-currency totals equal the sum of that currency over all accounts.
    pub fn check_conservation(snapshot: &Snapshot) -> Result<()> {
        let mut summed: BTreeMap<&Currency, Amount> = BTreeMap::new();
        for per_currency in snapshot.balances.values() {
            for (currency, amount) in per_currency.iter() {
                *summed.entry(currency).or_default() += *amount;
            }
        }

        for currency in snapshot.totals.keys().chain(summed.keys().copied()) {
            let expected = summed.get(currency).copied().unwrap_or_default();
            let total = snapshot.total(currency);
            if total != expected {
                return Err(Error::InvariantViolation(InvariantViolation {
                    invariant: "conservation",
                    details: format!(
                        "Total for {} is {} but account balances sum to {}",
                        currency, total, expected
                    ),
                }));
            }
        }
        Ok(())
    }

    /// Derived header fields agree with the entries, and entries are unique
    /// and chained in append order.
    pub fn check_file_consistency(file: &DailyLedgerFile) -> Result<()> {
        let violation = |details: String| {
            Err(Error::InvariantViolation(InvariantViolation {
                invariant: "day_file_consistency",
                details: format!("{} {}: {}", file.header.date, file.header.user, details),
            }))
        };

        if file.header.sequence_count != file.entries.len() as u64 {
            return violation(format!(
                "sequenceCount {} but {} entries",
                file.header.sequence_count,
                file.entries.len()
            ));
        }

        let mut ids = HashSet::new();
        let mut hashes = HashSet::new();
        for (index, entry) in file.entries.iter().enumerate() {
            if !ids.insert(&entry.id) {
                return violation(format!("entry id {} appears twice", entry.id));
            }
            if !hashes.insert(entry.content_hash.as_str()) {
                return violation(format!("content hash of {} appears twice", entry.id));
            }
            let expected_prev = index.checked_sub(1).map(|i| &file.entries[i].id);
            if index > 0 && entry.prev_id.as_ref() != expected_prev {
                return violation(format!("entry {} does not point at its predecessor", entry.id));
            }
        }

        let replayed = snapshot::replay(&file.header.opening_balances, &file.entries);
        if replayed != file.header.balances_snapshot {
            return violation("balancesSnapshot differs from a replay of the entries".to_string());
        }

        Self::check_conservation(&file.header.balances_snapshot)
    }
}
