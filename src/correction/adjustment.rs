use std::collections::{HashMap, HashSet};
use chrono::{DateTime, Utc};
use crate::entries::entry::{EntryBody, LedgerEntry, NewEntry, Payload};
use crate::error::{Error, Result};
use crate::types::ids::EntryId;

/// An entry as it should be displayed: the original's identity and time with
/// the payload of its latest adjustment, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedEntry {
    pub entry: LedgerEntry,
    pub adjusted_by: Option<EntryId>,
}

/// Builds the adjustment that replaces `target`'s payload with `replacement`.
///
/// `target` must be the entry in its current effective form (already merged
/// with any earlier adjustment): its payload becomes `supersedes`, which is
/// what the snapshot engine backs out when the adjustment is applied.
pub fn build_adjustment(target: &LedgerEntry, replacement: Payload, at: DateTime<Utc>) -> Result<NewEntry> {
    if target.is_adjustment() {
        return Err(Error::AdjustmentOfAdjustment(target.id.clone()));
    }
    replacement.validate()?;

    let category = replacement.category.clone();
    let note = replacement.note.clone();
    let body = EntryBody::Adjustment {
        ref_original_id: target.id.clone(),
        replacement: Box::new(replacement),
        supersedes: Box::new(target.payload()),
    };
    NewEntry::new(at, Payload::new(category, note, body))
}

/// Folds adjustments into the entries they correct.
///
/// `ordered` must be in append order. For each original only the last
/// adjustment referencing it counts; earlier ones are dropped. An adjustment
/// whose original is not in `ordered` is kept as a standalone entry so its
/// balance effect is not lost.
pub fn merge_adjustments(ordered: &[LedgerEntry]) -> Vec<MergedEntry> {
    let present: HashSet<&EntryId> = ordered
        .iter()
        .filter(|e| !e.is_adjustment())
        .map(|e| &e.id)
        .collect();

    let mut latest: HashMap<&EntryId, &LedgerEntry> = HashMap::new();
    for entry in ordered {
        if let Some(original) = entry.adjusted_original() {
            latest.insert(original, entry);
        }
    }

    ordered
        .iter()
        .filter_map(|entry| match entry.adjusted_original() {
            Some(original) if present.contains(original) => None,
            Some(_) => Some(MergedEntry {
                entry: entry.clone(),
                adjusted_by: None,
            }),
            None => Some(match latest.get(&entry.id) {
                Some(adjustment) => MergedEntry {
                    entry: merged_view(entry, adjustment),
                    adjusted_by: Some(adjustment.id.clone()),
                },
                None => MergedEntry {
                    entry: entry.clone(),
                    adjusted_by: None,
                },
            }),
        })
        .collect()
}

fn merged_view(original: &LedgerEntry, adjustment: &LedgerEntry) -> LedgerEntry {
    match &adjustment.body {
        EntryBody::Adjustment { replacement, .. } => original.with_payload(replacement),
        _ => original.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::entries::entry::Leg;
    use crate::types::money::{Amount, Currency};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
    }

    fn expense(amount: i64) -> Payload {
        Payload::new(
            "food",
            "",
            EntryBody::Expense {
                debit: Leg::new("A", Amount::from_major(amount), Currency::new("TWD").unwrap()),
            },
        )
    }

    fn stamp(new_entry: NewEntry, seq: u64) -> LedgerEntry {
        let hash = new_entry.content_hash();
        let id = EntryId::compose("20240301", &hash, seq);
        new_entry.into_entry(id, hash, None)
    }

    #[test]
    fn adjustment_carries_replacement_and_superseded_payload() {
        let original = stamp(NewEntry::new(at(0), expense(100)).unwrap(), 1);
        let adjustment = build_adjustment(&original, expense(150), at(5)).unwrap();
        match &adjustment.payload.body {
            EntryBody::Adjustment { ref_original_id, replacement, supersedes } => {
                assert_eq!(ref_original_id, &original.id);
                assert_eq!(**replacement, expense(150));
                assert_eq!(**supersedes, expense(100));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn adjusting_an_adjustment_is_rejected() {
        let original = stamp(NewEntry::new(at(0), expense(100)).unwrap(), 1);
        let adjustment = stamp(build_adjustment(&original, expense(150), at(5)).unwrap(), 2);
        let err = build_adjustment(&adjustment, expense(200), at(6)).unwrap_err();
        assert!(matches!(err, Error::AdjustmentOfAdjustment(_)));
    }

    #[test]
    fn latest_adjustment_wins() {
        let original = stamp(NewEntry::new(at(0), expense(100)).unwrap(), 1);
        let first = stamp(build_adjustment(&original, expense(150), at(5)).unwrap(), 2);
        let merged_once = original.with_payload(&expense(150));
        let second = stamp(build_adjustment(&merged_once, expense(120), at(6)).unwrap(), 3);

        let merged = merge_adjustments(&[original.clone(), first, second.clone()]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].entry.id, original.id);
        assert_eq!(merged[0].entry.timestamp, original.timestamp);
        assert_eq!(merged[0].entry.payload(), expense(120));
        assert_eq!(merged[0].adjusted_by, Some(second.id));
    }

    #[test]
    fn orphan_adjustment_stays_visible() {
        let original = stamp(NewEntry::new(at(0), expense(100)).unwrap(), 1);
        let adjustment = stamp(build_adjustment(&original, expense(150), at(5)).unwrap(), 2);
        let merged = merge_adjustments(&[adjustment.clone()]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].entry, adjustment);
        assert_eq!(merged[0].adjusted_by, None);
    }
}
