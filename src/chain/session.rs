use std::collections::HashMap;
use chrono::NaiveDate;
use uuid::Uuid;
use crate::daily::manager::AppendOutcome;
use crate::entries::entry::{LedgerEntry, NewEntry};
use crate::replay::history::{annotate_backward, EntryWithSnapshot};
use crate::snapshot::{apply_entry, Snapshot};
use crate::types::ids::EntryId;

/// Id scope of entries that only ever live in a guest session.
const SESSION_SCOPE: &str = "session";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    /// The chain is the whole ledger; nothing is persisted.
    Guest,
    /// The chain mirrors what this session wrote; day-files are the truth.
    Authenticated,
}

#[derive(Clone, Debug)]
struct ChainLink {
    entry: LedgerEntry,
    snapshot: Snapshot,
    prev: Option<EntryId>,
}

/// Session-scoped pointer to the latest entry and its snapshot.
///
/// One instance per session, owned by the `LedgerService` that created it.
/// In guest mode it also keeps every entry by id and is the only store.
#[derive(Debug)]
pub struct SessionChain {
    session_id: Uuid,
    mode: SessionMode,
    base: Snapshot,
    head: Option<EntryId>,
    links: HashMap<EntryId, ChainLink>,
    order: Vec<EntryId>,
    // Guest duplicates are detected per calendar day, like day-files.
    hashes: HashMap<(NaiveDate, String), EntryId>,
    next_sequence: u64,
}

impl SessionChain {
    pub fn new(mode: SessionMode) -> Self {
        SessionChain {
            session_id: Uuid::new_v4(),
            mode,
            base: Snapshot::empty(),
            head: None,
            links: HashMap::new(),
            order: Vec::new(),
            hashes: HashMap::new(),
            next_sequence: 1,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Stamps `new_entry`, applies it to the latest snapshot and moves the
    /// pointer. Same content hash as an entry already appended on `date` is a
    /// no-op; the same content on another day is a new entry.
    pub fn append(&mut self, date: NaiveDate, new_entry: NewEntry) -> AppendOutcome {
        let content_hash = new_entry.content_hash();
        let key = (date, content_hash);
        if let Some(existing) = self.hashes.get(&key).and_then(|id| self.links.get(id)) {
            tracing::debug!("Duplicate entry {} ignored in session {}", existing.entry.id, self.session_id);
            return AppendOutcome::Duplicate {
                existing: existing.entry.clone(),
                balances: self.current_snapshot(),
            };
        }

        let (date, content_hash) = key;
        let id = EntryId::compose(SESSION_SCOPE, &content_hash, self.next_sequence);
        let entry = new_entry.into_entry(id.clone(), content_hash.clone(), self.head.clone());
        let snapshot = apply_entry(&self.current_snapshot(), &entry);
        self.link(entry.clone(), snapshot.clone());
        self.hashes.insert((date, content_hash), id);

        AppendOutcome::Appended {
            entry,
            balances: snapshot,
        }
    }

    /// Records an entry already persisted elsewhere together with the
    /// balances after it. Only an entry with the same id is skipped; equal
    /// content stored in another day-file is a distinct entry.
    pub fn adopt(&mut self, entry: LedgerEntry, snapshot: Snapshot) {
        if self.links.contains_key(&entry.id) {
            return;
        }
        self.link(entry, snapshot);
    }

    /// Drops every held entry and restarts from `base`.
    pub fn reset(&mut self, base: Snapshot) {
        self.base = base;
        self.head = None;
        self.links.clear();
        self.order.clear();
        self.hashes.clear();
        self.next_sequence = 1;
    }

    /// Snapshot of the latest entry, or the base snapshot when there is none.
    pub fn current_snapshot(&self) -> Snapshot {
        self.head
            .as_ref()
            .and_then(|id| self.links.get(id))
            .map(|link| link.snapshot.clone())
            .unwrap_or_else(|| self.base.clone())
    }

    pub fn latest(&self) -> Option<&LedgerEntry> {
        self.head
            .as_ref()
            .and_then(|id| self.links.get(id))
            .map(|link| &link.entry)
    }

    pub fn get(&self, id: &EntryId) -> Option<&LedgerEntry> {
        self.links.get(id).map(|link| &link.entry)
    }

    /// Id of the entry held before `id`.
    pub fn previous(&self, id: &EntryId) -> Option<&EntryId> {
        self.links.get(id).and_then(|link| link.prev.as_ref())
    }

    /// Held entries in append order, adjustments included.
    pub fn entries_in_order(&self) -> Vec<LedgerEntry> {
        self.order
            .iter()
            .filter_map(|id| self.links.get(id))
            .map(|link| link.entry.clone())
            .collect()
    }

    /// Held entries with adjustments merged, newest first.
    pub fn history(&self) -> Vec<EntryWithSnapshot> {
        annotate_backward(&self.entries_in_order(), &self.current_snapshot())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn link(&mut self, entry: LedgerEntry, snapshot: Snapshot) {
        let id = entry.id.clone();
        self.links.insert(id.clone(), ChainLink {
            entry,
            snapshot,
            prev: self.head.take(),
        });
        self.order.push(id.clone());
        self.head = Some(id);
        self.next_sequence += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::entries::entry::{EntryBody, Leg, Payload};
    use crate::types::ids::AccountId;
    use crate::types::money::{Amount, Currency};

    fn twd() -> Currency {
        Currency::new("TWD").unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn entry(minute: u32, body: EntryBody) -> NewEntry {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap();
        NewEntry::new(at, Payload::new("misc", "", body)).unwrap()
    }

    #[test]
    fn empty_chain_reports_empty_snapshot() {
        let chain = SessionChain::new(SessionMode::Guest);
        assert_eq!(chain.current_snapshot(), Snapshot::empty());
        assert!(chain.latest().is_none());
    }

    #[test]
    fn guest_chain_is_a_complete_ledger() {
        let mut chain = SessionChain::new(SessionMode::Guest);
        let income = chain.append(day(1), entry(0, EntryBody::Income {
            credit: Leg::new("bank", Amount::from_major(30000), twd()),
        }));
        let expense = chain.append(day(1), entry(1, EntryBody::Expense {
            debit: Leg::new("cash", Amount::from_major(100), twd()),
        }));

        let snapshot = chain.current_snapshot();
        assert_eq!(snapshot.total(&twd()), Amount::from_major(29900));
        assert_eq!(snapshot.balance(&AccountId::from("cash"), &twd()), Amount::from_major(-100));
        assert_eq!(chain.latest().map(|e| &e.id), Some(&expense.entry().id));
        assert_eq!(chain.previous(&expense.entry().id), Some(&income.entry().id));
        assert_eq!(expense.entry().prev_id.as_ref(), Some(&income.entry().id));
        assert_eq!(chain.history().len(), 2);
    }

    #[test]
    fn guest_duplicates_are_ignored() {
        let mut chain = SessionChain::new(SessionMode::Guest);
        let body = EntryBody::Expense {
            debit: Leg::new("cash", Amount::from_major(100), twd()),
        };
        chain.append(day(1), entry(0, body.clone()));
        let again = chain.append(day(1), entry(0, body));
        assert!(again.is_duplicate());
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn same_content_on_another_day_is_a_new_entry() {
        let mut chain = SessionChain::new(SessionMode::Guest);
        let body = EntryBody::Expense {
            debit: Leg::new("cash", Amount::from_major(50), twd()),
        };
        let monday = chain.append(day(1), entry(0, body.clone()));
        let tuesday = chain.append(day(2), entry(0, body));

        assert!(!tuesday.is_duplicate());
        assert_ne!(tuesday.entry().id, monday.entry().id);
        assert_eq!(chain.len(), 2);
        assert_eq!(
            chain.current_snapshot().balance(&AccountId::from("cash"), &twd()),
            Amount::from_major(-100)
        );
    }

    #[test]
    fn adopt_keeps_equal_content_under_distinct_ids() {
        let mut chain = SessionChain::new(SessionMode::Authenticated);
        let body = EntryBody::Expense {
            debit: Leg::new("cash", Amount::from_major(50), twd()),
        };
        let hash = entry(0, body.clone()).content_hash();
        let first = entry(0, body.clone()).into_entry(EntryId::compose("20240301", &hash, 1), hash.clone(), None);
        let second = entry(0, body).into_entry(EntryId::compose("20240302", &hash, 1), hash, None);

        let mut after_first = Snapshot::empty();
        after_first.shift(&AccountId::from("cash"), &twd(), Amount::from_major(-50));
        let mut after_second = after_first.clone();
        after_second.shift(&AccountId::from("cash"), &twd(), Amount::from_major(-50));

        chain.adopt(first.clone(), after_first.clone());
        chain.adopt(second.clone(), after_second.clone());
        chain.adopt(first, after_first);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.latest().map(|e| &e.id), Some(&second.id));
        assert_eq!(chain.current_snapshot(), after_second);
    }

    #[test]
    fn sessions_do_not_share_state() {
        let mut first = SessionChain::new(SessionMode::Guest);
        let second = SessionChain::new(SessionMode::Guest);
        first.append(day(1), entry(0, EntryBody::Income {
            credit: Leg::new("bank", Amount::from_major(1), twd()),
        }));
        assert_ne!(first.session_id(), second.session_id());
        assert!(second.is_empty());
    }
}
