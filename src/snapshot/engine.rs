use crate::entries::entry::{EntryBody, LedgerEntry, Leg};
use crate::snapshot::state::Snapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn inverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Snapshot after `entry`, given the snapshot before it.
///
/// - expense: debit leg leaves its account
/// - income: credit leg enters its account
/// - transfer / exchange: debit leaves, credit enters; the legs may differ in
///   amount and currency, which is how an exchange carries its rate
/// - adjustment: the superseded payload is backed out and the replacement
///   applied in its place
pub fn apply_entry(snapshot: &Snapshot, entry: &LedgerEntry) -> Snapshot {
    let mut next = snapshot.clone();
    apply_body(&mut next, &entry.body, Direction::Forward);
    next
}

/// Snapshot before `entry`, given the snapshot after it. Exact inverse of
/// [`apply_entry`]: `reverse_entry(&apply_entry(s, e), e) == *s`.
pub fn reverse_entry(snapshot: &Snapshot, entry: &LedgerEntry) -> Snapshot {
    let mut previous = snapshot.clone();
    apply_body(&mut previous, &entry.body, Direction::Backward);
    previous
}

/// Folds `entries` in order over `start`.
pub fn replay<'a, I>(start: &Snapshot, entries: I) -> Snapshot
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut snapshot = start.clone();
    for entry in entries {
        apply_body(&mut snapshot, &entry.body, Direction::Forward);
    }
    snapshot
}

fn apply_body(snapshot: &mut Snapshot, body: &EntryBody, direction: Direction) {
    match body {
        EntryBody::Expense { debit } => outflow(snapshot, debit, direction),
        EntryBody::Income { credit } => inflow(snapshot, credit, direction),
        EntryBody::Transfer { debit, credit } | EntryBody::Exchange { debit, credit } => {
            outflow(snapshot, debit, direction);
            inflow(snapshot, credit, direction);
        }
        EntryBody::Adjustment { replacement, supersedes, .. } => {
            apply_body(snapshot, &supersedes.body, direction.inverse());
            apply_body(snapshot, &replacement.body, direction);
        }
    }
}

fn inflow(snapshot: &mut Snapshot, leg: &Leg, direction: Direction) {
    let delta = match direction {
        Direction::Forward => leg.amount,
        Direction::Backward => -leg.amount,
    };
    snapshot.shift(&leg.account, &leg.currency, delta);
}

fn outflow(snapshot: &mut Snapshot, leg: &Leg, direction: Direction) {
    inflow(snapshot, leg, direction.inverse());
}
