pub mod entry;
pub mod request;

pub use entry::{EntryBody, EntryKind, LedgerEntry, Leg, NewEntry, Payload};
pub use request::{AppendOptions, EntryRequest};
