use chrono::NaiveDate;
use tracing::Span;
use crate::entries::entry::EntryKind;

pub fn trace_append(user: &str, date: NaiveDate, kind: EntryKind) -> Span {
    tracing::info_span!(
        "ledger_append",
        user = %user,
        date = %date,
        kind = %kind,
    )
}

pub fn trace_find_or_create(user: &str, date: NaiveDate) -> Span {
    tracing::info_span!(
        "day_file_resolve",
        user = %user,
        date = %date,
    )
}

pub fn trace_history(user: &str, offset: usize, limit: usize) -> Span {
    tracing::info_span!(
        "history_reconstruction",
        user = %user,
        offset,
        limit,
    )
}
