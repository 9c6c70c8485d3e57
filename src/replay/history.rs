use std::collections::HashSet;
use std::sync::Arc;
use futures::future::join_all;
use tracing::Instrument;
use crate::correction::merge_adjustments;
use crate::daily::file::DailyLedgerFile;
use crate::daily::manager::{link_to_previous, skip_corrupt, DailyFileManager};
use crate::entries::entry::LedgerEntry;
use crate::error::{Error, Result};
use crate::observability::metrics::HISTORY_LATENCY;
use crate::observability::tracing::trace_history;
use crate::snapshot::{self, reverse_entry, Snapshot};
use crate::types::ids::EntryId;
use crate::utils::helper::sanitize_user_name;

/// One displayed history line: the effective entry and the balances
/// immediately after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryWithSnapshot {
    pub entry: LedgerEntry,
    pub snapshot: Snapshot,
    /// Id of the adjustment whose payload is shown, if the entry was edited.
    pub adjusted_by: Option<EntryId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fidelity {
    /// Rebuilt from the stored day-files.
    Full,
    /// Served from the session's in-memory chain; entries written by other
    /// sessions or on earlier days may be missing.
    Reduced { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryPage {
    /// Newest first.
    pub entries: Vec<EntryWithSnapshot>,
    /// Number of displayable entries before pagination.
    pub total: usize,
    pub offset: usize,
    pub fidelity: Fidelity,
    /// Day-files that could not be decoded and were left out.
    pub skipped_files: Vec<String>,
}

/// Full reconstruction of one user's ledger.
#[derive(Clone, Debug, Default)]
pub struct Reconstruction {
    /// Newest first.
    pub entries: Vec<EntryWithSnapshot>,
    /// Balances after the newest entry.
    pub closing: Snapshot,
    pub skipped_files: Vec<String>,
}

impl Reconstruction {
    pub fn page(&self, offset: usize, limit: usize, fidelity: Fidelity) -> HistoryPage {
        HistoryPage {
            entries: self.entries.iter().skip(offset).take(limit).cloned().collect(),
            total: self.entries.len(),
            offset,
            fidelity,
            skipped_files: self.skipped_files.clone(),
        }
    }
}

/// Merges adjustments into `ordered` (append order) and walks it backward
/// from `closing`, giving every line the balances right after it. Returns
/// newest first.
pub fn annotate_backward(ordered: &[LedgerEntry], closing: &Snapshot) -> Vec<EntryWithSnapshot> {
    let merged = merge_adjustments(ordered);
    let mut lines = Vec::with_capacity(merged.len());
    let mut after = closing.clone();

    for merged_entry in merged.into_iter().rev() {
        let before = reverse_entry(&after, &merged_entry.entry);
        lines.push(EntryWithSnapshot {
            entry: merged_entry.entry,
            snapshot: after,
            adjusted_by: merged_entry.adjusted_by,
        });
        after = before;
    }
    lines
}

/// History Reconstructor
///
/// Rebuilds the displayable history from every day-file of a user.
///
/// ## Ordering
/// Entries are ordered by the date of the file they were appended to, then
/// by the sequence suffix of their id. The user-chosen `timestamp` plays no
/// part: a backdated entry sits where it was appended.
///
/// ## Degradation
/// - A file that cannot be decoded is skipped with a warning and reported in
///   `skipped_files`. Snapshots of lines older than the gap still include the
///   skipped day's effect, since the walk starts from the newest closing.
/// - A failing backing store is returned as an error; falling back to the
///   session chain is the caller's decision.
pub struct HistoryReconstructor {
    manager: Arc<DailyFileManager>,
}

impl HistoryReconstructor {
    pub fn new(manager: Arc<DailyFileManager>) -> Self {
        HistoryReconstructor { manager }
    }

    pub async fn get_page(&self, user_identity: &str, offset: usize, limit: usize) -> Result<HistoryPage> {
        let user = sanitize_user_name(user_identity);
        async {
            let reconstruction = self.reconstruct(&user).await?;
            tracing::debug!(
                "Reconstructed {} entries for {} ({} files skipped)",
                reconstruction.entries.len(),
                user,
                reconstruction.skipped_files.len()
            );
            Ok::<_, Error>(reconstruction.page(offset, limit, Fidelity::Full))
        }
        .instrument(trace_history(&user, offset, limit))
        .await
    }

    pub async fn reconstruct(&self, user_identity: &str) -> Result<Reconstruction> {
        let _timer = HISTORY_LATENCY.start_timer();

        let handles = self.manager.list_day_files(user_identity).await?;
        let reads = join_all(handles.iter().map(|handle| self.manager.read(handle))).await;

        let mut files: Vec<DailyLedgerFile> = Vec::with_capacity(handles.len());
        let mut skipped_files = Vec::new();
        for (handle, read) in handles.iter().zip(reads) {
            let decoded = match read {
                Ok(decoded) => decoded,
                Err(e) if e.is_persistence() => return Err(e),
                Err(e) => {
                    skip_corrupt(&handle.name, &e);
                    skipped_files.push(handle.name.clone());
                    continue;
                }
            };

            let mut file = decoded.file;
            if decoded.from_legacy {
                link_to_previous(&mut file, files.last())?;
            } else {
                trust_replay(&mut file, &handle.name);
            }
            files.push(file);
        }

        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for file in &files {
            let mut entries: Vec<&LedgerEntry> = file.entries.iter().collect();
            entries.sort_by_key(|e| e.id.sequence().unwrap_or(u64::MAX));
            for entry in entries {
                if seen.insert(entry.id.clone()) {
                    ordered.push(entry.clone());
                } else {
                    tracing::debug!("Entry {} stored twice; keeping the first copy", entry.id);
                }
            }
        }

        let closing = files
            .last()
            .map(|f| f.header.balances_snapshot.clone())
            .unwrap_or_default();

        Ok(Reconstruction {
            entries: annotate_backward(&ordered, &closing),
            closing,
            skipped_files,
        })
    }
}

// A stored header that disagrees with its own entries is repaired in memory.
fn trust_replay(file: &mut DailyLedgerFile, name: &str) {
    let replayed = snapshot::replay(&file.header.opening_balances, &file.entries);
    if replayed != file.header.balances_snapshot {
        tracing::warn!("Header balances of {} differ from its entries; using the replay", name);
        file.header.balances_snapshot = replayed;
    }
}
