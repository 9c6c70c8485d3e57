use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OnceCell};
use tracing::Instrument;
use crate::daily::file::DailyLedgerFile;
use crate::daily::legacy::{self, Decoded};
use crate::daily::naming::{NamingScheme, ParsedName, RESOLVER_ORDER};
use crate::entries::entry::{LedgerEntry, NewEntry};
use crate::error::{Error, Result};
use crate::interfaces::blob_store::{BlobStore, FileMeta, FileQuery};
use crate::invariants::InvariantChecks;
use crate::observability::metrics::{
    record_store_error, ADJUSTMENTS_APPENDED, CORRUPT_FILES_SKIPPED, DAY_FILES_CREATED,
    DAY_FILES_MIGRATED, DUPLICATE_APPENDS, ENTRIES_APPENDED,
};
use crate::observability::tracing::trace_find_or_create;
use crate::snapshot::Snapshot;
use crate::types::ids::{EntryId, FileId, FolderId};
use crate::types::money::Currency;
use crate::utils::helper::{compact_date, sanitize_user_name};

/// Reference to one stored day-file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHandle {
    pub file_id: FileId,
    pub name: String,
    pub scheme: NamingScheme,
    pub date: NaiveDate,
    /// Sanitized user name, as it appears in the file name.
    pub user: String,
}

impl FileHandle {
    fn from_meta(meta: &FileMeta, parsed: ParsedName) -> Self {
        FileHandle {
            file_id: meta.id.clone(),
            name: meta.name.clone(),
            scheme: parsed.scheme,
            date: parsed.date,
            user: parsed.user,
        }
    }

    fn parsed(&self) -> ParsedName {
        ParsedName {
            scheme: self.scheme,
            date: self.date,
            user: self.user.clone(),
        }
    }
}

/// What `append_entry` did. A duplicate is a successful no-op.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended {
        entry: LedgerEntry,
        balances: Snapshot,
    },
    Duplicate {
        existing: LedgerEntry,
        balances: Snapshot,
    },
}

impl AppendOutcome {
    pub fn entry(&self) -> &LedgerEntry {
        match self {
            AppendOutcome::Appended { entry, .. } => entry,
            AppendOutcome::Duplicate { existing, .. } => existing,
        }
    }

    /// Closing balances of the day-file after the call.
    pub fn balances(&self) -> &Snapshot {
        match self {
            AppendOutcome::Appended { balances, .. } | AppendOutcome::Duplicate { balances, .. } => balances,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppendOutcome::Duplicate { .. })
    }
}

/// Daily Ledger File Manager
///
/// Maps `(date, user)` to exactly one stored day-file and appends entries to
/// it by read-modify-write.
///
/// ## Resolution
/// - Session cache first: every handle created or resolved in this session is
///   remembered, so a listing that lags behind a create cannot cause a second
///   file for the same day.
/// - Then one exact-name lookup per naming scheme, current scheme first. When
///   several files share the name, the oldest one wins.
/// - A legacy hit is decoded through the legacy shim, linked to the previous
///   day, rewritten in the current format and renamed in place.
/// - Nothing found: a new file is created whose opening balances, rates and
///   `prevFileHash` come from the latest prior day-file.
///
/// ## Writes
/// - One `update_file` per append carrying the whole new content. A failed
///   write leaves the stored file as it was.
/// - No retry here; persistence errors go back to the caller.
/// - Appends to the same file through one manager are serialized from the
///   read to the write, and resolution of a missing day runs one at a time.
///   Writers in other processes are not coordinated and can lose updates.
pub struct DailyFileManager {
    store: Arc<dyn BlobStore>,
    folder_name: String,
    signer: String,
    default_currency: Currency,
    legacy_migration: bool,
    folder: OnceCell<FolderId>,
    known_files: DashMap<(NaiveDate, String), FileHandle>,
    write_locks: DashMap<FileId, Arc<Mutex<()>>>,
    resolving: Mutex<()>,
}

impl DailyFileManager {
    pub fn new(
        store: Arc<dyn BlobStore>,
        folder_name: impl Into<String>,
        signer: impl Into<String>,
        default_currency: Currency,
        legacy_migration: bool,
    ) -> Self {
        DailyFileManager {
            store,
            folder_name: folder_name.into(),
            signer: signer.into(),
            default_currency,
            legacy_migration,
            folder: OnceCell::new(),
            known_files: DashMap::new(),
            write_locks: DashMap::new(),
            resolving: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Folder holding the day-files, created on first use.
    pub async fn folder(&self) -> Result<FolderId> {
        self.folder
            .get_or_try_init(|| async {
                self.store.ensure_folder(&self.folder_name).await.map_err(observed)
            })
            .await
            .cloned()
    }

    /// Resolves the day-file for `(date, user_identity)`, creating or
    /// migrating it when needed, and returns it with its current content.
    pub async fn find_or_create(&self, date: NaiveDate, user_identity: &str) -> Result<(FileHandle, DailyLedgerFile)> {
        let user = sanitize_user_name(user_identity);
        self.resolve(date, &user)
            .instrument(trace_find_or_create(&user, date))
            .await
    }

    async fn resolve(&self, date: NaiveDate, user: &str) -> Result<(FileHandle, DailyLedgerFile)> {
        if let Some(handle) = self.cached(date, user) {
            let file = self.load(&handle).await?;
            return Ok((handle, file));
        }

        let _resolving = self.resolving.lock().await;
        if let Some(handle) = self.cached(date, user) {
            let file = self.load(&handle).await?;
            return Ok((handle, file));
        }

        let folder = self.folder().await?;
        for scheme in self.schemes() {
            let name = scheme.file_name(date, user);
            let hits = self.list(&FileQuery::in_folder_named(&folder, name.as_str())).await?;
            let Some(meta) = oldest(hits, &name) else {
                continue;
            };

            let parsed = ParsedName { scheme, date, user: user.to_string() };
            let handle = FileHandle::from_meta(&meta, parsed);
            let resolved = if scheme.is_legacy() {
                self.migrate(handle).await?
            } else {
                let file = self.load(&handle).await?;
                (handle, file)
            };
            self.remember(&resolved.0);
            return Ok(resolved);
        }

        let resolved = self.create(&folder, date, user).await?;
        self.remember(&resolved.0);
        Ok(resolved)
    }

    /// Appends `new_entry` to the day-file behind `handle`.
    ///
    /// Skips the write when an entry with the same content hash is already
    /// stored. Otherwise the entry gets the next intra-day sequence number and
    /// the header is rebuilt from a full replay before the whole file is
    /// written back.
    pub async fn append_entry(&self, handle: &FileHandle, new_entry: NewEntry) -> Result<AppendOutcome> {
        let lock = self.write_lock(&handle.file_id);
        let _writing = lock.lock().await;

        let mut file = self.load(handle).await?;
        let content_hash = new_entry.content_hash();

        if let Some(existing) = file.find_by_hash(&content_hash) {
            DUPLICATE_APPENDS.inc();
            tracing::info!("Duplicate entry {} ignored in {}", existing.id, handle.name);
            return Ok(AppendOutcome::Duplicate {
                existing: existing.clone(),
                balances: file.header.balances_snapshot.clone(),
            });
        }

        let id = EntryId::compose(&compact_date(handle.date), &content_hash, file.next_sequence());
        let prev_id = file.last_entry_id().cloned();
        let entry = new_entry.into_entry(id, content_hash, prev_id);
        file.push(entry.clone());
        file.reseal(&self.signer)?;
        InvariantChecks::check_file_consistency(&file)?;

        let bytes = file.encode()?;
        self.store
            .update_file(&handle.file_id, bytes, None)
            .await
            .map_err(observed)?;

        ENTRIES_APPENDED.inc();
        if entry.is_adjustment() {
            ADJUSTMENTS_APPENDED.inc();
        }
        tracing::debug!(
            "Appended {} entry {} to {} ({} entries)",
            entry.kind(),
            entry.id,
            handle.name,
            file.entries.len()
        );

        Ok(AppendOutcome::Appended {
            entry,
            balances: file.header.balances_snapshot,
        })
    }

    pub async fn load(&self, handle: &FileHandle) -> Result<DailyLedgerFile> {
        self.read(handle).await.map(|decoded| decoded.file)
    }

    /// Reads and decodes a day-file in whatever format it is stored in.
    /// Signature mismatches are logged, not rejected.
    pub async fn read(&self, handle: &FileHandle) -> Result<Decoded> {
        let bytes = self.store.read_file(&handle.file_id).await.map_err(observed)?;
        let decoded = legacy::decode_any(
            &bytes,
            &handle.name,
            &handle.parsed(),
            &self.default_currency,
            &self.signer,
        )?;

        if !decoded.from_legacy && !decoded.file.signature_matches() {
            tracing::warn!("Signature mismatch in {}; content used as stored", handle.name);
        }
        Ok(decoded)
    }

    /// Every day-file of `user_identity` visible to this session, oldest day
    /// first. Includes files created in this session that listings do not
    /// show yet. When a day exists under both naming schemes the current one
    /// is kept.
    pub async fn list_day_files(&self, user_identity: &str) -> Result<Vec<FileHandle>> {
        let user = sanitize_user_name(user_identity);
        let folder = self.folder().await?;

        let mut by_day: BTreeMap<NaiveDate, FileHandle> = BTreeMap::new();
        for scheme in self.schemes() {
            let mut hits = self.list(&scheme.listing_query(&folder, &user)).await?;
            hits.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            for meta in hits {
                let Some(parsed) = scheme.parse(&meta.name) else {
                    continue;
                };
                if parsed.user != user {
                    continue;
                }
                if let Some(kept) = by_day.get(&parsed.date) {
                    tracing::debug!("Ignoring {} in favour of {}", meta.name, kept.name);
                    continue;
                }
                by_day.insert(parsed.date, FileHandle::from_meta(&meta, parsed));
            }
        }

        for known in self.known_files.iter().filter(|h| h.user == user) {
            by_day.entry(known.date).or_insert_with(|| known.value().clone());
        }

        Ok(by_day.into_values().collect())
    }

    /// Latest readable day-file strictly before `date`, with legacy files on
    /// the way linked to the days before them.
    pub async fn latest_prior(&self, date: NaiveDate, user: &str) -> Result<Option<DailyLedgerFile>> {
        let earlier: Vec<FileHandle> = self
            .list_day_files(user)
            .await?
            .into_iter()
            .filter(|h| h.date < date)
            .collect();

        // Walk back to the first file that carries its own opening balances.
        let mut unlinked = Vec::new();
        let mut base = None;
        for handle in earlier.iter().rev() {
            match self.read(handle).await {
                Ok(decoded) if decoded.from_legacy => unlinked.push(decoded.file),
                Ok(decoded) => {
                    base = Some(decoded.file);
                    break;
                }
                Err(e) if e.is_persistence() => return Err(e),
                Err(e) => skip_corrupt(&handle.name, &e),
            }
        }

        let mut latest = base;
        for mut file in unlinked.into_iter().rev() {
            link_to_previous(&mut file, latest.as_ref())?;
            latest = Some(file);
        }
        Ok(latest)
    }

    async fn migrate(&self, handle: FileHandle) -> Result<(FileHandle, DailyLedgerFile)> {
        let Decoded { mut file, from_legacy } = self.read(&handle).await?;
        if from_legacy {
            let prior = self.latest_prior(handle.date, &handle.user).await?;
            link_to_previous(&mut file, prior.as_ref())?;
        }

        let new_name = NamingScheme::Current.file_name(handle.date, &handle.user);
        self.store
            .update_file(&handle.file_id, file.encode()?, Some(new_name.clone()))
            .await
            .map_err(observed)?;

        DAY_FILES_MIGRATED.inc();
        tracing::info!(
            "Migrated legacy day-file {} to {} ({} entries)",
            handle.name,
            new_name,
            file.entries.len()
        );

        let migrated = FileHandle {
            name: new_name,
            scheme: NamingScheme::Current,
            ..handle
        };
        Ok((migrated, file))
    }

    async fn create(&self, folder: &FolderId, date: NaiveDate, user: &str) -> Result<(FileHandle, DailyLedgerFile)> {
        let prior = self.latest_prior(date, user).await?;
        let (opening, rates, prev_file_hash) = match prior {
            Some(prior) => (
                prior.header.balances_snapshot,
                prior.header.exchange_rates,
                Some(prior.signature.hash),
            ),
            None => (Snapshot::empty(), BTreeMap::new(), None),
        };

        let file = DailyLedgerFile::new(date, user, opening, prev_file_hash, rates, &self.signer)?;
        let name = NamingScheme::Current.file_name(date, user);
        let file_id = self
            .store
            .create_file(&name, folder, file.encode()?)
            .await
            .map_err(observed)?;

        DAY_FILES_CREATED.inc();
        tracing::info!("Created day-file {}", name);

        let handle = FileHandle {
            file_id,
            name,
            scheme: NamingScheme::Current,
            date,
            user: user.to_string(),
        };
        Ok((handle, file))
    }

    fn schemes(&self) -> impl Iterator<Item = NamingScheme> + '_ {
        RESOLVER_ORDER
            .into_iter()
            .filter(move |scheme| self.legacy_migration || !scheme.is_legacy())
    }

    async fn list(&self, query: &FileQuery) -> Result<Vec<FileMeta>> {
        self.store.list_files(query).await.map_err(observed)
    }

    fn write_lock(&self, file_id: &FileId) -> Arc<Mutex<()>> {
        Arc::clone(&self.write_locks.entry(file_id.clone()).or_default())
    }

    fn cached(&self, date: NaiveDate, user: &str) -> Option<FileHandle> {
        self.known_files
            .get(&(date, user.to_string()))
            .map(|h| h.value().clone())
    }

    fn remember(&self, handle: &FileHandle) {
        self.known_files
            .insert((handle.date, handle.user.clone()), handle.clone());
    }
}

/// Rebases a file decoded from the legacy format onto the closing state of
/// the day before it.
pub(crate) fn link_to_previous(file: &mut DailyLedgerFile, previous: Option<&DailyLedgerFile>) -> Result<()> {
    let Some(previous) = previous else {
        return Ok(());
    };

    let mut rates = previous.header.exchange_rates.clone();
    rates.append(&mut file.header.exchange_rates);
    file.header.exchange_rates = rates;
    file.header.prev_file_hash = Some(previous.signature.hash.clone());
    file.rebase(previous.header.balances_snapshot.clone())
}

pub(crate) fn skip_corrupt(name: &str, error: &Error) {
    CORRUPT_FILES_SKIPPED.inc();
    tracing::warn!("Skipping unreadable day-file {}: {}", name, error);
}

fn oldest(mut hits: Vec<FileMeta>, name: &str) -> Option<FileMeta> {
    if hits.len() > 1 {
        tracing::warn!("{} files named {}; using the oldest", hits.len(), name);
    }
    hits.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    hits.into_iter().next()
}

fn observed(error: Error) -> Error {
    record_store_error(&error);
    error
}
