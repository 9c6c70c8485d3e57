use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use crate::error::{Error, PersistenceKind, Result};
use crate::interfaces::blob_store::{BlobStore, FileMeta, FileQuery};
use crate::types::ids::{FileId, FolderId};
use crate::utils::helper::{generate_file_id, generate_folder_id};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Read,
    Create,
    Update,
    EnsureFolder,
}

#[derive(Clone, Debug)]
struct StoredFile {
    meta: FileMeta,
    content: Vec<u8>,
    listed: bool,
}

/// `BlobStore` kept in process memory.
///
/// Backs guest sessions, the demo binary and tests. Two knobs imitate a remote
/// store: injected failures per operation, and listings that lag behind
/// creates until [`InMemoryBlobStore::settle`] is called.
pub struct InMemoryBlobStore {
    files: DashMap<FileId, StoredFile>,
    folders: DashMap<String, FolderId>,
    failures: DashMap<StoreOp, (PersistenceKind, u32)>,
    consistent_listing: AtomicBool,
    // Logical clock for created/modified stamps, so ordering is deterministic.
    ticks: AtomicI64,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        InMemoryBlobStore {
            files: DashMap::new(),
            folders: DashMap::new(),
            failures: DashMap::new(),
            consistent_listing: AtomicBool::new(true),
            ticks: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    /// Fail the next call of `op` with `kind`.
    pub fn fail_next(&self, op: StoreOp, kind: PersistenceKind) {
        self.fail_times(op, kind, 1);
    }

    pub fn fail_times(&self, op: StoreOp, kind: PersistenceKind, times: u32) {
        self.failures.insert(op, (kind, times));
    }

    /// When `false`, files created from now on stay out of listings until
    /// `settle` runs.
    pub fn set_listing_consistent(&self, consistent: bool) {
        self.consistent_listing.store(consistent, Ordering::SeqCst);
    }

    /// Make every file visible to listings.
    pub fn settle(&self) {
        for mut file in self.files.iter_mut() {
            file.listed = true;
        }
    }

    /// Store a file as-is, bypassing failure injection. Used to seed legacy or
    /// damaged content.
    pub fn insert_raw(&self, name: &str, parent: &FolderId, content: Vec<u8>) -> FileId {
        let id = generate_file_id();
        let now = self.tick();
        self.files.insert(id.clone(), StoredFile {
            meta: FileMeta {
                id: id.clone(),
                name: name.to_string(),
                parent: Some(parent.clone()),
                created_at: now,
                modified_at: now,
            },
            content,
            listed: true,
        });
        id
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.iter().map(|f| f.meta.name.clone()).collect();
        names.sort();
        names
    }

    pub fn content_by_name(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .iter()
            .find(|f| f.meta.name == name)
            .map(|f| f.content.clone())
    }

    fn tick(&self) -> DateTime<Utc> {
        let millis = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
    }

    fn check_failure(&self, op: StoreOp) -> Result<()> {
        let injected = match self.failures.get_mut(&op) {
            Some(mut slot) if slot.1 > 0 => {
                slot.1 -= 1;
                Some(slot.0)
            }
            _ => None,
        };

        match injected {
            Some(kind) => {
                tracing::debug!("Injected {} failure for {:?}", kind, op);
                Err(Error::persistence(kind, format!("injected failure on {:?}", op)))
            }
            None => Ok(()),
        }
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<FileMeta>> {
        self.check_failure(StoreOp::List)?;

        let mut found: Vec<FileMeta> = self
            .files
            .iter()
            .filter(|f| f.listed && query.matches(&f.meta))
            .map(|f| f.meta.clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(found)
    }

    async fn read_file(&self, file_id: &FileId) -> Result<Vec<u8>> {
        self.check_failure(StoreOp::Read)?;

        self.files
            .get(file_id)
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::NotFound(format!("file {}", file_id)))
    }

    async fn create_file(&self, name: &str, parent: &FolderId, content: Vec<u8>) -> Result<FileId> {
        self.check_failure(StoreOp::Create)?;

        let id = generate_file_id();
        let now = self.tick();
        let listed = self.consistent_listing.load(Ordering::SeqCst);
        self.files.insert(id.clone(), StoredFile {
            meta: FileMeta {
                id: id.clone(),
                name: name.to_string(),
                parent: Some(parent.clone()),
                created_at: now,
                modified_at: now,
            },
            content,
            listed,
        });
        Ok(id)
    }

    async fn update_file(&self, file_id: &FileId, content: Vec<u8>, new_name: Option<String>) -> Result<()> {
        self.check_failure(StoreOp::Update)?;

        let now = self.tick();
        let mut file = self
            .files
            .get_mut(file_id)
            .ok_or_else(|| Error::NotFound(format!("file {}", file_id)))?;
        file.content = content;
        file.meta.modified_at = now;
        if let Some(name) = new_name {
            file.meta.name = name;
        }
        Ok(())
    }

    async fn ensure_folder(&self, name: &str) -> Result<FolderId> {
        self.check_failure(StoreOp::EnsureFolder)?;

        let folder = self
            .folders
            .entry(name.to_string())
            .or_insert_with(generate_folder_id)
            .value()
            .clone();
        Ok(folder)
    }
}
