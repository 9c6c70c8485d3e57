use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::error::Result;
use crate::types::ids::{FileId, FolderId};

/// Listing metadata returned by the backing store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMeta {
    pub id: FileId,
    pub name: String,
    pub parent: Option<FolderId>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Predicate for `list_files`: exact name, name fragment, folder membership,
/// and their conjunction/disjunction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileQuery {
    NameEquals(String),
    NameContains(String),
    InFolder(FolderId),
    All(Vec<FileQuery>),
    Any(Vec<FileQuery>),
}

impl FileQuery {
    pub fn in_folder_named(folder: &FolderId, name: impl Into<String>) -> Self {
        FileQuery::All(vec![
            FileQuery::InFolder(folder.clone()),
            FileQuery::NameEquals(name.into()),
        ])
    }

    pub fn matches(&self, meta: &FileMeta) -> bool {
        match self {
            FileQuery::NameEquals(name) => meta.name == *name,
            FileQuery::NameContains(fragment) => meta.name.contains(fragment.as_str()),
            FileQuery::InFolder(folder) => meta.parent.as_ref() == Some(folder),
            FileQuery::All(queries) => queries.iter().all(|q| q.matches(meta)),
            FileQuery::Any(queries) => queries.iter().any(|q| q.matches(meta)),
        }
    }
}

/// Remote file store the ledger persists into. Implementations map their
/// transport failures onto `Error::Persistence` with the matching kind.
///
/// No locking and no partial writes: `update_file` replaces the whole
/// content. Listings may lag behind creates.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<FileMeta>>;

    async fn read_file(&self, file_id: &FileId) -> Result<Vec<u8>>;

    async fn create_file(&self, name: &str, parent: &FolderId, content: Vec<u8>) -> Result<FileId>;

    /// Replace the content; `new_name` renames the file in the same call.
    async fn update_file(&self, file_id: &FileId, content: Vec<u8>, new_name: Option<String>) -> Result<()>;

    /// Idempotent get-or-create of a top-level folder.
    async fn ensure_folder(&self, name: &str) -> Result<FolderId>;
}
