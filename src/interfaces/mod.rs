pub mod account_provider;
pub mod blob_store;

pub use account_provider::AccountDirectory;
pub use blob_store::{BlobStore, FileMeta, FileQuery};
