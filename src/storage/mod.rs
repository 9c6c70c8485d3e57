pub mod accounts;
pub mod memory;

pub use accounts::StaticAccountDirectory;
pub use memory::{InMemoryBlobStore, StoreOp};
