pub mod types;
pub mod entries;
pub mod utils;
pub mod snapshot;
pub mod interfaces;
pub mod storage;
pub mod daily;
pub mod correction;
pub mod replay;
pub mod chain;
pub mod invariants;
pub mod core;
pub mod error;
pub mod config;
pub mod observability;

pub use crate::core::LedgerService;
pub use crate::error::{Error, PersistenceKind, Result};

// Day-file schema version written by this crate
pub const FILE_FORMAT_VERSION: u32 = daily::file::FILE_FORMAT_VERSION;

// Exchange rate multiplier
pub const RATE_MULTIPLIER: i64 = 100_000_000; // 10^8
