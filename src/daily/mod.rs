pub mod file;
pub mod legacy;
pub mod manager;
pub mod naming;

pub use file::{DailyLedgerFile, FileHeader, FileSignature, FILE_FORMAT_VERSION};
pub use manager::{AppendOutcome, DailyFileManager, FileHandle};
pub use naming::{parse_file_name, resolve_file_name, NamingScheme};
