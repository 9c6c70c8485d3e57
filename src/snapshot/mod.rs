pub mod engine;
pub mod state;

pub use engine::{apply_entry, replay, reverse_entry};
pub use state::Snapshot;
