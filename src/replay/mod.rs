pub mod history;

pub use history::{annotate_backward, EntryWithSnapshot, Fidelity, HistoryPage, HistoryReconstructor, Reconstruction};
