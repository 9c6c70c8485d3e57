pub mod adjustment;

pub use adjustment::{build_adjustment, merge_adjustments, MergedEntry};
