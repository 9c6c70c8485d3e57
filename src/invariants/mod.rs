pub mod checks;

pub use checks::InvariantChecks;
