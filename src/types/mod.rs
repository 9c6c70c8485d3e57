pub mod account;
pub mod ids;
pub mod money;
pub mod rate;
pub mod timestamp;
