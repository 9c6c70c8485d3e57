pub mod hash;
pub mod helper;
