pub mod session;

pub use session::{SessionChain, SessionMode};
