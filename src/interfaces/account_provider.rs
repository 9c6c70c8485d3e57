use async_trait::async_trait;
use crate::error::Result;
use crate::types::account::Account;

/// Read-only view of the user's account settings.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// All accounts, deleted ones included (flagged).
    async fn list_accounts(&self) -> Result<Vec<Account>>;
}
