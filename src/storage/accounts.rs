use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::error::Result;
use crate::interfaces::account_provider::AccountDirectory;
use crate::types::account::Account;

/// Account settings held in memory (guest sessions, tests, the demo binary).
pub struct StaticAccountDirectory {
    accounts: RwLock<Vec<Account>>,
}

impl StaticAccountDirectory {
    pub fn new(accounts: Vec<Account>) -> Self {
        StaticAccountDirectory {
            accounts: RwLock::new(accounts),
        }
    }

    pub async fn upsert(&self, account: Account) {
        let mut accounts = self.accounts.write().await;
        match accounts.iter_mut().find(|a| a.id == account.id) {
            Some(existing) => *existing = account,
            None => accounts.push(account),
        }
    }
}

#[async_trait]
impl AccountDirectory for StaticAccountDirectory {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().await.clone())
    }
}
