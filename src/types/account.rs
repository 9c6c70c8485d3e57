use serde::{Deserialize, Serialize};
use crate::types::ids::AccountId;
use crate::types::money::Currency;

/// Account definition owned by the settings collaborator; the ledger only
/// reads it (zero-fill, default currency lookup).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub currency: Currency,
    #[serde(default, rename = "deletedFlag")]
    pub deleted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Cash,
    Bank,
    CreditCard,
    Investment,
    Other,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>, account_type: AccountType, currency: Currency) -> Self {
        Account {
            id: AccountId::new(id),
            name: name.into(),
            account_type,
            currency,
            deleted: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}
