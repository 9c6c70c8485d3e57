use im::OrdMap;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use crate::types::account::Account;
use crate::types::ids::AccountId;
use crate::types::money::{Amount, Currency};

pub type CurrencyBalances = OrdMap<Currency, Amount>;

/// Balances per account per currency, plus per-currency totals across all
/// accounts.
///
/// Backed by persistent maps: history reconstruction keeps one snapshot per
/// entry, and consecutive snapshots share almost all of their structure.
///
/// Equality treats a zero balance the same as an absent one. Zero-fill is a
/// display concern and must not make two otherwise identical ledgers differ.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub balances: OrdMap<AccountId, CurrencyBalances>,
    pub totals: CurrencyBalances,
}

impl Snapshot {
    pub fn empty() -> Self {
        Snapshot::default()
    }

    pub fn balance(&self, account: &AccountId, currency: &Currency) -> Amount {
        self.balances
            .get(account)
            .and_then(|per_currency| per_currency.get(currency))
            .copied()
            .unwrap_or_default()
    }

    pub fn total(&self, currency: &Currency) -> Amount {
        self.totals.get(currency).copied().unwrap_or_default()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.balances.keys()
    }

    /// Moves `delta` into `account`'s `currency` balance and the matching
    /// total. Missing map entries start at zero.
    pub(crate) fn shift(&mut self, account: &AccountId, currency: &Currency, delta: Amount) {
        let mut per_currency = self.balances.get(account).cloned().unwrap_or_default();
        let balance = per_currency.get(currency).copied().unwrap_or_default();
        per_currency.insert(currency.clone(), balance + delta);
        self.balances.insert(account.clone(), per_currency);

        let total = self.total(currency);
        self.totals.insert(currency.clone(), total + delta);
    }

    /// Copy of this snapshot in which every active account shows at least a
    /// zero balance in its home currency. Deleted accounts are left alone;
    /// their historical balances stay as they are.
    pub fn zero_filled(&self, accounts: &[Account]) -> Snapshot {
        let mut filled = self.clone();
        for account in accounts.iter().filter(|a| a.is_active()) {
            let mut per_currency = filled.balances.get(&account.id).cloned().unwrap_or_default();
            if !per_currency.contains_key(&account.currency) {
                per_currency.insert(account.currency.clone(), Amount::zero());
            }
            filled.balances.insert(account.id.clone(), per_currency);

            if !filled.totals.contains_key(&account.currency) {
                filled.totals.insert(account.currency.clone(), Amount::zero());
            }
        }
        filled
    }

    fn nonzero_balances(&self) -> impl Iterator<Item = (&AccountId, &Currency, Amount)> {
        self.balances.iter().flat_map(|(account, per_currency)| {
            per_currency
                .iter()
                .filter(|(_, amount)| !amount.is_zero())
                .map(move |(currency, amount)| (account, currency, *amount))
        })
    }

    fn nonzero_totals(&self) -> impl Iterator<Item = (&Currency, Amount)> {
        self.totals
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(currency, amount)| (currency, *amount))
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.nonzero_balances().eq(other.nonzero_balances())
            && self.nonzero_totals().eq(other.nonzero_totals())
    }
}

impl Eq for Snapshot {}
