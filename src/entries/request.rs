use chrono::{DateTime, Utc};
use crate::entries::entry::{EntryBody, EntryKind, Leg, NewEntry, Payload};
use crate::error::{Error, Result};
use crate::types::ids::AccountId;
use crate::types::money::{Amount, Currency};

/// Optional parts of an append request. Which ones are required depends on
/// the entry kind (see [`EntryRequest::into_new_entry`]).
#[derive(Clone, Debug, Default)]
pub struct AppendOptions {
    /// User-chosen logical time; defaults to the append time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Currency of the primary leg; defaults to the account's home currency.
    pub currency: Option<Currency>,
    pub to_account: Option<AccountId>,
    pub to_amount: Option<Amount>,
    pub to_currency: Option<Currency>,
}

/// Flat request shape used by the upward `append_ledger_entry` operation.
#[derive(Clone, Debug)]
pub struct EntryRequest {
    pub kind: EntryKind,
    pub amount: Amount,
    pub category: String,
    pub note: String,
    pub account: AccountId,
    pub options: AppendOptions,
}

impl EntryRequest {
    /// Shapes the request into a typed entry.
    ///
    /// - expense: debit `account` by `amount`
    /// - income: credit `account` with `amount`
    /// - transfer: debit `account`, credit `to_account` (amount and currency
    ///   default to the debit side)
    /// - exchange: debit `account`, credit `to_account` (defaults to the same
    ///   account) with `to_amount` in `to_currency`, both required
    ///
    /// `home_currency` is used when `options.currency` is absent.
    pub fn into_new_entry(self, home_currency: Currency, now: DateTime<Utc>) -> Result<NewEntry> {
        let EntryRequest { kind, amount, category, note, account, options } = self;
        let currency = options.currency.clone().unwrap_or(home_currency);
        let primary = Leg {
            account: account.clone(),
            amount,
            currency: currency.clone(),
        };

        let has_counter_leg = options.to_account.is_some()
            || options.to_amount.is_some()
            || options.to_currency.is_some();

        let body = match kind {
            EntryKind::Expense | EntryKind::Income if has_counter_leg => {
                return Err(Error::validation(format!(
                    "{} entries carry a single leg; counter-leg options are not allowed",
                    kind
                )));
            }
            EntryKind::Expense => EntryBody::Expense { debit: primary },
            EntryKind::Income => EntryBody::Income { credit: primary },
            EntryKind::Transfer => {
                let to_account = options
                    .to_account
                    .ok_or_else(|| Error::validation("transfer requires a destination account"))?;
                EntryBody::Transfer {
                    debit: primary,
                    credit: Leg {
                        account: to_account,
                        amount: options.to_amount.unwrap_or(amount),
                        currency: options.to_currency.unwrap_or(currency),
                    },
                }
            }
            EntryKind::Exchange => {
                let to_amount = options
                    .to_amount
                    .ok_or_else(|| Error::validation("exchange requires the credited amount"))?;
                let to_currency = options
                    .to_currency
                    .ok_or_else(|| Error::validation("exchange requires the credited currency"))?;
                EntryBody::Exchange {
                    debit: primary,
                    credit: Leg {
                        account: options.to_account.unwrap_or(account),
                        amount: to_amount,
                        currency: to_currency,
                    },
                }
            }
            EntryKind::Adjustment => {
                return Err(Error::validation(
                    "adjustments are created by editing an entry, not by appending",
                ));
            }
        };

        NewEntry::new(options.timestamp.unwrap_or(now), Payload::new(category, note, body))
    }
}
