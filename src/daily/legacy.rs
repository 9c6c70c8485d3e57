use std::collections::BTreeMap;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use crate::daily::file::DailyLedgerFile;
use crate::daily::naming::ParsedName;
use crate::entries::entry::EntryKind;
use crate::entries::request::{AppendOptions, EntryRequest};
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::types::ids::{AccountId, EntryId};
use crate::types::money::{Amount, Currency};
use crate::types::rate::ExchangeRate;
use crate::utils::helper::compact_date;

/// Version-1 document: a flat list of float-valued transactions, no header.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDocument {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(alias = "blocks")]
    transactions: Vec<LegacyTransaction>,
    #[serde(default)]
    exchange_rates: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTransaction {
    #[serde(rename = "type")]
    kind: String,
    amount: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(alias = "account")]
    account_id: String,
    #[serde(default, alias = "toAccount")]
    to_account_id: Option<String>,
    #[serde(default)]
    to_amount: Option<f64>,
    #[serde(default)]
    to_currency: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Result of decoding a stored day-file in whatever format it was written.
#[derive(Debug)]
pub struct Decoded {
    pub file: DailyLedgerFile,
    /// True when the content came through the legacy shim. Such files have
    /// empty opening balances until rebased onto the previous day.
    pub from_legacy: bool,
}

/// Decodes current-schema content, falling back to the legacy shim.
pub fn decode_any(
    bytes: &[u8],
    file_name: &str,
    name: &ParsedName,
    default_currency: &Currency,
    signer: &str,
) -> Result<Decoded> {
    match DailyLedgerFile::decode(bytes) {
        Ok(file) => Ok(Decoded { file, from_legacy: false }),
        Err(e @ Error::UnsupportedFileVersion { .. }) => Err(e),
        Err(current_err) => normalize(bytes, name, default_currency, signer)
            .map(|file| Decoded { file, from_legacy: true })
            .map_err(|legacy_err| Error::CorruptFile {
                name: file_name.to_string(),
                reason: format!("{}; as legacy: {}", current_err, legacy_err),
            }),
    }
}

/// Reinterprets a legacy document under the current schema.
///
/// Transactions keep their stored order and get fresh sequence ids. Float
/// amounts are rounded to minor units once, here. Transactions that cannot be
/// shaped into a valid entry are dropped with a warning rather than failing
/// the whole day.
pub fn normalize(
    bytes: &[u8],
    name: &ParsedName,
    default_currency: &Currency,
    signer: &str,
) -> Result<DailyLedgerFile> {
    let document: LegacyDocument = serde_json::from_slice(bytes)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;

    let date = document.date.unwrap_or(name.date);
    let rates = document
        .exchange_rates
        .iter()
        .map(|(pair, rate)| (pair.clone(), ExchangeRate::from_f64(*rate)))
        .collect();

    let mut file = DailyLedgerFile::new(date, &name.user, Snapshot::empty(), None, rates, signer)?;
    let day = compact_date(date);
    let midnight = date.and_hms_opt(0, 0, 0).map(|t| t.and_utc()).unwrap_or_default();

    for (index, transaction) in document.transactions.into_iter().enumerate() {
        let new_entry = match to_request(transaction, default_currency)
            .and_then(|(request, home)| request.into_new_entry(home, midnight))
        {
            Ok(new_entry) => new_entry,
            Err(e) => {
                tracing::warn!("Dropping legacy transaction #{} of {}: {}", index, day, e);
                continue;
            }
        };

        let hash = new_entry.content_hash();
        if file.find_by_hash(&hash).is_some() {
            tracing::debug!("Dropping duplicate legacy transaction #{} of {}", index, day);
            continue;
        }

        let id = EntryId::compose(&day, &hash, file.next_sequence());
        let prev_id = file.last_entry_id().cloned();
        file.push(new_entry.into_entry(id, hash, prev_id));
    }

    file.reseal(signer)?;
    Ok(file)
}

fn to_request(transaction: LegacyTransaction, default_currency: &Currency) -> Result<(EntryRequest, Currency)> {
    let kind = match transaction.kind.to_ascii_lowercase().as_str() {
        "expense" => EntryKind::Expense,
        "income" => EntryKind::Income,
        "transfer" => EntryKind::Transfer,
        "exchange" => EntryKind::Exchange,
        other => return Err(Error::validation(format!("unknown legacy transaction type {:?}", other))),
    };

    let home = match transaction.currency.as_deref() {
        Some(code) => Currency::new(code)?,
        None => default_currency.clone(),
    };
    let to_currency = transaction.to_currency.as_deref().map(Currency::new).transpose()?;

    // Old clients sometimes stored expenses as negative numbers.
    let request = EntryRequest {
        kind,
        amount: Amount::from_f64_lossy(transaction.amount.abs()),
        category: transaction.category.unwrap_or_default(),
        note: transaction.note.unwrap_or_default(),
        account: AccountId::new(transaction.account_id),
        options: AppendOptions {
            timestamp: transaction.timestamp,
            currency: None,
            to_account: transaction.to_account_id.map(AccountId::new),
            to_amount: transaction.to_amount.map(|a| Amount::from_f64_lossy(a.abs())),
            to_currency,
        },
    };
    Ok((request, home))
}
