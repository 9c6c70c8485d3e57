use std::collections::BTreeMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::entries::entry::{EntryBody, LedgerEntry};
use crate::error::{Error, Result};
use crate::snapshot::{self, Snapshot};
use crate::types::ids::EntryId;
use crate::types::rate::ExchangeRate;
use crate::utils::hash::digest_hex;

/// Current day-file schema version. Version 1 is the legacy float-based
/// document handled by `daily::legacy`.
pub const FILE_FORMAT_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHeader {
    pub version: u32,
    pub date: NaiveDate,
    pub user: String,
    pub sequence_count: u64,
    #[serde(default)]
    pub prev_file_hash: Option<String>,
    /// `"<credit>/<debit>"` -> debit units per credit unit, carried over from
    /// the previous day-file and updated by every exchange appended here.
    #[serde(default)]
    pub exchange_rates: BTreeMap<String, ExchangeRate>,
    /// Balances inherited from the latest prior day-file.
    #[serde(default)]
    pub opening_balances: Snapshot,
    /// Balances after the last entry of this file.
    pub balances_snapshot: Snapshot,
}

/// Integrity marker over header + entries. Not verified cryptographically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSignature {
    pub hash: String,
    pub signer: String,
}

/// The single persisted file holding one user's entries for one calendar day.
///
/// Entries are kept in append order; their ids carry the intra-day sequence.
/// Every mutation goes through [`DailyLedgerFile::push`] followed by
/// [`DailyLedgerFile::reseal`], which recomputes the derived header fields
/// from a full replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLedgerFile {
    pub header: FileHeader,
    pub entries: Vec<LedgerEntry>,
    pub signature: FileSignature,
}

#[derive(Serialize)]
struct SignedContent<'a> {
    header: &'a FileHeader,
    entries: &'a [LedgerEntry],
}

impl DailyLedgerFile {
    pub fn new(
        date: NaiveDate,
        user: &str,
        opening: Snapshot,
        prev_file_hash: Option<String>,
        exchange_rates: BTreeMap<String, ExchangeRate>,
        signer: &str,
    ) -> Result<Self> {
        let mut file = DailyLedgerFile {
            header: FileHeader {
                version: FILE_FORMAT_VERSION,
                date,
                user: user.to_string(),
                sequence_count: 0,
                prev_file_hash,
                exchange_rates,
                balances_snapshot: opening.clone(),
                opening_balances: opening,
            },
            entries: Vec::new(),
            signature: FileSignature {
                hash: String::new(),
                signer: signer.to_string(),
            },
        };
        file.reseal(signer)?;
        Ok(file)
    }

    pub fn find_by_hash(&self, content_hash: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.content_hash == content_hash)
    }

    pub fn last_entry_id(&self) -> Option<&EntryId> {
        self.entries.last().map(|e| &e.id)
    }

    /// Sequence number for the next entry. Never reuses a number even if the
    /// header count lags behind the entries actually present.
    pub fn next_sequence(&self) -> u64 {
        let highest = self
            .entries
            .iter()
            .filter_map(|e| e.id.sequence())
            .max()
            .unwrap_or(0);
        highest.max(self.header.sequence_count) + 1
    }

    /// Appends without touching derived header fields; call `reseal` after.
    pub fn push(&mut self, entry: LedgerEntry) {
        self.record_rate(&entry.body);
        self.entries.push(entry);
    }

    /// Recomputes sequence count, closing balances (full replay from the
    /// opening balances) and the signature.
    pub fn reseal(&mut self, signer: &str) -> Result<()> {
        self.header.sequence_count = self.entries.len() as u64;
        self.header.balances_snapshot = snapshot::replay(&self.header.opening_balances, &self.entries);
        self.signature.signer = signer.to_string();
        self.signature.hash = self.compute_signature_hash()?;
        Ok(())
    }

    /// Replaces the opening balances and replays. Used when a file decoded
    /// from an older format gets linked to the day before it.
    pub fn rebase(&mut self, opening: Snapshot) -> Result<()> {
        self.header.opening_balances = opening;
        let signer = self.signature.signer.clone();
        self.reseal(&signer)
    }

    pub fn compute_signature_hash(&self) -> Result<String> {
        let content = SignedContent {
            header: &self.header,
            entries: &self.entries,
        };
        let bytes = serde_json::to_vec(&content)
            .map_err(|e| Error::SerializationError(e.to_string()))?;
        Ok(digest_hex(&bytes))
    }

    pub fn signature_matches(&self) -> bool {
        self.compute_signature_hash()
            .map(|hash| hash == self.signature.hash)
            .unwrap_or(false)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::SerializationError(e.to_string()))
    }

    /// Decodes the current schema only; see `daily::legacy` for older formats.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let file: DailyLedgerFile = serde_json::from_slice(bytes)
            .map_err(|e| Error::DeserializationError(e.to_string()))?;

        if file.header.version > FILE_FORMAT_VERSION {
            return Err(Error::UnsupportedFileVersion {
                file_version: file.header.version,
                max_supported: FILE_FORMAT_VERSION,
            });
        }

        Ok(file)
    }

    fn record_rate(&mut self, body: &EntryBody) {
        let exchange = match body {
            EntryBody::Adjustment { replacement, .. } => &replacement.body,
            other => other,
        };
        if let EntryBody::Exchange { debit, credit } = exchange {
            if let Some(rate) = ExchangeRate::implied(debit.amount, credit.amount) {
                let pair = format!("{}/{}", credit.currency, debit.currency);
                self.header.exchange_rates.insert(pair, rate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::entries::entry::{Leg, NewEntry, Payload};
    use crate::types::ids::AccountId;
    use crate::types::money::{Amount, Currency};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn stamped(file: &DailyLedgerFile, body: EntryBody) -> LedgerEntry {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let new_entry = NewEntry::new(at, Payload::new("test", "", body)).unwrap();
        let hash = new_entry.content_hash();
        let id = EntryId::compose("20240301", &hash, file.next_sequence());
        new_entry.into_entry(id, hash, file.last_entry_id().cloned())
    }

    #[test]
    fn reseal_replays_from_opening() {
        let twd = Currency::new("TWD").unwrap();
        let mut opening = Snapshot::empty();
        opening.shift(&AccountId::from("bank"), &twd, Amount::from_major(1000));

        let mut file = DailyLedgerFile::new(date(), "alice", opening, None, BTreeMap::new(), "alice").unwrap();
        let entry = stamped(&file, EntryBody::Expense {
            debit: Leg::new("bank", Amount::from_major(100), twd.clone()),
        });
        file.push(entry);
        file.reseal("alice").unwrap();

        assert_eq!(file.header.sequence_count, 1);
        assert_eq!(file.header.balances_snapshot.balance(&AccountId::from("bank"), &twd), Amount::from_major(900));
        assert!(file.signature_matches());
        assert_eq!(file.next_sequence(), 2);
    }

    #[test]
    fn exchange_records_implied_rate() {
        let mut file = DailyLedgerFile::new(date(), "alice", Snapshot::empty(), None, BTreeMap::new(), "alice").unwrap();
        let entry = stamped(&file, EntryBody::Exchange {
            debit: Leg::new("bank", Amount::from_major(32550), Currency::new("TWD").unwrap()),
            credit: Leg::new("bank", Amount::from_major(1000), Currency::new("USD").unwrap()),
        });
        file.push(entry);
        file.reseal("alice").unwrap();
        assert_eq!(file.header.exchange_rates["USD/TWD"].to_string(), "32.55");
    }

    #[test]
    fn encode_decode_preserves_file() {
        let mut file = DailyLedgerFile::new(date(), "alice", Snapshot::empty(), Some("abc".into()), BTreeMap::new(), "alice").unwrap();
        let entry = stamped(&file, EntryBody::Income {
            credit: Leg::new("bank", Amount::from_major(30000), Currency::new("TWD").unwrap()),
        });
        file.push(entry);
        file.reseal("alice").unwrap();

        let decoded = DailyLedgerFile::decode(&file.encode().unwrap()).unwrap();
        assert_eq!(decoded, file);
        assert!(decoded.signature_matches());
    }

    #[test]
    fn tampering_breaks_signature() {
        let mut file = DailyLedgerFile::new(date(), "alice", Snapshot::empty(), None, BTreeMap::new(), "alice").unwrap();
        file.header.sequence_count = 9;
        assert!(!file.signature_matches());
    }

    #[test]
    fn newer_versions_are_rejected() {
        let mut file = DailyLedgerFile::new(date(), "alice", Snapshot::empty(), None, BTreeMap::new(), "alice").unwrap();
        file.header.version = FILE_FORMAT_VERSION + 1;
        let err = DailyLedgerFile::decode(&file.encode().unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileVersion { .. }));
    }
}
