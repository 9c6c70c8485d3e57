use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use crate::entries::entry::{EntryBody, Leg, Payload};

/// Number of hex characters kept in day-file names.
pub const FILE_NAME_HASH_LEN: usize = 16;

/// Deterministic hash of an entry's canonical fields (time + payload).
/// Identity fields (`id`, `prevId`) are excluded so that resubmitting the same
/// logical entry produces the same hash.
pub fn content_hash(timestamp: DateTime<Utc>, payload: &Payload) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.timestamp_millis().to_le_bytes());
    hash_payload(&mut hasher, payload);
    hex::encode(hasher.finalize())
}

/// Name hash for `(YYYYMMDD, user)`; depends on nothing else, so the same
/// day and user always resolve to the same file name.
pub fn file_name_hash(compact_date: &str, sanitized_user: &str) -> String {
    let mut hasher = Sha256::new();
    hash_str(&mut hasher, compact_date);
    hash_str(&mut hasher, sanitized_user);
    let digest = hex::encode(hasher.finalize());
    digest[..FILE_NAME_HASH_LEN].to_string()
}

/// Plain SHA-256 hex digest, used for day-file signatures.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// Strings are length-prefixed so that field boundaries cannot shift.
fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_leg(hasher: &mut Sha256, leg: &Leg) {
    hash_str(hasher, leg.account.as_str());
    hasher.update(leg.amount.to_minor().to_le_bytes());
    hash_str(hasher, leg.currency.code());
}

fn hash_payload(hasher: &mut Sha256, payload: &Payload) {
    hash_str(hasher, &payload.category);
    hash_str(hasher, &payload.note);
    hash_str(hasher, &payload.body.kind().to_string());
    match &payload.body {
        EntryBody::Expense { debit } => hash_leg(hasher, debit),
        EntryBody::Income { credit } => hash_leg(hasher, credit),
        EntryBody::Transfer { debit, credit } | EntryBody::Exchange { debit, credit } => {
            hash_leg(hasher, debit);
            hash_leg(hasher, credit);
        }
        EntryBody::Adjustment { ref_original_id, replacement, supersedes } => {
            hash_str(hasher, ref_original_id.as_str());
            hash_payload(hasher, replacement);
            hash_payload(hasher, supersedes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::types::money::{Amount, Currency};

    fn expense(amount: i64, note: &str) -> Payload {
        Payload::new(
            "food",
            note,
            EntryBody::Expense {
                debit: Leg::new("cash", Amount::from_major(amount), Currency::new("TWD").unwrap()),
            },
        )
    }

    #[test]
    fn content_hash_is_stable_and_field_sensitive() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let a = content_hash(at, &expense(100, "lunch"));
        assert_eq!(a, content_hash(at, &expense(100, "lunch")));
        assert_ne!(a, content_hash(at, &expense(101, "lunch")));
        assert_ne!(a, content_hash(at, &expense(100, "dinner")));
        assert_ne!(a, content_hash(at + chrono::Duration::seconds(1), &expense(100, "lunch")));
    }

    #[test]
    fn file_name_hash_has_fixed_width() {
        let h = file_name_hash("20240301", "alice");
        assert_eq!(h.len(), FILE_NAME_HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, file_name_hash("20240301", "alice"));
        assert_ne!(h, file_name_hash("20240302", "alice"));
    }
}
