use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::ids::{AccountId, EntryId};
use crate::types::money::{Amount, Currency};

/// Upper bound for a single leg, in minor units. Keeps running sums far away
/// from i64 overflow.
pub const MAX_LEG_AMOUNT: i64 = 1_000_000_000_000_000;

/// One side of a money movement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leg {
    pub account: AccountId,
    pub amount: Amount,
    pub currency: Currency,
}

impl Leg {
    pub fn new(account: impl Into<String>, amount: Amount, currency: Currency) -> Self {
        Leg {
            account: AccountId::new(account),
            amount,
            currency,
        }
    }

    fn validate(&self, side: &str) -> Result<()> {
        if self.account.as_str().trim().is_empty() {
            return Err(Error::validation(format!("{} leg has an empty account", side)));
        }
        if !self.amount.is_positive() {
            return Err(Error::validation(format!(
                "{} amount must be positive, got {}",
                side, self.amount
            )));
        }
        if self.amount.to_minor() > MAX_LEG_AMOUNT {
            return Err(Error::validation(format!("{} amount {} is too large", side, self.amount)));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Expense,
    Income,
    Transfer,
    Exchange,
    Adjustment,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntryKind::Expense => "expense",
            EntryKind::Income => "income",
            EntryKind::Transfer => "transfer",
            EntryKind::Exchange => "exchange",
            EntryKind::Adjustment => "adjustment",
        };
        f.write_str(label)
    }
}

/// Money movement of an entry, keyed by kind. Each kind carries exactly the
/// legs it needs, so the snapshot engine matches exhaustively instead of
/// probing optional fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EntryBody {
    Expense {
        debit: Leg,
    },
    Income {
        credit: Leg,
    },
    Transfer {
        debit: Leg,
        credit: Leg,
    },
    Exchange {
        debit: Leg,
        credit: Leg,
    },
    /// Shadow correction of `ref_original_id`. `replacement` is the complete
    /// new payload; `supersedes` is the payload that was in effect when the
    /// edit was made, which keeps apply/reverse self-contained.
    Adjustment {
        ref_original_id: EntryId,
        replacement: Box<Payload>,
        supersedes: Box<Payload>,
    },
}

impl EntryBody {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryBody::Expense { .. } => EntryKind::Expense,
            EntryBody::Income { .. } => EntryKind::Income,
            EntryBody::Transfer { .. } => EntryKind::Transfer,
            EntryBody::Exchange { .. } => EntryKind::Exchange,
            EntryBody::Adjustment { .. } => EntryKind::Adjustment,
        }
    }

    pub fn debit(&self) -> Option<&Leg> {
        match self {
            EntryBody::Expense { debit }
            | EntryBody::Transfer { debit, .. }
            | EntryBody::Exchange { debit, .. } => Some(debit),
            EntryBody::Income { .. } | EntryBody::Adjustment { .. } => None,
        }
    }

    pub fn credit(&self) -> Option<&Leg> {
        match self {
            EntryBody::Income { credit }
            | EntryBody::Transfer { credit, .. }
            | EntryBody::Exchange { credit, .. } => Some(credit),
            EntryBody::Expense { .. } | EntryBody::Adjustment { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            EntryBody::Expense { debit } => debit.validate("debit"),
            EntryBody::Income { credit } => credit.validate("credit"),
            EntryBody::Transfer { debit, credit } => {
                debit.validate("debit")?;
                credit.validate("credit")?;
                if debit.account == credit.account && debit.currency == credit.currency {
                    return Err(Error::validation(format!(
                        "transfer from {} to itself in {}",
                        debit.account, debit.currency
                    )));
                }
                Ok(())
            }
            EntryBody::Exchange { debit, credit } => {
                debit.validate("debit")?;
                credit.validate("credit")?;
                if debit.currency == credit.currency {
                    return Err(Error::validation(format!(
                        "exchange needs two different currencies, got {} on both legs",
                        debit.currency
                    )));
                }
                Ok(())
            }
            EntryBody::Adjustment { ref_original_id, replacement, supersedes } => {
                if ref_original_id.as_str().is_empty() {
                    return Err(Error::validation("adjustment without refOriginalId"));
                }
                replacement.validate()?;
                supersedes.validate()
            }
        }
    }
}

/// The user-editable part of an entry: everything except identity and time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub category: String,
    pub note: String,
    #[serde(flatten)]
    pub body: EntryBody,
}

impl Payload {
    pub fn new(category: impl Into<String>, note: impl Into<String>, body: EntryBody) -> Self {
        Payload {
            category: category.into(),
            note: note.into(),
            body,
        }
    }

    /// Payloads are movements; an adjustment can never be nested in another.
    pub fn validate(&self) -> Result<()> {
        if let EntryBody::Adjustment { ref_original_id, .. } = &self.body {
            return Err(Error::AdjustmentOfAdjustment(ref_original_id.clone()));
        }
        self.body.validate()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub note: String,
    #[serde(flatten)]
    pub body: EntryBody,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_id: Option<EntryId>,
}

impl LedgerEntry {
    pub fn kind(&self) -> EntryKind {
        self.body.kind()
    }

    pub fn is_adjustment(&self) -> bool {
        matches!(self.body, EntryBody::Adjustment { .. })
    }

    /// Id of the entry this one corrects, if it is an adjustment.
    pub fn adjusted_original(&self) -> Option<&EntryId> {
        match &self.body {
            EntryBody::Adjustment { ref_original_id, .. } => Some(ref_original_id),
            _ => None,
        }
    }

    pub fn payload(&self) -> Payload {
        Payload {
            category: self.category.clone(),
            note: self.note.clone(),
            body: self.body.clone(),
        }
    }

    /// Keeps this entry's identity and time, takes every payload field from
    /// `payload`.
    pub fn with_payload(&self, payload: &Payload) -> LedgerEntry {
        LedgerEntry {
            id: self.id.clone(),
            timestamp: self.timestamp,
            category: payload.category.clone(),
            note: payload.note.clone(),
            body: payload.body.clone(),
            content_hash: self.content_hash.clone(),
            prev_id: self.prev_id.clone(),
        }
    }
}

/// A validated entry that has not been given an id yet. The day-file manager
/// or the session chain stamps it on append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEntry {
    pub timestamp: DateTime<Utc>,
    pub payload: Payload,
}

impl NewEntry {
    pub fn new(timestamp: DateTime<Utc>, payload: Payload) -> Result<Self> {
        payload.body.validate()?;
        Ok(NewEntry { timestamp, payload })
    }

    pub fn kind(&self) -> EntryKind {
        self.payload.body.kind()
    }

    pub fn content_hash(&self) -> String {
        crate::utils::hash::content_hash(self.timestamp, &self.payload)
    }

    pub fn into_entry(self, id: EntryId, content_hash: String, prev_id: Option<EntryId>) -> LedgerEntry {
        LedgerEntry {
            id,
            timestamp: self.timestamp,
            category: self.payload.category,
            note: self.payload.note,
            body: self.payload.body,
            content_hash,
            prev_id,
        }
    }
}
