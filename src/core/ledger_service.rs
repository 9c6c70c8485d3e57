use std::sync::Arc;
use chrono::NaiveDate;
use im::OrdMap;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::Instrument;
use crate::chain::{SessionChain, SessionMode};
use crate::config::LedgerConfig;
use crate::correction::build_adjustment;
use crate::daily::manager::{AppendOutcome, DailyFileManager};
use crate::entries::entry::{EntryKind, LedgerEntry, NewEntry, Payload};
use crate::entries::request::{AppendOptions, EntryRequest};
use crate::error::{Error, Result};
use crate::interfaces::account_provider::AccountDirectory;
use crate::interfaces::blob_store::BlobStore;
use crate::observability::tracing::trace_append;
use crate::replay::history::{EntryWithSnapshot, Fidelity, HistoryPage, HistoryReconstructor, Reconstruction};
use crate::snapshot::state::CurrencyBalances;
use crate::snapshot::Snapshot;
use crate::types::ids::{AccountId, EntryId};
use crate::types::money::{Amount, Currency};
use crate::types::timestamp::{calendar_day, Clock};
use crate::utils::helper::sanitize_user_name;

struct Durable {
    manager: Arc<DailyFileManager>,
    history: HistoryReconstructor,
    // Held from the store write until the chain has adopted the result.
    appending: Mutex<()>,
    // Set once the chain reflects the stored day-files.
    loaded: OnceCell<()>,
}

/// Entry point used by the UI and other collaborators.
///
/// Authenticated sessions write to day-files in the backing store and keep a
/// session chain as a fast view of the latest balances. Guest sessions have
/// no store: the chain is the ledger and disappears with the service.
pub struct LedgerService {
    user: String,
    durable: Option<Durable>,
    accounts: Arc<dyn AccountDirectory>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    default_currency: Currency,
    chain: Arc<RwLock<SessionChain>>,
}

impl LedgerService {
    pub fn authenticated(
        user_identity: &str,
        store: Arc<dyn BlobStore>,
        accounts: Arc<dyn AccountDirectory>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let default_currency = config.ledger.default_currency()?;
        let signer = config
            .storage
            .signer_id
            .clone()
            .unwrap_or_else(|| sanitize_user_name(user_identity));

        let manager = Arc::new(DailyFileManager::new(
            store,
            config.storage.folder_name.clone(),
            signer,
            default_currency.clone(),
            config.ledger.legacy_migration,
        ));
        let durable = Durable {
            history: HistoryReconstructor::new(manager.clone()),
            manager,
            appending: Mutex::new(()),
            loaded: OnceCell::new(),
        };

        Ok(LedgerService {
            user: user_identity.to_string(),
            durable: Some(durable),
            accounts,
            clock,
            config,
            default_currency,
            chain: Arc::new(RwLock::new(SessionChain::new(SessionMode::Authenticated))),
        })
    }

    pub fn guest(accounts: Arc<dyn AccountDirectory>, clock: Arc<dyn Clock>, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let default_currency = config.ledger.default_currency()?;
        Ok(LedgerService {
            user: crate::utils::helper::ANONYMOUS_USER.to_string(),
            durable: None,
            accounts,
            clock,
            config,
            default_currency,
            chain: Arc::new(RwLock::new(SessionChain::new(SessionMode::Guest))),
        })
    }

    pub fn mode(&self) -> SessionMode {
        match self.durable {
            Some(_) => SessionMode::Authenticated,
            None => SessionMode::Guest,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Shared handle on this session's chain.
    pub fn chain(&self) -> Arc<RwLock<SessionChain>> {
        self.chain.clone()
    }

    pub fn file_manager(&self) -> Option<&Arc<DailyFileManager>> {
        self.durable.as_ref().map(|d| &d.manager)
    }

    /// Appends a new entry and returns its id. Appending the same logical
    /// entry again returns the id it was first stored under.
    pub async fn append_ledger_entry(
        &self,
        kind: EntryKind,
        amount: Amount,
        category: &str,
        note: &str,
        account_id: &AccountId,
        options: AppendOptions,
    ) -> Result<EntryId> {
        self.append_request(EntryRequest {
            kind,
            amount,
            category: category.to_string(),
            note: note.to_string(),
            account: account_id.clone(),
            options,
        })
        .await
    }

    pub async fn append_request(&self, request: EntryRequest) -> Result<EntryId> {
        let home_currency = self.home_currency(&request.account).await?;
        let new_entry = request.into_new_entry(home_currency, self.clock.now())?;
        let outcome = self.append_new(new_entry).await?;
        Ok(outcome.entry().id.clone())
    }

    /// Newest `limit` entries with the balances right after each.
    pub async fn get_history(&self, limit: usize) -> Result<Vec<EntryWithSnapshot>> {
        self.get_history_page(0, limit).await.map(|page| page.entries)
    }

    /// Newest-first page of the history. A `limit` of zero means the
    /// configured page size.
    ///
    /// When the backing store fails and the session chain holds entries, the
    /// chain is served instead and the page is marked `Fidelity::Reduced`.
    pub async fn get_history_page(&self, offset: usize, limit: usize) -> Result<HistoryPage> {
        let limit = if limit == 0 { self.config.ledger.history_page_size } else { limit };
        let Some(durable) = &self.durable else {
            return Ok(self.chain_page(offset, limit, Fidelity::Full).await);
        };

        match durable.history.get_page(&self.user, offset, limit).await {
            Ok(page) => Ok(page),
            Err(e) if e.is_persistence() && self.config.ledger.fallback_to_session_chain => {
                if self.chain.read().await.is_empty() {
                    return Err(e);
                }
                tracing::warn!("History read failed ({}); serving the session chain", e);
                let reason = e.to_string();
                Ok(self.chain_page(offset, limit, Fidelity::Reduced { reason }).await)
            }
            Err(e) => Err(e),
        }
    }

    /// Corrects `original` by appending an adjustment carrying `new_payload`.
    /// The stored original is never modified.
    pub async fn edit_entry(&self, original: &LedgerEntry, new_payload: Payload) -> Result<LedgerEntry> {
        if original.is_adjustment() {
            return Err(Error::AdjustmentOfAdjustment(original.id.clone()));
        }

        let target = self.effective_entry(&original.id).await?;
        let adjustment = build_adjustment(&target, new_payload, self.clock.now())?;
        let outcome = self.append_new(adjustment).await?;
        tracing::info!("Entry {} corrected by {}", original.id, outcome.entry().id);
        Ok(outcome.entry().clone())
    }

    /// Balances after the latest stored entry.
    ///
    /// The first call of an authenticated session that has not appended or
    /// synced yet loads the chain from the day-files.
    pub async fn get_current_snapshot(&self) -> Result<Snapshot> {
        if let Some(durable) = &self.durable {
            durable
                .loaded
                .get_or_try_init(|| async {
                    let empty = self.chain.read().await.is_empty();
                    if empty {
                        self.sync().await?;
                    }
                    Ok::<(), Error>(())
                })
                .await?;
        }
        Ok(self.chain.read().await.current_snapshot())
    }

    /// Current balances per account, with every active account present in at
    /// least its home currency.
    pub async fn get_account_balances(&self) -> Result<OrdMap<AccountId, CurrencyBalances>> {
        let accounts = self.accounts.list_accounts().await?;
        let snapshot = self.get_current_snapshot().await?;
        Ok(snapshot.zero_filled(&accounts).balances)
    }

    /// Reloads the session chain from the day-files. No-op for guests.
    pub async fn sync(&self) -> Result<()> {
        let Some(durable) = &self.durable else {
            return Ok(());
        };

        let _appending = durable.appending.lock().await;
        let Reconstruction { entries, closing, .. } = durable.history.reconstruct(&self.user).await?;
        let mut chain = self.chain.write().await;
        chain.reset(closing);
        for line in entries.into_iter().rev() {
            chain.adopt(line.entry, line.snapshot);
        }
        tracing::info!("Session chain synced with {} entries", chain.len());
        Ok(())
    }

    async fn append_new(&self, new_entry: NewEntry) -> Result<AppendOutcome> {
        let date = calendar_day(self.clock.now(), self.config.ledger.utc_offset_minutes);
        let span = trace_append(&self.user, date, new_entry.kind());
        self.append_on(date, new_entry).instrument(span).await
    }

    // Placement follows the append day, not the entry's own timestamp.
    async fn append_on(&self, date: NaiveDate, new_entry: NewEntry) -> Result<AppendOutcome> {
        let Some(durable) = &self.durable else {
            return Ok(self.chain.write().await.append(date, new_entry));
        };

        let _appending = durable.appending.lock().await;
        let (handle, _) = durable.manager.find_or_create(date, &self.user).await?;
        let outcome = durable.manager.append_entry(&handle, new_entry).await?;
        self.chain
            .write()
            .await
            .adopt(outcome.entry().clone(), outcome.balances().clone());
        Ok(outcome)
    }

    // Effective form of an entry: merged with its latest adjustment.
    async fn effective_entry(&self, id: &EntryId) -> Result<LedgerEntry> {
        let lines = match &self.durable {
            Some(durable) => durable.history.reconstruct(&self.user).await?.entries,
            None => self.chain.read().await.history(),
        };
        lines
            .into_iter()
            .find(|line| &line.entry.id == id)
            .map(|line| line.entry)
            .ok_or_else(|| Error::NotFound(format!("entry {}", id)))
    }

    async fn home_currency(&self, account_id: &AccountId) -> Result<Currency> {
        let accounts = self.accounts.list_accounts().await?;
        match accounts.iter().find(|a| &a.id == account_id) {
            Some(account) if !account.is_active() => {
                Err(Error::validation(format!("account {} is deleted", account_id)))
            }
            Some(account) => Ok(account.currency.clone()),
            None => Ok(self.default_currency.clone()),
        }
    }

    async fn chain_page(&self, offset: usize, limit: usize, fidelity: Fidelity) -> HistoryPage {
        let chain = self.chain.read().await;
        Reconstruction {
            entries: chain.history(),
            closing: chain.current_snapshot(),
            skipped_files: Vec::new(),
        }
        .page(offset, limit, fidelity)
    }
}
