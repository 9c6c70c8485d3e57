use std::sync::Arc;
use anyhow::Context;
use dayledger::config::LedgerConfig;
use dayledger::entries::{AppendOptions, EntryBody, EntryKind};
use dayledger::observability::logging::init_logging;
use dayledger::observability::metrics::register_metrics;
use dayledger::storage::{InMemoryBlobStore, StaticAccountDirectory};
use dayledger::types::account::{Account, AccountType};
use dayledger::types::ids::AccountId;
use dayledger::types::money::{Amount, Currency};
use dayledger::types::timestamp::SystemClock;
use dayledger::LedgerService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("DAYLEDGER_ENV").unwrap_or_else(|_| "development".to_string());
    let config = LedgerConfig::load(&env).context("loading configuration")?;
    init_logging(&config.logging).context("initialising logging")?;
    register_metrics().context("registering metrics")?;

    let twd = Currency::new("TWD")?;
    let usd = Currency::new("USD")?;
    let accounts = Arc::new(StaticAccountDirectory::new(vec![
        Account::new("bank", "Bank", AccountType::Bank, twd.clone()),
        Account::new("cash", "Wallet", AccountType::Cash, twd.clone()),
        Account::new("usd", "USD savings", AccountType::Bank, usd.clone()),
    ]));

    let store = Arc::new(InMemoryBlobStore::new());
    let ledger = LedgerService::authenticated("demo user", store.clone(), accounts, Arc::new(SystemClock), config)?;

    let bank = AccountId::from("bank");
    let cash = AccountId::from("cash");

    ledger
        .append_ledger_entry(EntryKind::Income, Amount::parse("30000")?, "salary", "", &bank, AppendOptions::default())
        .await?;
    let lunch = ledger
        .append_ledger_entry(EntryKind::Expense, Amount::parse("100")?, "food", "lunch", &cash, AppendOptions::default())
        .await?;
    ledger
        .append_ledger_entry(
            EntryKind::Transfer,
            Amount::parse("5000")?,
            "atm",
            "",
            &bank,
            AppendOptions {
                to_account: Some(cash.clone()),
                ..Default::default()
            },
        )
        .await?;
    ledger
        .append_ledger_entry(
            EntryKind::Exchange,
            Amount::parse("32550")?,
            "fx",
            "",
            &bank,
            AppendOptions {
                to_amount: Some(Amount::parse("1000")?),
                to_currency: Some(usd.clone()),
                ..Default::default()
            },
        )
        .await?;

    let history = ledger.get_history(10).await?;
    if let Some(line) = history.iter().find(|line| line.entry.id == lunch) {
        let mut corrected = line.entry.payload();
        corrected.note = "lunch with client".to_string();
        if let EntryBody::Expense { debit } = &mut corrected.body {
            debit.amount = Amount::parse("150")?;
        }
        let adjustment = ledger.edit_entry(&line.entry, corrected).await?;
        tracing::info!("Lunch corrected by {}", adjustment.id);
    }

    for line in ledger.get_history(10).await? {
        println!(
            "{:<40} {:<10} {:<8} cash={} bank={}",
            line.entry.id.to_string(),
            line.entry.kind().to_string(),
            line.entry.category,
            line.snapshot.balance(&cash, &twd),
            line.snapshot.balance(&bank, &twd),
        );
    }

    for (account, per_currency) in ledger.get_account_balances().await? {
        for (currency, amount) in per_currency {
            println!("{:<8} {} {}", account.to_string(), currency, amount);
        }
    }
    println!("files: {:?}", store.file_names());

    Ok(())
}
