use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::ledger::{Reconciliation, TransferReceipt, TransferTarget};
use crate::models::{Account, AccountType, LedgerError, Transaction, TransactionType, User};
use crate::storage::{
    active_account_key, load_collection, load_value, save_collection, save_value, Storage, ACCOUNTS_KEY,
    TRANSACTIONS_KEY
};
use crate::types::{AccountId, UserId};

const INITIAL_DEPOSIT: &str = "Initial deposit";

/// Accounts, balances and the transaction log.
///
/// Each mutation loads the complete `accounts` collection, changes the affected
/// records, writes the collection back and appends to `transactions`. Mutations run
/// one at a time behind an internal lock; reads do not take it.
pub struct LedgerStore<S: Storage> {
    storage: Arc<S>,
    settings: Settings,
    write_lock: Mutex<()>
}

impl<S: Storage> LedgerStore<S> {
    pub fn new(storage: Arc<S>, settings: Settings) -> Self {
        Self {
            storage,
            settings,
            write_lock: Mutex::new(())
        }
    }

    /// Prepares a freshly logged in user.
    ///
    /// A user without accounts receives a checking account holding the opening
    /// balance. The stored active account is kept if it still belongs to the user,
    /// otherwise the first account becomes active.
    pub async fn ensure_accounts(&self, user: &User) -> Result<Vec<Account>, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts()?;

        if !accounts.iter().any(|account| account.user_id == user.id) {
            let mut account = Account::new(user.id, AccountType::Checking, Decimal::ZERO);
            let mut entries = Vec::new();

            if self.settings.opening_balance > Decimal::ZERO {
                let opening = Transaction::new(account.id, TransactionType::Deposit, self.settings.opening_balance, INITIAL_DEPOSIT, Utc::now());
                account.apply(&opening)?;
                entries.push(opening);
            }

            info!("Opened default account [{}] for user [{}]", account.id, user.id);
            accounts.push(account);
            self.commit(&accounts, &entries)?;
        }

        let owned: Vec<Account> = accounts.into_iter().filter(|account| account.user_id == user.id).collect();
        let active = self.resolve_active(&owned, user.id)?;
        save_value(&*self.storage, &active_account_key(user.id), &active.id)?;

        Ok(owned)
    }

    /// Opens an additional account funded by `initial_deposit`; it becomes the active account.
    pub async fn create_account(&self, user: &User, account_type: AccountType, initial_deposit: Decimal) -> Result<Account, LedgerError> {
        sleep(self.settings.ledger_latency).await;

        let mut account = Account::new(user.id, account_type, Decimal::ZERO);
        let opening = Transaction::new(account.id, TransactionType::Deposit, initial_deposit, INITIAL_DEPOSIT, Utc::now());
        account.apply(&opening)?;

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts()?;
        accounts.push(account.clone());

        self.commit(&accounts, &[opening])?;
        save_value(&*self.storage, &active_account_key(user.id), &account.id)?;
        info!("User [{}] opened {} account [{}]", user.id, account_type, account.id);

        Ok(account)
    }

    pub fn accounts_for(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
        Ok(self.accounts()?.into_iter().filter(|account| account.user_id == user_id).collect())
    }

    /// First account of the given type owned by the user.
    pub fn find_account_by_type(&self, user_id: UserId, account_type: AccountType) -> Result<Option<Account>, LedgerError> {
        Ok(self.accounts_for(user_id)?.into_iter().find(|account| account.account_type == account_type))
    }

    pub fn active_account(&self, user: &User) -> Result<Account, LedgerError> {
        let owned = self.accounts_for(user.id)?;
        self.resolve_active(&owned, user.id)
    }

    pub fn set_active_account(&self, user: &User, account_id: AccountId) -> Result<Account, LedgerError> {
        let account = self.accounts_for(user.id)?
            .into_iter()
            .find(|account| account.id == account_id)
            .ok_or(LedgerError::AccountNotFound { account_id })?;

        save_value(&*self.storage, &active_account_key(user.id), &account.id)?;
        debug!("User [{}] selected account [{}]", user.id, account.id);

        Ok(account)
    }

    /// Credits the active account.
    pub async fn deposit(&self, user: &User, amount: Decimal, description: &str) -> Result<Transaction, LedgerError> {
        self.post(user, TransactionType::Deposit, amount, description).await
    }

    /// Debits the active account; amounts above the balance are rejected.
    pub async fn withdraw(&self, user: &User, amount: Decimal, description: &str) -> Result<Transaction, LedgerError> {
        self.post(user, TransactionType::Withdrawal, amount, description).await
    }

    /// Moves funds out of the active account.
    ///
    /// Internal transfers credit the destination and book two entries with a shared
    /// timestamp. External transfers only debit the source and book one entry.
    pub async fn transfer(&self, user: &User, amount: Decimal, target: TransferTarget, description: &str) -> Result<TransferReceipt, LedgerError> {
        sleep(self.settings.ledger_latency).await;

        let description = or_default(description, "Transfer");
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts()?;
        let source_index = self.active_index(&accounts, user.id)?;
        let mut source = accounts[source_index].clone();
        let timestamp = Utc::now();

        let receipt = match target {
            TransferTarget::Internal(destination_id) => {
                if destination_id == source.id {
                    return Err(LedgerError::SameAccountTransfer { account_id: source.id })
                }

                let destination_index = accounts.iter()
                    .position(|account| account.id == destination_id)
                    .ok_or(LedgerError::AccountNotFound { account_id: destination_id })?;
                let mut destination = accounts[destination_index].clone();

                if destination.user_id != user.id {
                    return Err(LedgerError::UnauthorizedTransfer { account_id: destination_id, user_id: user.id })
                }

                let debit = Transaction::new(source.id, TransactionType::Transfer, amount, format!("{description} to {} (Internal)", destination.label()), timestamp);
                let credit = Transaction::new(destination.id, TransactionType::Deposit, amount, format!("Transfer from {}", source.label()), timestamp);

                source.apply(&debit)?;
                destination.apply(&credit)?;

                accounts[source_index] = source;
                accounts[destination_index] = destination;

                TransferReceipt { debit, credit: Some(credit) }
            }
            TransferTarget::External { account_number, recipient_name } => {
                let account_number = account_number.trim();

                if account_number.is_empty() {
                    return Err(LedgerError::InvalidRecipient("Recipient account number is required".to_string()))
                }

                let recipient = or_default(&recipient_name, account_number);
                let debit = Transaction::new(source.id, TransactionType::Transfer, amount, format!("{description} to {recipient}"), timestamp);

                source.apply(&debit)?;
                accounts[source_index] = source;

                TransferReceipt { debit, credit: None }
            }
        };

        let mut entries = vec![receipt.debit.clone()];
        entries.extend(receipt.credit.clone());

        self.commit(&accounts, &entries)?;
        info!("Transfer of {} from account [{}] booked {} entries", amount, receipt.debit.account_id, entries.len());

        Ok(receipt)
    }

    /// Every entry booked against the user's accounts, in booking order.
    pub fn transactions_for(&self, user_id: UserId) -> Result<Vec<Transaction>, LedgerError> {
        let owned: Vec<AccountId> = self.accounts_for(user_id)?.into_iter().map(|account| account.id).collect();

        Ok(self.transactions()?
            .into_iter()
            .filter(|transaction| owned.contains(&transaction.account_id))
            .collect())
    }

    /// Latest `limit` entries for one account, newest first.
    pub fn recent_transactions(&self, account_id: AccountId, limit: usize) -> Result<Vec<Transaction>, LedgerError> {
        let mut entries: Vec<Transaction> = self.transactions()?
            .into_iter()
            .rev()
            .filter(|transaction| transaction.account_id == account_id)
            .collect();

        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.truncate(limit);

        Ok(entries)
    }

    /// Default page size for `recent_transactions`.
    pub fn recent_limit(&self) -> usize {
        self.settings.recent_limit
    }

    /// The full transaction log, for the admin view.
    pub fn all_transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        self.transactions()
    }

    pub fn all_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.accounts()
    }

    pub fn reconcile(&self, account_id: AccountId) -> Result<Reconciliation, LedgerError> {
        let account = self.accounts()?
            .into_iter()
            .find(|account| account.id == account_id)
            .ok_or(LedgerError::AccountNotFound { account_id })?;

        let ledger_total: Decimal = self.transactions()?
            .iter()
            .filter(|transaction| transaction.account_id == account_id)
            .map(Transaction::signed_amount)
            .sum();

        let reconciliation = Reconciliation { account_id, balance: account.balance, ledger_total };

        if !reconciliation.is_balanced() {
            warn!("Account [{}] balance {} does not match ledger total {}", account_id, account.balance, ledger_total);
        }

        Ok(reconciliation)
    }

    async fn post(&self, user: &User, transaction_type: TransactionType, amount: Decimal, description: &str) -> Result<Transaction, LedgerError> {
        sleep(self.settings.ledger_latency).await;

        let default_description = match transaction_type {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Transfer => "Transfer"
        };

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.accounts()?;
        let index = self.active_index(&accounts, user.id)?;
        let transaction = Transaction::new(accounts[index].id, transaction_type, amount, or_default(description, default_description), Utc::now());

        accounts[index].apply(&transaction)?;
        self.commit(&accounts, std::slice::from_ref(&transaction))?;
        info!("{:?} of {} on account [{}]", transaction_type, amount, transaction.account_id);

        Ok(transaction)
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(load_collection(&*self.storage, ACCOUNTS_KEY)?)
    }

    fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        Ok(load_collection(&*self.storage, TRANSACTIONS_KEY)?)
    }

    /// Writes the account collection back and appends `entries` to the log.
    ///
    /// If the log append fails the previous account collection is put back, so
    /// balances never move without their entries.
    fn commit(&self, accounts: &[Account], entries: &[Transaction]) -> Result<(), LedgerError> {
        let previous = self.storage.get_item(ACCOUNTS_KEY)?;
        save_collection(&*self.storage, ACCOUNTS_KEY, accounts)?;

        if entries.is_empty() {
            return Ok(())
        }

        if let Err(error) = self.append(entries) {
            warn!("Ledger append failed, restoring accounts: {error}");

            match previous {
                Some(raw) => self.storage.set_item(ACCOUNTS_KEY, raw)?,
                None => self.storage.remove_item(ACCOUNTS_KEY)?
            }

            return Err(error)
        }

        Ok(())
    }

    fn append(&self, entries: &[Transaction]) -> Result<(), LedgerError> {
        let mut transactions = self.transactions()?;
        transactions.extend_from_slice(entries);
        save_collection(&*self.storage, TRANSACTIONS_KEY, &transactions)?;

        Ok(())
    }

    fn resolve_active(&self, owned: &[Account], user_id: UserId) -> Result<Account, LedgerError> {
        let selected: Option<AccountId> = load_value(&*self.storage, &active_account_key(user_id))?;

        selected
            .and_then(|account_id| owned.iter().find(|account| account.id == account_id))
            .or_else(|| owned.first())
            .cloned()
            .ok_or(LedgerError::NoActiveAccount { user_id })
    }

    fn active_index(&self, accounts: &[Account], user_id: UserId) -> Result<usize, LedgerError> {
        let owned: Vec<Account> = accounts.iter().filter(|account| account.user_id == user_id).cloned().collect();
        let active = self.resolve_active(&owned, user_id)?;

        accounts.iter()
            .position(|account| account.id == active.id)
            .ok_or(LedgerError::NoActiveAccount { user_id })
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() { default } else { value }
}
