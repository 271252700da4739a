use crate::config::Settings;
use crate::engine::{Command, CommandError, Operation};
use crate::identity::IdentityStore;
use crate::ledger::{LedgerStore, TransferTarget};
use crate::models::{AccountType, IdentityError, User};
use crate::storage::Storage;
use crate::types::format_amount;
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{debug, error, info, warn};

/// Outcome counts for one script run.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct RunSummary {
    pub applied: usize,
    pub rejected: usize
}

/// One line of the account report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub email: String,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    /// Whether the balance matches the account's ledger entries.
    pub reconciled: bool
}

/// Replays banking scripts against the identity and ledger stores.
pub struct CommandEngine<S: Storage> {
    identity: IdentityStore<S>,
    ledger: LedgerStore<S>,
    backpressure: usize
}

impl<S: Storage> CommandEngine<S> {
    pub fn new(storage: Arc<S>, settings: Settings) -> Result<Self, IdentityError> {
        Ok(Self {
            identity: IdentityStore::new(storage.clone(), settings.clone())?,
            ledger: LedgerStore::new(storage, settings),
            backpressure: 256
        })
    }

    pub fn identity(&self) -> &IdentityStore<S> {
        &self.identity
    }

    pub fn ledger(&self) -> &LedgerStore<S> {
        &self.ledger
    }

    /// Reads the script at `path` and applies every row in order.
    ///
    /// Rows that fail to parse or are rejected by the stores are logged and skipped.
    pub async fn run(&self, path: &str) -> anyhow::Result<RunSummary> {
        if let Some(user) = self.identity.current_user().await {
            self.ledger.ensure_accounts(&user).await?;
        }

        let (sender, receiver) = mpsc::channel::<Command>(self.backpressure);
        let csv_handle = self.spawn_csv_reader(path.to_string(), sender);
        let summary = self.process_commands(receiver).await;

        if let Err(error) = csv_handle.await {
            error!("CSV ingestion failed: {error}");
        }

        info!("Script finished: {} applied, {} rejected", summary.applied, summary.rejected);

        Ok(summary)
    }

    /// Applies a single command as the current session user.
    pub async fn execute(&self, command: &Command) -> Result<(), CommandError> {
        let operation = command.op;

        match operation {
            Operation::Register => {
                let user = self.identity.register(
                    required(operation, "name", &command.name)?,
                    required(operation, "email", &command.email)?,
                    required(operation, "password", &command.password)?
                ).await?;
                self.ledger.ensure_accounts(&user).await?;
            }
            Operation::Login => {
                let user = self.identity.login(
                    required(operation, "email", &command.email)?,
                    required(operation, "password", &command.password)?,
                    command.remember.unwrap_or(false)
                ).await?;
                self.ledger.ensure_accounts(&user).await?;
            }
            Operation::Logout => {
                self.identity.logout().await?;
            }
            Operation::Open => {
                let user = self.session(operation).await?;
                let account_type = command.account.ok_or(CommandError::MissingField { operation, field: "account" })?;
                let amount = command.amount.ok_or(CommandError::MissingField { operation, field: "amount" })?;
                self.ledger.create_account(&user, account_type, amount).await?;
            }
            Operation::Select => {
                let user = self.session(operation).await?;
                let account_type = command.account.ok_or(CommandError::MissingField { operation, field: "account" })?;
                self.select(&user, account_type)?;
            }
            Operation::Deposit | Operation::Withdraw => {
                let user = self.session(operation).await?;
                let amount = command.amount.ok_or(CommandError::MissingField { operation, field: "amount" })?;
                let description = command.description.as_deref().unwrap_or_default();

                if let Some(account_type) = command.account {
                    self.select(&user, account_type)?;
                }

                if operation == Operation::Deposit {
                    self.ledger.deposit(&user, amount, description).await?;
                } else {
                    self.ledger.withdraw(&user, amount, description).await?;
                }
            }
            Operation::Transfer => {
                let user = self.session(operation).await?;
                let amount = command.amount.ok_or(CommandError::MissingField { operation, field: "amount" })?;
                let target = required(operation, "target", &command.target)?;

                if let Some(account_type) = command.account {
                    self.select(&user, account_type)?;
                }

                let target = match AccountType::from_str(target) {
                    Ok(account_type) => {
                        let destination = self.ledger.find_account_by_type(user.id, account_type)?
                            .ok_or(CommandError::AccountTypeNotFound { account_type })?;
                        TransferTarget::Internal(destination.id)
                    }
                    Err(_) => TransferTarget::External {
                        account_number: target.to_string(),
                        recipient_name: command.name.clone().unwrap_or_default()
                    }
                };

                self.ledger.transfer(&user, amount, target, command.description.as_deref().unwrap_or_default()).await?;
            }
            Operation::Password => {
                self.identity.change_password(
                    required(operation, "password", &command.password)?,
                    required(operation, "target", &command.target)?
                ).await?;
            }
            Operation::Profile => {
                self.identity.update_profile(
                    required(operation, "name", &command.name)?,
                    required(operation, "email", &command.email)?
                ).await?;
            }
            Operation::Status => {
                let email = required(operation, "email", &command.email)?;
                let is_active = match required(operation, "target", &command.target)?.to_lowercase().as_str() {
                    "active" => true,
                    "inactive" => false,
                    other => return Err(CommandError::InvalidField { operation, field: "target", value: other.to_string() })
                };
                let user = self.identity.find_by_email(email)?
                    .ok_or_else(|| CommandError::UnknownUser { email: email.to_string() })?;
                self.identity.set_user_status(user.id, is_active).await?;
            }
            Operation::History => {
                let user = self.session(operation).await?;

                if let Some(account_type) = command.account {
                    self.select(&user, account_type)?;
                }

                let account = self.ledger.active_account(&user)?;
                let entries = self.ledger.transactions_for(user.id)?.len();
                info!("{} holds {} ({} entries across all accounts)", account.label(), format_amount(account.balance), entries);

                for transaction in self.ledger.recent_transactions(account.id, self.ledger.recent_limit())? {
                    info!("  {} {:?} {} {}", transaction.date.to_rfc3339(), transaction.transaction_type, format_amount(transaction.amount), transaction.description);
                }
            }
            Operation::Users => {
                let query = command.target.as_deref().unwrap_or_default();
                let users = self.identity.search_users(query).await?;
                let transactions = self.ledger.all_transactions()?.len();
                info!("{} users match '{query}', {transactions} transactions on record", users.len());

                for user in users {
                    info!("  {} <{}> {:?} active={}", user.name, user.email, user.role, user.is_active);
                }
            }
        }

        Ok(())
    }

    /// Every account with its owner, ordered by owner email then opening time.
    pub fn report(&self) -> Result<Vec<ReportRow>, CommandError> {
        let emails: HashMap<_, _> = self.identity.users()?
            .into_iter()
            .map(|user| (user.id, user.email))
            .collect();

        let mut accounts = self.ledger.all_accounts()?;
        accounts.sort_by(|a, b| {
            emails.get(&a.user_id).cmp(&emails.get(&b.user_id)).then(a.created_at.cmp(&b.created_at))
        });

        let mut rows = Vec::with_capacity(accounts.len());

        for account in accounts {
            let reconciliation = self.ledger.reconcile(account.id)?;

            rows.push(ReportRow {
                email: emails.get(&account.user_id).cloned().unwrap_or_default(),
                account_number: account.account_number,
                account_type: account.account_type,
                balance: account.balance,
                reconciled: reconciliation.is_balanced()
            });
        }

        Ok(rows)
    }

    fn spawn_csv_reader(&self, path: String, sender: mpsc::Sender<Command>) -> JoinHandle<()> {
        spawn_blocking(move || {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(error) => {
                    error!("Error opening CSV at path: {path} | {error}");
                    return;
                }
            };

            let mut reader = ReaderBuilder::new()
                .trim(Trim::All)
                .flexible(true)
                .from_reader(BufReader::new(file));

            for result in reader.deserialize::<Command>() {
                match result {
                    Ok(command) => {
                        if sender.blocking_send(command).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        error!("CSV deserialization error: {error}");
                    }
                }
            }
        })
    }

    async fn process_commands(&self, mut receiver: mpsc::Receiver<Command>) -> RunSummary {
        let mut summary = RunSummary::default();

        //NOTE: Commands share one session, so they are applied strictly in file order.
        while let Some(command) = receiver.recv().await {
            match self.execute(&command).await {
                Ok(()) => {
                    debug!("Command [{:?}] applied", command.op);
                    summary.applied += 1;
                }
                Err(error) => {
                    warn!("Command [{:?}] rejected: {error}", command.op);
                    summary.rejected += 1;
                }
            }
        }

        summary
    }

    async fn session(&self, operation: Operation) -> Result<User, CommandError> {
        self.identity.current_user().await.ok_or(CommandError::NotAuthenticated { operation })
    }

    fn select(&self, user: &User, account_type: AccountType) -> Result<(), CommandError> {
        let account = self.ledger.find_account_by_type(user.id, account_type)?
            .ok_or(CommandError::AccountTypeNotFound { account_type })?;
        self.ledger.set_active_account(user, account.id)?;
        Ok(())
    }
}

fn required<'a>(operation: Operation, field: &'static str, value: &'a Option<String>) -> Result<&'a str, CommandError> {
    value.as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(CommandError::MissingField { operation, field })
}
