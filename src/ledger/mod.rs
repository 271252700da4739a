mod ledger_store;

use rust_decimal::Decimal;

use crate::models::Transaction;
use crate::types::AccountId;

pub use ledger_store::LedgerStore;

/// Where a transfer sends its funds.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferTarget {
    /// Another account of the same user; credited in the same operation.
    Internal(AccountId),
    /// An account outside this ledger; only the source is debited.
    External {
        account_number: String,
        recipient_name: String
    }
}

/// The entries booked by a transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub debit: Transaction,
    /// Present for internal transfers only.
    pub credit: Option<Transaction>
}

/// Stored balance against the signed sum of the account's ledger entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciliation {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub ledger_total: Decimal
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.balance == self.ledger_total
    }
}
