use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::AccountType;
use crate::types::deserialize_amount;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Register,
    Login,
    Logout,
    Open,
    Select,
    Deposit,
    Withdraw,
    Transfer,
    Password,
    Profile,
    Status,
    History,
    Users
}

/// One row of a banking script.
///
/// Header: `op,email,password,name,account,amount,target,description,remember`.
/// Columns an operation does not use are left empty. `account` picks the
/// user's first account of that type before the operation runs. For transfers
/// `target` is either an account type of the same user (internal) or an outside
/// account number, with `name` naming the recipient. `password` uses `target`
/// for the new password and `status` uses it for `active` / `inactive`.
/// `history` logs the recent entries of the active account and `users` logs
/// the admin user search for the query in `target`.
#[derive(Debug, Clone, Deserialize)]
pub struct Command {
    pub op: Operation,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account: Option<AccountType>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remember: Option<bool>
}
