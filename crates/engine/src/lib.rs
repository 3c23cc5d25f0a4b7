//! Ledger engine for shared group expenses.
//!
//! The [`Engine`] owns the database connection and exposes the ledger store
//! (members, admins, balances, expenses, categories, currency settings) and
//! the balance operations that keep a group's balances summing to zero.

pub use admins::Admin;
pub use balances::Balance;
pub use currency::{CurrencyCode, CurrencySetting};
pub use error::EngineError;
pub use expense_shares::Share;
pub use expenses::{Expense, NewExpense};
pub use money::Money;
pub use ops::{
    AdminRemoval, CurrencyChange, Engine, EngineBuilder, ExportRow, SpendingReport,
    SpendingScope, UNCATEGORIZED,
};

mod admins;
mod balances;
mod categories;
mod currency;
mod currency_settings;
mod error;
mod expense_shares;
mod expenses;
mod groups;
mod members;
mod money;
mod ops;

type ResultEngine<T> = Result<T, EngineError>;
