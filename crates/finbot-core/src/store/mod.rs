//! Ledger store port + implementations.
//!
//! The store is a plain document store: users, their transactions, and the
//! audit log. What matters is the contract, in particular that
//! `add_transaction` applies the balance increment and the insert as one
//! atomic unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AuditEntry, Transaction, TransactionKind, UserAccount, UserId};
use crate::Result;

mod json;
mod memory;
mod state;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Half-open time range `[start, end)` in UTC.
pub type TimeRange = (DateTime<Utc>, DateTime<Utc>);

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch the user's account, creating it lazily on first contact
    /// (balance 0, no limit, no categories, reminders off).
    async fn user(&self, user: &UserId) -> Result<UserAccount>;

    /// Insert a transaction and apply its signed amount to the balance as
    /// one atomic unit; a crash between the two must not be observable.
    async fn add_transaction(
        &self,
        user: &UserId,
        kind: TransactionKind,
        amount: f64,
        category: &str,
        description: &str,
    ) -> Result<Transaction>;

    /// Direct balance override. Deliberately NOT logged as a transaction, so
    /// it breaks the balance/transaction-sum invariant.
    async fn set_balance(&self, user: &UserId, amount: f64) -> Result<()>;

    async fn set_spending_limit(&self, user: &UserId, amount: f64) -> Result<()>;

    /// Set-like insert; comparison is case-insensitive, the given spelling
    /// is stored.
    async fn add_category(&self, user: &UserId, name: &str) -> Result<()>;

    async fn set_reminder_mode(&self, user: &UserId, enabled: bool) -> Result<()>;

    /// Remove every transaction for the user and reset the balance to zero.
    async fn delete_all_transactions(&self, user: &UserId) -> Result<()>;

    /// Last `limit` transactions, newest first.
    async fn recent_transactions(&self, user: &UserId, limit: usize) -> Result<Vec<Transaction>>;

    async fn transactions_in(&self, user: &UserId, range: TimeRange) -> Result<Vec<Transaction>>;

    async fn expense_total_in(&self, user: &UserId, range: TimeRange) -> Result<f64>;

    /// Every user the store has ever seen (for the monthly report sweep).
    async fn user_ids(&self) -> Result<Vec<UserId>>;

    async fn append_audit(&self, entry: AuditEntry) -> Result<()>;
}
