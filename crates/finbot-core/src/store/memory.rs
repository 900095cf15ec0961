use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{AuditEntry, Transaction, TransactionKind, UserAccount, UserId};
use crate::Result;

use super::state::LedgerState;
use super::{LedgerStore, TimeRange};

/// In-memory store. Used by the test suites and handy for local development;
/// everything is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<LedgerState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: full audit log in append order.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().expect("store lock").audit.clone()
    }

    /// Test hook: every transaction for a user in insertion order.
    pub fn transactions_of(&self, user: &UserId) -> Vec<Transaction> {
        self.inner
            .lock()
            .expect("store lock")
            .transactions
            .iter()
            .filter(|t| &t.user == user)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn user(&self, user: &UserId) -> Result<UserAccount> {
        Ok(self.inner.lock().expect("store lock").account(user).clone())
    }

    async fn add_transaction(
        &self,
        user: &UserId,
        kind: TransactionKind,
        amount: f64,
        category: &str,
        description: &str,
    ) -> Result<Transaction> {
        Ok(self
            .inner
            .lock()
            .expect("store lock")
            .add_transaction(user, kind, amount, category, description))
    }

    async fn set_balance(&self, user: &UserId, amount: f64) -> Result<()> {
        self.inner.lock().expect("store lock").account(user).balance = amount;
        Ok(())
    }

    async fn set_spending_limit(&self, user: &UserId, amount: f64) -> Result<()> {
        self.inner
            .lock()
            .expect("store lock")
            .account(user)
            .spending_limit = Some(amount);
        Ok(())
    }

    async fn add_category(&self, user: &UserId, name: &str) -> Result<()> {
        self.inner.lock().expect("store lock").add_category(user, name);
        Ok(())
    }

    async fn set_reminder_mode(&self, user: &UserId, enabled: bool) -> Result<()> {
        self.inner
            .lock()
            .expect("store lock")
            .account(user)
            .reminder_mode = enabled;
        Ok(())
    }

    async fn delete_all_transactions(&self, user: &UserId) -> Result<()> {
        self.inner
            .lock()
            .expect("store lock")
            .delete_all_transactions(user);
        Ok(())
    }

    async fn recent_transactions(&self, user: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock")
            .recent_transactions(user, limit))
    }

    async fn transactions_in(&self, user: &UserId, range: TimeRange) -> Result<Vec<Transaction>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock")
            .transactions_in(user, range))
    }

    async fn expense_total_in(&self, user: &UserId, range: TimeRange) -> Result<f64> {
        Ok(self
            .inner
            .lock()
            .expect("store lock")
            .expense_total_in(user, range))
    }

    async fn user_ids(&self) -> Result<Vec<UserId>> {
        let mut ids: Vec<UserId> = self
            .inner
            .lock()
            .expect("store lock")
            .users
            .keys()
            .cloned()
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ids)
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        self.inner.lock().expect("store lock").audit.push(entry);
        Ok(())
    }
}
