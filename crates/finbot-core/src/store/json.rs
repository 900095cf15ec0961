use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{AuditEntry, Transaction, TransactionKind, UserAccount, UserId};
use crate::{errors::Error, Result};

use super::state::LedgerState;
use super::{LedgerStore, TimeRange};

/// Single-document JSON store.
///
/// The whole ledger is kept in memory and snapshotted to disk after every
/// mutation with a temp-file + rename write, so a crash mid-write leaves the
/// previous consistent document in place and balance can never diverge from
/// the transaction log.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    inner: Mutex<LedgerState>,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let txt = fs::read_to_string(&path)?;
            if txt.trim().is_empty() {
                LedgerState::default()
            } else {
                serde_json::from_str(&txt)
                    .map_err(|e| Error::Store(format!("corrupt store file {}: {e}", path.display())))?
            }
        } else {
            LedgerState::default()
        };

        Ok(Self {
            path,
            inner: Mutex::new(state),
        })
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut LedgerState) -> T) -> Result<T> {
        let mut state = self.inner.lock().expect("store lock");
        let out = f(&mut state);
        write_atomic(&self.path, &state)?;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerState) -> T) -> T {
        let state = self.inner.lock().expect("store lock");
        f(&state)
    }
}

fn write_atomic(path: &Path, state: &LedgerState) -> Result<()> {
    let data = serde_json::to_string(state)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl LedgerStore for JsonStore {
    async fn user(&self, user: &UserId) -> Result<UserAccount> {
        // Lazy creation is a mutation the first time a user shows up.
        if let Some(account) = self.read(|s| s.users.get(user).cloned()) {
            return Ok(account);
        }
        self.mutate(|s| s.account(user).clone())
    }

    async fn add_transaction(
        &self,
        user: &UserId,
        kind: TransactionKind,
        amount: f64,
        category: &str,
        description: &str,
    ) -> Result<Transaction> {
        self.mutate(|s| s.add_transaction(user, kind, amount, category, description))
    }

    async fn set_balance(&self, user: &UserId, amount: f64) -> Result<()> {
        self.mutate(|s| s.account(user).balance = amount)
    }

    async fn set_spending_limit(&self, user: &UserId, amount: f64) -> Result<()> {
        self.mutate(|s| s.account(user).spending_limit = Some(amount))
    }

    async fn add_category(&self, user: &UserId, name: &str) -> Result<()> {
        self.mutate(|s| s.add_category(user, name))
    }

    async fn set_reminder_mode(&self, user: &UserId, enabled: bool) -> Result<()> {
        self.mutate(|s| s.account(user).reminder_mode = enabled)
    }

    async fn delete_all_transactions(&self, user: &UserId) -> Result<()> {
        self.mutate(|s| s.delete_all_transactions(user))
    }

    async fn recent_transactions(&self, user: &UserId, limit: usize) -> Result<Vec<Transaction>> {
        Ok(self.read(|s| s.recent_transactions(user, limit)))
    }

    async fn transactions_in(&self, user: &UserId, range: TimeRange) -> Result<Vec<Transaction>> {
        Ok(self.read(|s| s.transactions_in(user, range)))
    }

    async fn expense_total_in(&self, user: &UserId, range: TimeRange) -> Result<f64> {
        Ok(self.read(|s| s.expense_total_in(user, range)))
    }

    async fn user_ids(&self) -> Result<Vec<UserId>> {
        let mut ids: Vec<UserId> = self.read(|s| s.users.keys().cloned().collect());
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ids)
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        self.mutate(|s| s.audit.push(entry))
    }
}
