use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{AuditEntry, Transaction, TransactionKind, UserAccount, UserId};

use super::TimeRange;

/// The whole store as one document. Both backends mutate it through the same
/// methods; the JSON backend additionally snapshots it to disk after every
/// mutation, which is what makes the balance increment + insert atomic from
/// the outside.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerState {
    pub users: HashMap<UserId, UserAccount>,
    pub transactions: Vec<Transaction>,
    pub audit: Vec<AuditEntry>,
    pub next_tx_id: u64,
}

impl LedgerState {
    pub fn account(&mut self, user: &UserId) -> &mut UserAccount {
        self.users.entry(user.clone()).or_default()
    }

    pub fn add_transaction(
        &mut self,
        user: &UserId,
        kind: TransactionKind,
        amount: f64,
        category: &str,
        description: &str,
    ) -> Transaction {
        self.next_tx_id += 1;
        let tx = Transaction {
            id: self.next_tx_id,
            user: user.clone(),
            date: Utc::now(),
            kind,
            amount,
            category: category.to_string(),
            description: description.to_string(),
            fixed_expense_id: None,
        };
        self.account(user).balance += kind.signed(amount);
        self.transactions.push(tx.clone());
        tx
    }

    pub fn add_category(&mut self, user: &UserId, name: &str) {
        let account = self.account(user);
        let lowered = name.to_lowercase();
        let exists = account
            .categories
            .iter()
            .any(|c| c.to_lowercase() == lowered);
        if !exists {
            account.categories.push(name.to_string());
        }
    }

    pub fn delete_all_transactions(&mut self, user: &UserId) {
        self.transactions.retain(|t| &t.user != user);
        self.account(user).balance = 0.0;
    }

    pub fn recent_transactions(&self, user: &UserId, limit: usize) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| &t.user == user)
            .cloned()
            .collect();
        // Newest first; id breaks ties for transactions in the same instant.
        txs.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        txs.truncate(limit);
        txs
    }

    pub fn transactions_in(&self, user: &UserId, range: TimeRange) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| &t.user == user && t.date >= range.0 && t.date < range.1)
            .cloned()
            .collect()
    }

    pub fn expense_total_in(&self, user: &UserId, range: TimeRange) -> f64 {
        self.transactions_in(user, range)
            .iter()
            .filter(|t| t.kind == TransactionKind::Expense)
            .map(|t| t.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId("u1".to_string())
    }

    #[test]
    fn lazy_account_starts_empty() {
        let mut state = LedgerState::default();
        let account = state.account(&user());
        assert_eq!(account.balance, 0.0);
        assert_eq!(account.spending_limit, None);
        assert!(account.categories.is_empty());
        assert!(!account.reminder_mode);
    }

    #[test]
    fn balance_tracks_signed_transaction_sum() {
        let mut state = LedgerState::default();
        state.add_transaction(&user(), TransactionKind::Income, 100.0, "salário", "salário");
        state.add_transaction(&user(), TransactionKind::Expense, 30.0, "comida", "almoço");
        state.add_transaction(&user(), TransactionKind::Expense, 20.0, "roupas", "camisa");

        let signed: f64 = state
            .transactions
            .iter()
            .map(|t| t.kind.signed(t.amount))
            .sum();
        assert_eq!(state.account(&user()).balance, signed);
        assert_eq!(signed, 50.0);
    }

    #[test]
    fn transaction_ids_are_sequential_and_recorded() {
        let mut state = LedgerState::default();
        let a = state.add_transaction(&user(), TransactionKind::Expense, 1.0, "c", "a");
        let b = state.add_transaction(&user(), TransactionKind::Expense, 2.0, "c", "b");
        assert_eq!(a.id + 1, b.id);
        assert!(a.fixed_expense_id.is_none());
    }

    #[test]
    fn category_insert_dedupes_case_insensitively() {
        let mut state = LedgerState::default();
        state.add_category(&user(), "Roupas");
        state.add_category(&user(), "roupas");
        state.add_category(&user(), "ROUPAS");
        assert_eq!(state.account(&user()).categories, vec!["Roupas".to_string()]);
    }

    #[test]
    fn delete_all_clears_transactions_and_balance_for_one_user() {
        let mut state = LedgerState::default();
        let other = UserId("u2".to_string());
        state.add_transaction(&user(), TransactionKind::Income, 10.0, "c", "a");
        state.add_transaction(&other, TransactionKind::Income, 99.0, "c", "b");

        state.delete_all_transactions(&user());

        assert_eq!(state.account(&user()).balance, 0.0);
        assert!(state.transactions_in(&user(), range_all()).is_empty());
        assert_eq!(state.account(&other).balance, 99.0);
        assert_eq!(state.transactions_in(&other, range_all()).len(), 1);
    }

    #[test]
    fn recent_returns_at_most_limit_newest_first() {
        let mut state = LedgerState::default();
        for i in 0..4 {
            state.add_transaction(&user(), TransactionKind::Expense, i as f64 + 1.0, "c", "d");
        }

        let recent = state.recent_transactions(&user(), 10);
        assert_eq!(recent.len(), 4, "fewer records than the limit come back as-is");
        assert!(recent.windows(2).all(|w| w[0].id > w[1].id));

        let capped = state.recent_transactions(&user(), 2);
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].id, 4);
    }

    fn range_all() -> TimeRange {
        (
            chrono::DateTime::<Utc>::MIN_UTC,
            chrono::DateTime::<Utc>::MAX_UTC,
        )
    }
}
