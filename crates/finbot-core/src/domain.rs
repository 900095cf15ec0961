use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque channel address of a user (Telegram chat id, phone JID, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Signed contribution of an amount of this kind to the balance.
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        }
    }

    pub fn label_pt(self) -> &'static str {
        match self {
            TransactionKind::Income => "Receita",
            TransactionKind::Expense => "Gasto",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub user: UserId,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub amount: f64,
    pub category: String,
    pub description: String,
    /// Reserved for recurring-expense linkage; never set by the current flows.
    pub fixed_expense_id: Option<u64>,
}

/// Per-user account settings and running balance.
///
/// Created lazily on first contact; never deleted. `set_balance` overrides
/// the balance directly, so balance and transaction sum may diverge after a
/// manual override.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserAccount {
    pub balance: f64,
    pub spending_limit: Option<f64>,
    pub categories: Vec<String>,
    pub reminder_mode: bool,
}

/// One fully handled inbound message and the reply it produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub user: UserId,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub response: String,
}
