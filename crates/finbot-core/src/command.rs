use crate::classifier::{Classification, Intent};
use crate::domain::TransactionKind;

/// A fully resolved, executable command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    AddTransaction {
        kind: TransactionKind,
        description: String,
        amount: f64,
        category: String,
    },
    SetBalance { amount: f64 },
    SetLimit { amount: f64 },
    Report,
    Help,
    ShowBalance,
    ListTransactions,
    /// Only reachable through the confirmation flow; the resolver never
    /// emits it directly.
    DeleteAll,
    AddCategory { name: String },
    ListCategories,
    EnableReminder,
    DisableReminder,
}

/// Outcome of mapping a classification onto the command set.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Ready to execute with no further input.
    Ready(Command),
    /// Add-flow with both slots present that still needs a category decision.
    NeedsCategory {
        kind: TransactionKind,
        description: String,
        amount: f64,
    },
    /// Ambiguous between income and expense; ask the user first.
    Clarify { description: String, amount: f64 },
    /// Destructive action; ask for confirmation first.
    ConfirmDeleteAll,
    /// Missing slots or unclassifiable input.
    Unknown,
}

/// Pure mapping from classifier output to a resolution.
///
/// The ambiguity check runs before any category concern: an ambiguous
/// description never reaches category resolution, regardless of its amount.
pub fn resolve(analysis: &Classification, ambiguous_terms: &[String]) -> Resolution {
    match analysis.intent {
        Intent::AddExpense => resolve_add(analysis, TransactionKind::Expense, ambiguous_terms),
        Intent::AddIncome => resolve_add(analysis, TransactionKind::Income, ambiguous_terms),
        Intent::SetBalance => match analysis.amount {
            Some(amount) => Resolution::Ready(Command::SetBalance { amount }),
            None => Resolution::Unknown,
        },
        Intent::SetLimit => match analysis.amount {
            Some(amount) => Resolution::Ready(Command::SetLimit { amount }),
            None => Resolution::Unknown,
        },
        Intent::Report => Resolution::Ready(Command::Report),
        Intent::Help => Resolution::Ready(Command::Help),
        Intent::ShowBalance => Resolution::Ready(Command::ShowBalance),
        Intent::ListTransactions => Resolution::Ready(Command::ListTransactions),
        Intent::DeleteAll => Resolution::ConfirmDeleteAll,
        Intent::AddCategory => match &analysis.category_name {
            Some(name) => Resolution::Ready(Command::AddCategory { name: name.clone() }),
            None => Resolution::Unknown,
        },
        Intent::ListCategories => Resolution::Ready(Command::ListCategories),
        Intent::EnableReminder => Resolution::Ready(Command::EnableReminder),
        Intent::DisableReminder => Resolution::Ready(Command::DisableReminder),
        Intent::Uncertain => Resolution::Unknown,
    }
}

fn resolve_add(
    analysis: &Classification,
    kind: TransactionKind,
    ambiguous_terms: &[String],
) -> Resolution {
    let (Some(description), Some(amount)) = (&analysis.description, analysis.amount) else {
        return Resolution::Unknown;
    };

    if is_ambiguous(description, ambiguous_terms) {
        return Resolution::Clarify {
            description: description.clone(),
            amount,
        };
    }

    Resolution::NeedsCategory {
        kind,
        description: description.clone(),
        amount,
    }
}

fn is_ambiguous(description: &str, terms: &[String]) -> bool {
    let lowered = description.to_lowercase();
    terms.iter().any(|t| lowered.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> Vec<String> {
        vec!["transferência".to_string()]
    }

    fn classification(intent: Intent) -> Classification {
        Classification {
            intent,
            description: None,
            amount: None,
            category_name: None,
        }
    }

    #[test]
    fn expense_with_both_slots_needs_category() {
        let analysis = Classification {
            description: Some("camisa".to_string()),
            amount: Some(20.0),
            ..classification(Intent::AddExpense)
        };
        assert_eq!(
            resolve(&analysis, &terms()),
            Resolution::NeedsCategory {
                kind: TransactionKind::Expense,
                description: "camisa".to_string(),
                amount: 20.0,
            }
        );
    }

    #[test]
    fn missing_slot_yields_unknown() {
        let no_amount = Classification {
            description: Some("camisa".to_string()),
            ..classification(Intent::AddExpense)
        };
        let no_description = Classification {
            amount: Some(20.0),
            ..classification(Intent::AddIncome)
        };
        assert_eq!(resolve(&no_amount, &terms()), Resolution::Unknown);
        assert_eq!(resolve(&no_description, &terms()), Resolution::Unknown);
    }

    #[test]
    fn ambiguous_description_always_clarifies() {
        for (intent, amount) in [
            (Intent::AddExpense, 50.0),
            (Intent::AddIncome, 50.0),
            (Intent::AddExpense, 0.01),
            (Intent::AddIncome, 99999.0),
        ] {
            let analysis = Classification {
                description: Some("Transferência pro João".to_string()),
                amount: Some(amount),
                ..classification(intent)
            };
            assert_eq!(
                resolve(&analysis, &terms()),
                Resolution::Clarify {
                    description: "Transferência pro João".to_string(),
                    amount,
                },
                "{intent:?} with amount {amount} must clarify, never add directly"
            );
        }
    }

    #[test]
    fn set_commands_require_amount() {
        assert_eq!(
            resolve(&classification(Intent::SetBalance), &terms()),
            Resolution::Unknown
        );
        let with_amount = Classification {
            amount: Some(1000.0),
            ..classification(Intent::SetBalance)
        };
        assert_eq!(
            resolve(&with_amount, &terms()),
            Resolution::Ready(Command::SetBalance { amount: 1000.0 })
        );
    }

    #[test]
    fn add_category_requires_name() {
        assert_eq!(
            resolve(&classification(Intent::AddCategory), &terms()),
            Resolution::Unknown
        );
        let with_name = Classification {
            category_name: Some("transporte".to_string()),
            ..classification(Intent::AddCategory)
        };
        assert_eq!(
            resolve(&with_name, &terms()),
            Resolution::Ready(Command::AddCategory {
                name: "transporte".to_string()
            })
        );
    }

    #[test]
    fn slotless_intents_map_one_to_one() {
        let cases = [
            (Intent::Report, Command::Report),
            (Intent::Help, Command::Help),
            (Intent::ShowBalance, Command::ShowBalance),
            (Intent::ListTransactions, Command::ListTransactions),
            (Intent::ListCategories, Command::ListCategories),
            (Intent::EnableReminder, Command::EnableReminder),
            (Intent::DisableReminder, Command::DisableReminder),
        ];
        for (intent, command) in cases {
            assert_eq!(
                resolve(&classification(intent), &terms()),
                Resolution::Ready(command)
            );
        }
    }

    #[test]
    fn delete_all_demands_confirmation() {
        assert_eq!(
            resolve(&classification(Intent::DeleteAll), &terms()),
            Resolution::ConfirmDeleteAll
        );
    }

    #[test]
    fn uncertain_maps_to_unknown() {
        assert_eq!(
            resolve(&classification(Intent::Uncertain), &terms()),
            Resolution::Unknown
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let analysis = Classification {
            description: Some("camisa".to_string()),
            amount: Some(20.0),
            ..classification(Intent::AddExpense)
        };
        assert_eq!(resolve(&analysis, &terms()), resolve(&analysis, &terms()));
    }
}
