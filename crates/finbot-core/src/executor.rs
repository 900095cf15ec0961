use chrono::Utc;

use crate::command::Command;
use crate::config::Config;
use crate::domain::{TransactionKind, UserId};
use crate::report;
use crate::store::LedgerStore;
use crate::Result;

pub const HELP_MESSAGE: &str = "\
Aqui estão algumas coisas que você pode fazer:
- Adicionar uma despesa: 'camisa 20'
- Adicionar uma receita: 'salário 1850'
- Ver seu saldo: 'mostrar saldo'
- Ver últimas transações: 'listar transações'
- Apagar todas as transações: 'apagar tudo'
- Gerar um relatório: 'relatório do mês'
- Adicionar uma categoria: 'adicionar categoria transporte'
- Listar categorias: 'listar categorias'
- Ativar modo lembrete: 'ativar modo lembrete'
- Desativar modo lembrete: 'desativar modo lembrete'
Se precisar de mais ajuda, diga 'ajuda'.";

/// Apply one resolved command against the store and render its reply.
///
/// Exactly one store mutation per mutating command; read-only commands touch
/// nothing.
pub async fn execute(
    store: &dyn LedgerStore,
    cfg: &Config,
    user: &UserId,
    command: Command,
) -> Result<String> {
    match command {
        Command::AddTransaction {
            kind,
            description,
            amount,
            category,
        } => add_transaction(store, user, kind, &description, amount, &category).await,

        Command::SetBalance { amount } => {
            store.set_balance(user, amount).await?;
            Ok(format!("Saldo ajustado pra {amount:.2}."))
        }

        Command::SetLimit { amount } => {
            store.set_spending_limit(user, amount).await?;
            Ok(format!("Limite de gastos definido em {amount:.2}."))
        }

        Command::Report => report::monthly_report(store, user, Utc::now()).await,

        Command::Help => Ok(HELP_MESSAGE.to_string()),

        Command::ShowBalance => {
            let account = store.user(user).await?;
            Ok(format!("Seu saldo atual é: {:.2}", account.balance))
        }

        Command::ListTransactions => list_transactions(store, cfg, user).await,

        Command::DeleteAll => {
            store.delete_all_transactions(user).await?;
            Ok("Todas as transações foram apagadas.".to_string())
        }

        Command::AddCategory { name } => {
            let account = store.user(user).await?;
            let lowered = name.to_lowercase();
            if account.categories.iter().any(|c| c.to_lowercase() == lowered) {
                return Ok("Essa categoria já existe.".to_string());
            }
            store.add_category(user, &name).await?;
            Ok(format!("Categoria '{name}' adicionada!"))
        }

        Command::ListCategories => {
            let account = store.user(user).await?;
            if account.categories.is_empty() {
                Ok("Você não tem nenhuma categoria ainda.".to_string())
            } else {
                Ok(format!(
                    "Suas categorias são: {}",
                    account.categories.join(", ")
                ))
            }
        }

        Command::EnableReminder => {
            store.set_reminder_mode(user, true).await?;
            Ok("Modo lembrete ativado. Vou te avisar quanto você ainda pode gastar após cada despesa.".to_string())
        }

        Command::DisableReminder => {
            store.set_reminder_mode(user, false).await?;
            Ok("Modo lembrete desativado.".to_string())
        }
    }
}

async fn add_transaction(
    store: &dyn LedgerStore,
    user: &UserId,
    kind: TransactionKind,
    description: &str,
    amount: f64,
    category: &str,
) -> Result<String> {
    let tx = store
        .add_transaction(user, kind, amount, category, description)
        .await?;

    let mut reply = match kind {
        TransactionKind::Income => format!(
            "Receita de {amount:.2} em {category} - {description} (ID: {}) adicionada!",
            tx.id
        ),
        TransactionKind::Expense => format!(
            "Beleza, adicionei {amount:.2} em {category} - {description} (ID: {})",
            tx.id
        ),
    };

    if kind == TransactionKind::Expense {
        let account = store.user(user).await?;
        let month = report::month_window(Utc::now());
        let total_expenses = store.expense_total_in(user, month).await?;

        if let Some(limit) = account.spending_limit {
            if total_expenses > limit {
                reply.push_str("\nVocê passou do limite! 👎");
            } else {
                reply.push_str(&format!(
                    "\nAinda te sobra {:.2} pra gastar esse mês.",
                    limit - total_expenses
                ));
            }
        }

        if account.reminder_mode {
            reply.push_str(&format!(
                "\nCom base no seu saldo, você ainda pode gastar {:.2}.",
                account.balance
            ));
            if account.balance < 0.0 {
                reply.push_str(&format!(
                    " Seu saldo está negativo em {:.2}.",
                    account.balance.abs()
                ));
            }
        }
    }

    Ok(reply)
}

async fn list_transactions(
    store: &dyn LedgerStore,
    cfg: &Config,
    user: &UserId,
) -> Result<String> {
    let transactions = store.recent_transactions(user, cfg.list_limit).await?;
    if transactions.is_empty() {
        return Ok("Nenhuma transação por aqui.".to_string());
    }

    let mut out = format!("Últimas {} transações:\n", cfg.list_limit);
    for tx in &transactions {
        out.push_str(&format!(
            "- {} | {}: {:.2} em {} - {} (ID: {})\n",
            tx.date.format("%d/%m/%Y %H:%M"),
            tx.kind.label_pt(),
            tx.amount,
            tx.category,
            tx.description,
            tx.id
        ));
    }
    Ok(out)
}
