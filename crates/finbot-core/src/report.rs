use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::domain::{TransactionKind, UserId};
use crate::store::{LedgerStore, TimeRange};
use crate::Result;

/// Calendar month containing `at`, as a half-open `[start, next_month)` range
/// in UTC.
pub fn month_window(at: DateTime<Utc>) -> TimeRange {
    let start = first_of_month(at.year(), at.month());
    let end = if at.month() == 12 {
        first_of_month(at.year() + 1, 1)
    } else {
        first_of_month(at.year(), at.month() + 1)
    };
    (start, end)
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first of month is a valid instant")
}

pub fn month_name_pt(month: u32) -> &'static str {
    match month {
        1 => "janeiro",
        2 => "fevereiro",
        3 => "março",
        4 => "abril",
        5 => "maio",
        6 => "junho",
        7 => "julho",
        8 => "agosto",
        9 => "setembro",
        10 => "outubro",
        11 => "novembro",
        _ => "dezembro",
    }
}

/// Render the per-category report for the calendar month containing `at`.
pub async fn monthly_report(
    store: &dyn LedgerStore,
    user: &UserId,
    at: DateTime<Utc>,
) -> Result<String> {
    let window = month_window(at);
    let transactions = store.transactions_in(user, window).await?;

    let mut by_category: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    for tx in &transactions {
        let entry = by_category.entry(tx.category.clone()).or_default();
        match tx.kind {
            TransactionKind::Income => {
                entry.0 += tx.amount;
                total_income += tx.amount;
            }
            TransactionKind::Expense => {
                entry.1 += tx.amount;
                total_expense += tx.amount;
            }
        }
    }

    let mut out = format!(
        "📊 Relatório de {} {}\n",
        month_name_pt(at.month()),
        at.year()
    );
    out.push_str(&format!("💰 Receitas: {total_income:.2}\n"));
    out.push_str(&format!("💸 Despesas: {total_expense:.2}\n"));
    out.push_str(&format!("📈 Saldo: {:.2}\n\n", total_income - total_expense));
    out.push_str("Por categoria:\n");
    for (category, (income, expense)) in &by_category {
        out.push_str(&format!("- {category}: 💰 {income:.2} | 💸 {expense:.2}\n"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn user() -> UserId {
        UserId("u1".to_string())
    }

    #[test]
    fn month_window_is_half_open_and_wraps_december() {
        let at = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        let (start, end) = month_window(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap());

        let dec = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let (_, end) = month_window(dec);
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn report_aggregates_by_category_with_totals() {
        let store = MemoryStore::new();
        store
            .add_transaction(&user(), TransactionKind::Income, 1850.0, "salário", "salário")
            .await
            .unwrap();
        store
            .add_transaction(&user(), TransactionKind::Expense, 30.0, "comida", "almoço")
            .await
            .unwrap();
        store
            .add_transaction(&user(), TransactionKind::Expense, 20.0, "comida", "jantar")
            .await
            .unwrap();

        let now = Utc::now();
        let report = monthly_report(&store, &user(), now).await.unwrap();

        assert!(report.contains(&format!(
            "Relatório de {} {}",
            month_name_pt(now.month()),
            now.year()
        )));
        assert!(report.contains("💰 Receitas: 1850.00"));
        assert!(report.contains("💸 Despesas: 50.00"));
        assert!(report.contains("📈 Saldo: 1800.00"));
        assert!(report.contains("- comida: 💰 0.00 | 💸 50.00"));
        assert!(report.contains("- salário: 💰 1850.00 | 💸 0.00"));
    }

    #[tokio::test]
    async fn report_only_covers_the_requested_month() {
        let store = MemoryStore::new();
        store
            .add_transaction(&user(), TransactionKind::Expense, 10.0, "comida", "hoje")
            .await
            .unwrap();

        // A month with no transactions renders zeroed totals.
        let last_year = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let report = monthly_report(&store, &user(), last_year).await.unwrap();
        assert!(report.contains("💸 Despesas: 0.00"));
        assert!(!report.contains("comida:"));
    }
}
