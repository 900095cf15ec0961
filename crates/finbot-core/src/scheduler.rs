use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use crate::messaging::Messenger;
use crate::report;
use crate::store::LedgerStore;
use crate::Result;

/// Pushes every known user their monthly summary on the first day of each
/// month. The report covers the month that just ended.
pub struct MonthlyReportScheduler {
    store: Arc<dyn LedgerStore>,
    messenger: Arc<dyn Messenger>,
    cancel: CancellationToken,
}

impl MonthlyReportScheduler {
    pub fn new(store: Arc<dyn LedgerStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            store,
            messenger,
            cancel: CancellationToken::new(),
        }
    }

    pub fn start(&self) {
        let store = self.store.clone();
        let messenger = self.messenger.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(next) = next_month_start(now) else {
                    tracing::error!("no next month boundary after {now}; scheduler stopping");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or_default();
                tracing::info!("next monthly report sweep at {next}");

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {
                        if let Err(e) = dispatch_all(store.as_ref(), messenger.as_ref()).await {
                            tracing::error!("monthly report sweep failed: {e}");
                        }
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Send every user the report for the month that just ended. Per-user send
/// failures are logged and do not abort the sweep.
pub async fn dispatch_all(store: &dyn LedgerStore, messenger: &dyn Messenger) -> Result<()> {
    // Fired just past the month boundary, so yesterday is inside the month
    // being reported on.
    let report_at = Utc::now() - ChronoDuration::days(1);

    for user in store.user_ids().await? {
        let report = match report::monthly_report(store, &user, report_at).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("monthly report failed for {user}: {e}");
                continue;
            }
        };
        let text = format!("Resumo mensal:\n{report}");
        if let Err(e) = messenger.send_text(&user, &text).await {
            tracing::warn!("monthly report send failed for {user}: {e}");
        }
    }

    Ok(())
}

/// First instant of the month after `now`, in UTC.
fn next_month_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}
