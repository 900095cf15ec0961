use async_trait::async_trait;

use crate::{domain::UserId, Result};

/// Transport port: deliver a text reply to a user.
///
/// Telegram is the first implementation; the shape is deliberately minimal so
/// other channels (WhatsApp, Slack) can fit behind the same interface. The
/// engine receives the messenger explicitly per call instead of reaching for
/// a process-wide client.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, user: &UserId, text: &str) -> Result<()>;
}
