//! Telegram adapter (teloxide).
//!
//! This crate implements the `finbot-core` Messenger port over the Telegram
//! Bot API and owns the polling router.

use async_trait::async_trait;

use teloxide::prelude::*;
use tokio::time::sleep;

pub mod router;

use finbot_core::{domain::UserId, errors::Error, messaging::Messenger, Result};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(user: &UserId) -> Result<teloxide::types::ChatId> {
        let id = user
            .0
            .parse::<i64>()
            .map_err(|_| Error::Transport(format!("not a telegram chat id: {user}")))?;
        Ok(teloxide::types::ChatId(id))
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, user: &UserId, text: &str) -> Result<()> {
        let chat = Self::tg_chat(user)?;

        // One retry on flood control; anything else surfaces immediately.
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match self.bot.send_message(chat, text.to_string()).await {
                Ok(_) => return Ok(()),
                Err(teloxide::RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    sleep(d).await;
                }
                Err(e) => return Err(Error::Transport(format!("telegram error: {e}"))),
            }
        }
    }
}
