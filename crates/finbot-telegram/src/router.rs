use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::sync::{Mutex, OwnedMutexGuard};

use finbot_core::{
    config::Config, domain::UserId, engine::Engine, messaging::Messenger,
    scheduler::MonthlyReportScheduler,
};

use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub engine: Engine,
    pub messenger: Arc<dyn Messenger>,
    pub chat_locks: Arc<ChatLocks>,
}

/// Sequentializes message handling per chat so a user's pending-state
/// transitions never interleave with their own next message. Chats never
/// block each other.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>, engine: Engine) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!("finbot started: @{}", me.username());
    }

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));

    let scheduler = MonthlyReportScheduler::new(engine.store(), messenger.clone());
    scheduler.start();

    let state = Arc::new(AppState {
        cfg,
        engine,
        messenger,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Only plain text from real users. Telegram never delivers the bot's own
    // outgoing messages, but channel posts and service updates arrive without
    // a sender, and other bots are not conversation partners.
    let Some(from) = msg.from() else {
        return Ok(());
    };
    if from.is_bot {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    let user = UserId(msg.chat.id.0.to_string());

    let _guard = state.chat_locks.lock_chat(msg.chat.id.0).await;
    if let Err(e) = state.engine.handle_message(&user, text, &state.messenger).await {
        tracing::warn!("reply delivery failed for {user}: {e}");
        let _ = bot
            .send_message(msg.chat.id, "Ops, algo deu errado. Tenta de novo!")
            .await;
    }

    Ok(())
}
