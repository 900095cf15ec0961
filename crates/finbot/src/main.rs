use std::sync::Arc;

use finbot_core::{config::Config, engine::Engine, store::JsonStore};
use finbot_gemini::GeminiClient;

#[tokio::main]
async fn main() -> Result<(), finbot_core::Error> {
    finbot_core::logging::init("finbot")?;

    let cfg = Arc::new(Config::load()?);

    let model = Arc::new(GeminiClient::new(
        cfg.gemini_api_key.clone(),
        cfg.gemini_model.clone(),
        cfg.model_timeout,
    ));
    let store = Arc::new(JsonStore::open(&cfg.store_path)?);
    let engine = Engine::new(cfg.clone(), model, store);

    finbot_telegram::router::run_polling(cfg, engine)
        .await
        .map_err(|e| finbot_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
