use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,

    // Store
    pub store_path: PathBuf,

    // Timeouts
    /// Bound on a single language-model call, separate from the
    /// pending-interaction timeout.
    pub model_timeout: Duration,
    /// How long a pending interaction (clarification, delete confirmation,
    /// category approval) waits for a reply before resolving itself.
    pub interaction_timeout: Duration,

    // Behavior
    pub list_limit: usize,
    /// Lowercased terms that make an add-flow description ambiguous between
    /// income and expense.
    pub ambiguous_terms: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let gemini_api_key = env_str("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.trim().is_empty() {
            return Err(Error::Config(
                "GEMINI_API_KEY environment variable is required".to_string(),
            ));
        }

        let gemini_model = env_str("GEMINI_MODEL")
            .and_then(non_empty)
            .unwrap_or_else(|| "gemini-2.0-flash".to_string());

        let store_path =
            env_path("STORE_PATH").unwrap_or_else(|| PathBuf::from("finbot-store.json"));

        let model_timeout = Duration::from_millis(env_u64("MODEL_TIMEOUT_MS").unwrap_or(15_000));
        let interaction_timeout =
            Duration::from_secs(env_u64("INTERACTION_TIMEOUT_SECS").unwrap_or(60));

        let list_limit = env_usize("LIST_LIMIT").unwrap_or(10);
        let ambiguous_terms = parse_csv_lower(
            env_str("AMBIGUOUS_TERMS").or_else(|| Some("transferência".to_string())),
        );

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            gemini_model,
            store_path,
            model_timeout,
            interaction_timeout,
            list_limit,
            ambiguous_terms,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn parse_csv_lower(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_terms_are_lowercased_and_trimmed() {
        let terms = parse_csv_lower(Some("Transferência, PIX ,".to_string()));
        assert_eq!(terms, vec!["transferência".to_string(), "pix".to_string()]);
    }

    #[test]
    fn empty_csv_yields_no_terms() {
        assert!(parse_csv_lower(None).is_empty());
        assert!(parse_csv_lower(Some("  ".to_string())).is_empty());
    }
}
