//! Gemini adapter (language model).
//!
//! Implements the `finbot-core` LanguageModel port over the Google
//! `generateContent` HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;

use finbot_core::{errors::Error, model::LanguageModel, Result};

#[derive(Clone, Debug)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client build");
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Model(format!("gemini request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "gemini call failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Model(format!("gemini json error: {e}")))?;

        let text = extract_text(&v)
            .ok_or_else(|| Error::Model("gemini returned no text candidate".to_string()))?;

        if text.trim().is_empty() {
            return Err(Error::Model("gemini returned empty text".to_string()));
        }

        Ok(text.trim().to_string())
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(v: &serde_json::Value) -> Option<String> {
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<String>();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
