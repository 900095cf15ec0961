use async_trait::async_trait;

use crate::Result;

/// Language-model port: best-effort text completion for a prompt.
///
/// Implementations bound their own request time; the classifier additionally
/// wraps every call in its own timeout so a slow backend can never stall a
/// conversation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
