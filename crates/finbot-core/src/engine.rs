use std::sync::Arc;

use chrono::Utc;

use crate::classifier::{CategoryResolution, IntentClassifier};
use crate::command::{resolve, Command, Resolution};
use crate::config::Config;
use crate::conversation::{Armed, Conversations, PendingAdd, PendingState};
use crate::domain::{AuditEntry, TransactionKind, UserId};
use crate::executor::{self, HELP_MESSAGE};
use crate::messaging::Messenger;
use crate::model::LanguageModel;
use crate::store::LedgerStore;
use crate::Result;

const OOPS: &str = "Ops, algo deu errado. Tenta de novo!";
const GREETINGS: &[&str] = &["olá", "bom dia", "boa tarde", "boa noite"];

const CLARIFY_PROMPT: &str = "Não tenho certeza se isso é uma receita ou uma despesa. \
     Por favor, esclareça respondendo 'receita' ou 'despesa'.";
const CLARIFY_REPROMPT: &str = "Por favor, responda com 'receita' ou 'despesa'.";
const CLARIFY_TIMEOUT: &str = "Tempo esgotado, não registrei a transação.";
const CONFIRM_DELETE: &str = "Tem certeza que deseja apagar todas as suas transações? \
     Isso não pode ser desfeito. Responda 'sim' para confirmar.";
const DELETE_CANCELLED: &str = "Ação cancelada.";
const DELETE_TIMEOUT: &str = "Ação cancelada por timeout.";
const APPROVAL_DECLINED: &str = "Ok, não adicionei a categoria.";
const APPROVAL_TIMEOUT: &str = "Tempo esgotado, não adicionei a categoria.";

/// The message-handling pipeline: pending-state routing, classification,
/// resolution, execution, reply and audit.
///
/// Cheap to clone; timeout tasks hold a clone so they can resolve pending
/// states after the handler returned.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    cfg: Arc<Config>,
    classifier: IntentClassifier,
    store: Arc<dyn LedgerStore>,
    conversations: Conversations,
}

impl Engine {
    pub fn new(
        cfg: Arc<Config>,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        let classifier = IntentClassifier::new(model, cfg.model_timeout);
        Self {
            inner: Arc::new(EngineInner {
                cfg,
                classifier,
                store,
                conversations: Conversations::default(),
            }),
        }
    }

    pub fn store(&self) -> Arc<dyn LedgerStore> {
        self.inner.store.clone()
    }

    /// Handle one inbound message: produce exactly one reply, then append an
    /// audit entry. Classification and store failures degrade to the apology
    /// reply; only transport failures propagate.
    pub async fn handle_message(
        &self,
        user: &UserId,
        text: &str,
        messenger: &Arc<dyn Messenger>,
    ) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let reply = match self.reply_for(user, text, messenger).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("handling failed for {user}: {e}");
                OOPS.to_string()
            }
        };

        let sent = messenger.send_text(user, &reply).await;

        let entry = AuditEntry {
            user: user.clone(),
            timestamp: Utc::now(),
            message: text.to_string(),
            response: reply,
        };
        if let Err(e) = self.inner.store.append_audit(entry).await {
            tracing::warn!("audit append failed for {user}: {e}");
        }

        sent
    }

    async fn reply_for(
        &self,
        user: &UserId,
        text: &str,
        messenger: &Arc<dyn Messenger>,
    ) -> Result<String> {
        if let Some(peeked) = self.inner.conversations.peek(user) {
            // An invalid clarification answer re-prompts without consuming
            // the entry, so the original timeout window keeps running.
            if matches!(peeked, PendingState::AwaitingClarification { .. })
                && !is_clarification_answer(text)
            {
                return Ok(CLARIFY_REPROMPT.to_string());
            }

            if let Some(state) = self.inner.conversations.take(user) {
                return self.finish_pending(user, text, state, messenger).await;
            }
            // The timeout fired between peek and take; fall through and treat
            // the message as a fresh one.
        }

        self.classified_reply(user, text, messenger).await
    }

    async fn classified_reply(
        &self,
        user: &UserId,
        text: &str,
        messenger: &Arc<dyn Messenger>,
    ) -> Result<String> {
        let analysis = match self.inner.classifier.classify(text).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("classification failed for {user}: {e}");
                return Ok(OOPS.to_string());
            }
        };

        match resolve(&analysis, &self.inner.cfg.ambiguous_terms) {
            Resolution::Ready(command) => {
                executor::execute(self.inner.store.as_ref(), &self.inner.cfg, user, command).await
            }
            Resolution::NeedsCategory {
                kind,
                description,
                amount,
            } => {
                self.start_add(user, kind, &description, amount, messenger)
                    .await
            }
            Resolution::Clarify {
                description,
                amount,
            } => {
                let armed = self.inner.conversations.begin(
                    user,
                    PendingState::AwaitingClarification {
                        description,
                        amount,
                    },
                );
                self.arm_timeout(armed, messenger.clone());
                Ok(CLARIFY_PROMPT.to_string())
            }
            Resolution::ConfirmDeleteAll => {
                let armed = self
                    .inner
                    .conversations
                    .begin(user, PendingState::AwaitingDeleteConfirmation);
                self.arm_timeout(armed, messenger.clone());
                Ok(CONFIRM_DELETE.to_string())
            }
            Resolution::Unknown => Ok(unknown_reply(text)),
        }
    }

    async fn finish_pending(
        &self,
        user: &UserId,
        text: &str,
        state: PendingState,
        messenger: &Arc<dyn Messenger>,
    ) -> Result<String> {
        match state {
            PendingState::AwaitingClarification {
                description,
                amount,
            } => {
                let kind = match text.to_lowercase().as_str() {
                    "receita" => TransactionKind::Income,
                    _ => TransactionKind::Expense,
                };
                self.start_add(user, kind, &description, amount, messenger)
                    .await
            }

            PendingState::AwaitingDeleteConfirmation => {
                if text.eq_ignore_ascii_case("sim") {
                    executor::execute(
                        self.inner.store.as_ref(),
                        &self.inner.cfg,
                        user,
                        Command::DeleteAll,
                    )
                    .await
                } else {
                    Ok(DELETE_CANCELLED.to_string())
                }
            }

            PendingState::AwaitingCategoryApproval { pending } => {
                if text.eq_ignore_ascii_case("sim") {
                    self.inner
                        .store
                        .add_category(user, &pending.suggested)
                        .await?;
                    self.record(user, pending.kind, &pending.description, pending.amount, &pending.suggested)
                        .await
                } else {
                    Ok(APPROVAL_DECLINED.to_string())
                }
            }
        }
    }

    /// Non-ambiguous add-flow: resolve the category, then either finish the
    /// transaction or park it on the approval state carrying its continuation.
    async fn start_add(
        &self,
        user: &UserId,
        kind: TransactionKind,
        description: &str,
        amount: f64,
        messenger: &Arc<dyn Messenger>,
    ) -> Result<String> {
        let account = self.inner.store.user(user).await?;
        let resolution = match self
            .inner
            .classifier
            .resolve_category(description, &account.categories)
            .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::warn!("category resolution failed for {user}: {e}");
                return Ok(OOPS.to_string());
            }
        };

        match resolution {
            CategoryResolution::Known(category) => {
                self.record(user, kind, description, amount, &category).await
            }
            CategoryResolution::Suggested(suggested) => {
                let prompt = format!(
                    "Não achei categoria pra \"{description}\". Sugiro \"{suggested}\". Tá ok? (sim/não)"
                );
                let armed = self.inner.conversations.begin(
                    user,
                    PendingState::AwaitingCategoryApproval {
                        pending: PendingAdd {
                            kind,
                            description: description.to_string(),
                            amount,
                            suggested,
                        },
                    },
                );
                self.arm_timeout(armed, messenger.clone());
                Ok(prompt)
            }
        }
    }

    async fn record(
        &self,
        user: &UserId,
        kind: TransactionKind,
        description: &str,
        amount: f64,
        category: &str,
    ) -> Result<String> {
        executor::execute(
            self.inner.store.as_ref(),
            &self.inner.cfg,
            user,
            Command::AddTransaction {
                kind,
                description: description.to_string(),
                amount,
                category: category.to_string(),
            },
        )
        .await
    }

    /// One timeout task per armed pending state. The token loses to a reply
    /// handler that consumed the entry; the generation check makes a timer
    /// that fires after the state moved on a no-op.
    fn arm_timeout(&self, armed: Armed, messenger: Arc<dyn Messenger>) {
        let engine = self.clone();
        let timeout = engine.inner.cfg.interaction_timeout;
        let cancel = armed.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    engine.handle_timeout(armed, messenger).await;
                }
            }
        });
    }

    async fn handle_timeout(&self, armed: Armed, messenger: Arc<dyn Messenger>) {
        let Some(state) = self.inner.conversations.take_if_current(&armed) else {
            return;
        };

        let notice = match state {
            PendingState::AwaitingDeleteConfirmation => DELETE_TIMEOUT,
            PendingState::AwaitingClarification { .. } => CLARIFY_TIMEOUT,
            PendingState::AwaitingCategoryApproval { .. } => APPROVAL_TIMEOUT,
        };
        if let Err(e) = messenger.send_text(&armed.user, notice).await {
            tracing::warn!("timeout notice failed for {}: {e}", armed.user);
        }
    }
}

fn is_clarification_answer(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered == "receita" || lowered == "despesa"
}

fn unknown_reply(text: &str) -> String {
    if GREETINGS.contains(&text.to_lowercase().as_str()) {
        format!("Olá! {HELP_MESSAGE}")
    } else {
        format!("Não entendi sua mensagem. {HELP_MESSAGE}")
    }
}
