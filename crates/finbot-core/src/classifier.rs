use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::{errors::Error, model::LanguageModel, Result};

/// Persona line prefixed to every prompt sent to the model.
const PERSONA: &str = "Você é um assistente financeiro.";

/// Closed set of purposes a user message can be classified into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    AddExpense,
    AddIncome,
    SetBalance,
    SetLimit,
    Report,
    Help,
    ShowBalance,
    ListTransactions,
    DeleteAll,
    AddCategory,
    ListCategories,
    EnableReminder,
    DisableReminder,
    Uncertain,
}

/// Classifier output: the intent plus whatever slots the model extracted.
///
/// `amount` is only `Some` for usable values; malformed or zero numerics are
/// dropped here so downstream resolution treats them as a missing slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category_name: Option<String>,
}

/// Outcome of asking the model to categorize a description.
#[derive(Clone, Debug, PartialEq)]
pub enum CategoryResolution {
    /// Case-insensitive match against one of the user's categories.
    Known(String),
    /// No match; the model proposed a new category that still needs the
    /// user's approval.
    Suggested(String),
}

/// Turns free-text messages into structured intents via the language model.
///
/// Fail-soft: model failures and timeouts surface as `Error::Model`, which
/// the engine converts into a fixed apology reply. They never tear down the
/// conversation loop.
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Classify one inbound message. Exactly one model call.
    pub async fn classify(&self, text: &str) -> Result<Classification> {
        let prompt = build_intent_prompt(text);
        let response = self.complete_bounded(&prompt).await?;
        Ok(parse_classification(&response))
    }

    /// Pick a category for `description` among `known`, or suggest a new one.
    ///
    /// Always invoked with the user's full (possibly empty) category list so
    /// the model sees the same context the approval flow will mutate.
    pub async fn resolve_category(
        &self,
        description: &str,
        known: &[String],
    ) -> Result<CategoryResolution> {
        let prompt = format!(
            "{PERSONA} Categorize o item: '{description}'. \
             Categorias disponíveis: {}. \
             Se nenhuma for adequada, sugira uma nova categoria. \
             Responda apenas com o nome da categoria ou a sugestão.",
            known.join(", ")
        );
        let response = self.complete_bounded(&prompt).await?;

        let name = clean_category_reply(&response);
        if known.iter().any(|c| c.to_lowercase() == name) {
            Ok(CategoryResolution::Known(name))
        } else {
            Ok(CategoryResolution::Suggested(name))
        }
    }

    async fn complete_bounded(&self, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.model.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Model(format!(
                "model call exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

fn build_intent_prompt(text: &str) -> String {
    format!(
        r#"{PERSONA} Analise a mensagem em português: "{text}". Determine a intenção do usuário entre:
- adicionar uma despesa (ex.: "camisa 20")
- adicionar uma receita (ex.: "salário 1850")
- definir o saldo (ex.: "adicionar 1000 reais")
- definir o limite de gastos (ex.: "limite 500")
- gerar um relatório (ex.: "relatório do mês")
- pedir ajuda (ex.: "como usar")
- ver saldo (ex.: "mostrar saldo")
- listar transações (ex.: "listar transações")
- apagar todas as transações (ex.: "apagar tudo")
- adicionar uma categoria (ex.: "adicionar categoria transporte")
- listar categorias (ex.: "listar categorias")
- ativar modo lembrete (ex.: "ativar modo lembrete")
- desativar modo lembrete (ex.: "desativar modo lembrete")
Para despesas, receitas e adicionar categoria, extraia a descrição, valor ou nome da categoria. Responda no formato:
intenção: [intenção]
descrição: [descrição]
valor: [valor]
nome: [nome da categoria]
Se não for possível determinar, responda "intenção: incerto"."#
    )
}

/// Parse the fixed `key: value` line format. A missing intent line yields
/// `Uncertain`; malformed values drop the slot rather than failing.
pub fn parse_classification(response: &str) -> Classification {
    let mut intent = None;
    let mut description = None;
    let mut amount = None;
    let mut category_name = None;

    for raw in response.lines() {
        let line = raw.trim();
        if let Some(v) = value_for(line, "intenção:") {
            intent.get_or_insert(intent_from_label(&v.to_lowercase()));
        } else if let Some(v) = value_for(line, "descrição:") {
            description.get_or_insert(v);
        } else if let Some(v) = value_for(line, "valor:") {
            amount.get_or_insert(parse_amount(&v));
        } else if let Some(v) = value_for(line, "nome:") {
            category_name.get_or_insert(v);
        }
    }

    Classification {
        intent: intent.unwrap_or(Intent::Uncertain),
        description,
        amount: amount.flatten(),
        category_name,
    }
}

fn value_for(line: &str, key: &str) -> Option<String> {
    let rest = line.strip_prefix(key)?.trim();
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_string())
}

fn intent_from_label(label: &str) -> Intent {
    match label.trim() {
        "adicionar uma despesa" => Intent::AddExpense,
        "adicionar uma receita" => Intent::AddIncome,
        "definir o saldo" => Intent::SetBalance,
        "definir o limite de gastos" => Intent::SetLimit,
        "gerar um relatório" => Intent::Report,
        "pedir ajuda" => Intent::Help,
        "ver saldo" => Intent::ShowBalance,
        "listar transações" => Intent::ListTransactions,
        "apagar todas as transações" => Intent::DeleteAll,
        "adicionar uma categoria" => Intent::AddCategory,
        "listar categorias" => Intent::ListCategories,
        "ativar modo lembrete" => Intent::EnableReminder,
        "desativar modo lembrete" => Intent::DisableReminder,
        _ => Intent::Uncertain,
    }
}

/// An amount slot is usable only if it parses to a finite, non-zero number.
fn parse_amount(raw: &str) -> Option<f64> {
    let v: f64 = raw.trim().parse().ok()?;
    if !v.is_finite() || v == 0.0 {
        return None;
    }
    Some(v)
}

fn clean_category_reply(response: &str) -> String {
    let lowered = response.trim().to_lowercase();
    let prefix = Regex::new(r"^sugest[ãa]o:\s*").expect("valid regex");
    prefix.replace(&lowered, "").trim().to_string()
}
