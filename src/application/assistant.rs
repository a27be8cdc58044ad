use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::{BankService, Identity};

/// Instructions sent with every free-text question.
pub const ADVISOR_PREAMBLE: &str = "You are a professional bank advisor. \
Answer politely and clearly, in at most two or three short sentences. \
Only give information about accounts, loans, cards and transfers. \
Never make up information about customers.";

pub const DEFAULT_MAX_TOKENS: u32 = 60;

/// Phrases that mark a question about the caller's own balance.
const BALANCE_PHRASES: &[&str] = &[
    "cuanto dinero tengo",
    "cuánto dinero tengo",
    "cuál es mi saldo",
    "cual es mi saldo",
    "mi dinero",
    "saldo de mi cuenta",
    "consultar saldo",
    "ver mi saldo",
    "my balance",
    "how much money do i have",
    "account balance",
    "check balance",
];

const LOGIN_PROMPT: &str =
    "To check your balance you need to log in. Please log in to access your personal information.";

const BALANCE_UNAVAILABLE: &str =
    "Sorry, I could not get your balance right now. Please try again.";

const COMPLETION_UNAVAILABLE: &str =
    "Sorry, I cannot process your request right now. Please try again later.";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Completion API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Completion service is not configured")]
    NotConfigured,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub message: String,
    pub preamble: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn advisor(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            preamble: ADVISOR_PREAMBLE.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Client for a Cohere-style chat endpoint.
pub struct CohereClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

impl CohereClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.into(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl TextCompletion for CohereClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let Some(key) = &self.api_key else {
            return Err(CompletionError::NotConfigured);
        };

        tracing::debug!(url = %self.url, model = %self.model, "sending chat completion");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(key)
            .json(&json!({
                "model": self.model,
                "message": request.message,
                "preamble": request.preamble,
                "max_tokens": request.max_tokens,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        Ok(chat.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Balance,
    LoginRequired,
    Completion,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub text: String,
    pub source: ReplySource,
}

impl AssistantReply {
    fn new(text: impl Into<String>, source: ReplySource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

pub fn is_balance_question(message: &str) -> bool {
    let message = message.to_lowercase();
    BALANCE_PHRASES.iter().any(|phrase| message.contains(phrase))
}

/// Chat front end: balance questions are answered from the bank itself,
/// everything else goes to the completion backend.
pub struct Assistant<C> {
    bank: BankService,
    completion: C,
}

impl<C: TextCompletion> Assistant<C> {
    pub fn new(bank: BankService, completion: C) -> Self {
        Self { bank, completion }
    }

    pub async fn respond(&self, identity: &Identity, message: &str) -> AssistantReply {
        if is_balance_question(message) {
            return self.balance_reply(identity).await;
        }

        let request = CompletionRequest::advisor(message.to_lowercase());
        match self.completion.complete(&request).await {
            Ok(text) => AssistantReply::new(text, ReplySource::Completion),
            Err(err) => {
                tracing::warn!(error = %err, "completion failed");
                AssistantReply::new(COMPLETION_UNAVAILABLE, ReplySource::Unavailable)
            }
        }
    }

    async fn balance_reply(&self, identity: &Identity) -> AssistantReply {
        let Some(account) = identity.current_account() else {
            return AssistantReply::new(LOGIN_PROMPT, ReplySource::LoginRequired);
        };

        match self.bank.get_balance(account.id).await {
            Ok(balance) => AssistantReply::new(
                format!(
                    "Your current balance is S/ {}. Is there anything else I can help you with?",
                    balance
                ),
                ReplySource::Balance,
            ),
            Err(err) => {
                tracing::error!(account_id = account.id, error = %err, "balance lookup failed");
                AssistantReply::new(BALANCE_UNAVAILABLE, ReplySource::Unavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_phrases() {
        assert!(is_balance_question("Hola, ¿CUÁL ES MI SALDO?"));
        assert!(is_balance_question("quiero consultar saldo"));
        assert!(is_balance_question("What's my balance?"));
        assert!(!is_balance_question("¿Qué tarjetas ofrecen?"));
    }

    #[test]
    fn test_advisor_request() {
        let request = CompletionRequest::advisor("hola");
        assert_eq!(request.max_tokens, 60);
        assert_eq!(request.preamble, ADVISOR_PREAMBLE);
    }
}
