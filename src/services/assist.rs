use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::models::ticket::{Ticket, TicketComment};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("assist backend unavailable")]
    Unavailable,
    #[error("assist request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("assist response malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseSuggestion {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Optional AI capability injected at startup. Absence is a working no-op
/// implementation, never a null to check for at call sites.
#[async_trait]
pub trait AssistService: Send + Sync {
    fn is_available(&self) -> bool;

    async fn suggest(
        &self,
        ticket: &Ticket,
        comments: &[TicketComment],
    ) -> Result<Vec<ResponseSuggestion>, AssistError>;
}

pub struct NoopAssist;

#[async_trait]
impl AssistService for NoopAssist {
    fn is_available(&self) -> bool {
        false
    }

    async fn suggest(
        &self,
        _: &Ticket,
        _: &[TicketComment],
    ) -> Result<Vec<ResponseSuggestion>, AssistError> {
        Err(AssistError::Unavailable)
    }
}

/// Live implementation backed by the Anthropic Messages API.
pub struct ClaudeAssist {
    pub client: Client,
    pub api_key: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct SuggestionPayload {
    suggestions: Vec<ResponseSuggestion>,
}

impl ClaudeAssist {
    fn build_context(ticket: &Ticket, comments: &[TicketComment]) -> String {
        let mut context = format!(
            "Title: {}\nPriority: {}\nStatus: {}\nDescription: {}\n",
            ticket.title, ticket.priority, ticket.status, ticket.description
        );
        for comment in comments.iter().filter(|c| !c.is_internal) {
            context.push_str(&format!("Comment: {}\n", comment.content));
        }
        context
    }
}

#[async_trait]
impl AssistService for ClaudeAssist {
    fn is_available(&self) -> bool {
        true
    }

    async fn suggest(
        &self,
        ticket: &Ticket,
        comments: &[TicketComment],
    ) -> Result<Vec<ResponseSuggestion>, AssistError> {
        let context = Self::build_context(ticket, comments);
        let prompt = format!(
            "You are a helpful IT support assistant. Based on the following ticket, \
             provide 3 professional response suggestions a support agent could use.\n\n\
             Ticket context:\n{context}\n\n\
             Respond with JSON of the form \
             {{\"suggestions\": [{{\"title\": \"...\", \"content\": \"...\", \
             \"type\": \"acknowledgment|solution|request_info|escalation\"}}]}}"
        );

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&json!({
                "model": ANTHROPIC_MODEL,
                "max_tokens": 1024,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: MessagesResponse = response.json().await?;
        let text = body
            .content
            .first()
            .and_then(|block| block.text.as_deref())
            .ok_or_else(|| AssistError::Malformed("empty content".into()))?;

        match serde_json::from_str::<SuggestionPayload>(text) {
            Ok(payload) => Ok(payload.suggestions),
            Err(err) => {
                warn!(ticket_number = %ticket.ticket_number, error = %err,
                      "assist returned non-JSON suggestions");
                Err(AssistError::Malformed(err.to_string()))
            }
        }
    }
}
