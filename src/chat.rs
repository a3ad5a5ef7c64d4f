//! Site assistant
//!
//! Proxies visitor messages to the chat model and keeps one transcript per
//! visitor under `chat:<visitorId>`.

use crate::error::{ApiError, StoreError};
use crate::provider::{ChatMessage, CompletionOptions, MessageRole, ModelProviderClient};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CHAT_PREFIX: &str = "chat:";

const MAX_VISITOR_ID_LEN: usize = 64;

/// `[chat]` section of the configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Earlier messages sent along with each new one
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

fn default_system_prompt() -> String {
    "You are the assistant on a photographer's personal website. Answer questions about the \
     photographs, prints and exhibitions briefly and kindly."
        .to_string()
}

fn default_history_window() -> usize {
    20
}

fn default_max_message_chars() -> usize {
    2000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history_window: default_history_window(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

impl ChatConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_message_chars == 0 {
            return Err("max_message_chars must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// All messages exchanged with one visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub visitor_id: String,
    #[serde(default)]
    pub messages: Vec<TranscriptMessage>,
    pub updated_at: DateTime<Utc>,
}

impl Transcript {
    pub fn new(visitor_id: &str) -> Self {
        Self {
            visitor_id: visitor_id.to_string(),
            messages: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn push(&mut self, role: MessageRole, content: String) {
        let now = Utc::now();
        self.messages.push(TranscriptMessage {
            role,
            content,
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// The last `window` user and assistant messages as model input.
    fn history(&self, window: usize) -> impl Iterator<Item = ChatMessage> + '_ {
        let skip = self.messages.len().saturating_sub(window);
        self.messages
            .iter()
            .skip(skip)
            .filter(|m| m.role != MessageRole::System)
            .map(|m| ChatMessage::new(m.role, m.content.clone()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub message_count: usize,
    /// False when the transcript could not be saved
    pub persisted: bool,
}

pub fn transcript_key(visitor_id: &str) -> String {
    format!("{}{}", CHAT_PREFIX, visitor_id)
}

/// Visitor ids are 1 to 64 characters of `[A-Za-z0-9_-]`.
pub fn validate_visitor_id(visitor_id: &str) -> Result<(), ApiError> {
    let valid = !visitor_id.is_empty()
        && visitor_id.len() <= MAX_VISITOR_ID_LEN
        && visitor_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "Invalid visitor id '{}'",
            visitor_id
        )))
    }
}

pub struct ChatService {
    store: Arc<dyn KeyValueStore>,
    client: Arc<dyn ModelProviderClient>,
    config: ChatConfig,
    options: CompletionOptions,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        client: Arc<dyn ModelProviderClient>,
        config: ChatConfig,
        options: CompletionOptions,
    ) -> Self {
        Self {
            store,
            client,
            config,
            options,
        }
    }

    pub async fn ask(&self, visitor_id: &str, message: &str) -> Result<ChatReply, ApiError> {
        validate_visitor_id(visitor_id)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(ApiError::InvalidInput("Message is empty".to_string()));
        }
        let length = message.chars().count();
        if length > self.config.max_message_chars {
            return Err(ApiError::InvalidInput(format!(
                "Message is {} characters, the limit is {}",
                length, self.config.max_message_chars
            )));
        }

        let mut transcript = match self.transcript(visitor_id).await {
            Ok(Some(transcript)) => transcript,
            Ok(None) => Transcript::new(visitor_id),
            Err(e) => {
                warn!(visitor = visitor_id, error = %e, "Transcript unreadable, starting a new one");
                Transcript::new(visitor_id)
            }
        };

        let mut messages = vec![ChatMessage::system(self.config.system_prompt.clone())];
        messages.extend(transcript.history(self.config.history_window));
        messages.push(ChatMessage::user(message));
        debug!(visitor = visitor_id, messages = messages.len(), "Forwarding chat message");

        let response = self.client.complete(messages, self.options.clone()).await?;
        let reply = response.content.trim().to_string();

        transcript.push(MessageRole::User, message.to_string());
        transcript.push(MessageRole::Assistant, reply.clone());
        let persisted = match self.save(&transcript).await {
            Ok(()) => true,
            Err(e) => {
                warn!(visitor = visitor_id, error = %e, "Failed to save transcript");
                false
            }
        };
        info!(
            visitor = visitor_id,
            messages = transcript.messages.len(),
            tokens = response.usage.total_tokens,
            "Chat reply sent"
        );

        Ok(ChatReply {
            reply,
            message_count: transcript.messages.len(),
            persisted,
        })
    }

    pub async fn transcript(&self, visitor_id: &str) -> Result<Option<Transcript>, ApiError> {
        validate_visitor_id(visitor_id)?;
        let Some(raw) = self.store.get(&transcript_key(visitor_id)).await? else {
            return Ok(None);
        };
        let transcript = serde_json::from_str(&raw).map_err(|e| {
            StoreError::Serialization(format!(
                "Transcript for {} is malformed: {}",
                visitor_id, e
            ))
        })?;
        Ok(Some(transcript))
    }

    /// Visitors with a stored transcript, sorted.
    pub async fn list_visitors(&self) -> Result<Vec<String>, ApiError> {
        let mut visitors: Vec<String> = self
            .store
            .scan(CHAT_PREFIX)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(CHAT_PREFIX).map(str::to_string))
            .collect();
        visitors.sort();
        Ok(visitors)
    }

    async fn save(&self, transcript: &Transcript) -> Result<(), ApiError> {
        let json = serde_json::to_string(transcript)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store
            .set(&transcript_key(&transcript.visitor_id), &json)
            .await?;
        Ok(())
    }
}
