//! Site assistant conversations persisted in the key-value store.

use async_trait::async_trait;
use darkroom::chat::{transcript_key, ChatConfig, ChatService, Transcript, CHAT_PREFIX};
use darkroom::error::ApiError;
use darkroom::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, MessageRole, ModelProviderClient,
    TokenUsage,
};
use darkroom::store::{KeyValueStore, MemoryKeyValueStore};
use parking_lot::Mutex;
use std::sync::Arc;

/// Echoes the last user message and records every request.
#[derive(Default)]
struct EchoProvider {
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    fail: bool,
}

#[async_trait]
impl ModelProviderClient for EchoProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, ApiError> {
        self.requests.lock().push(messages.clone());
        if self.fail {
            return Err(ApiError::ProviderRequestFailed("connection reset".to_string()));
        }
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(CompletionResponse {
            content: format!("echo: {}", last),
            model: "echo".to_string(),
            usage: TokenUsage::default(),
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

fn service(
    store: Arc<MemoryKeyValueStore>,
    provider: Arc<EchoProvider>,
    config: ChatConfig,
) -> ChatService {
    ChatService::new(store, provider, config, CompletionOptions::default())
}

#[tokio::test]
async fn test_conversation_is_persisted_per_visitor() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let provider = Arc::new(EchoProvider::default());
    let chat = service(store.clone(), provider.clone(), ChatConfig::default());

    let first = chat.ask("visitor-1", "Is the pier print still available?").await.unwrap();
    assert_eq!(first.reply, "echo: Is the pier print still available?");
    assert_eq!(first.message_count, 2);
    assert!(first.persisted);

    chat.ask("visitor-1", "  And in XL?  ").await.unwrap();
    chat.ask("visitor-2", "Hello").await.unwrap();

    let raw = store.get(&transcript_key("visitor-1")).await.unwrap().unwrap();
    let transcript: Transcript = serde_json::from_str(&raw).unwrap();
    assert_eq!(transcript.messages.len(), 4);
    assert_eq!(transcript.messages[2].content, "And in XL?");

    // The second request carried the first exchange as history.
    let second_request = provider.requests.lock()[1].clone();
    assert_eq!(second_request.len(), 4);
    assert_eq!(second_request[0].role, MessageRole::System);

    assert_eq!(chat.list_visitors().await.unwrap(), vec!["visitor-1", "visitor-2"]);
    assert!(store.snapshot().keys().all(|k| k.starts_with(CHAT_PREFIX)));
}

#[tokio::test]
async fn test_history_window_limits_context() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let provider = Arc::new(EchoProvider::default());
    let config = ChatConfig {
        history_window: 2,
        ..ChatConfig::default()
    };
    let chat = service(store, provider.clone(), config);

    for message in ["one", "two", "three"] {
        chat.ask("v", message).await.unwrap();
    }
    let requests = provider.requests.lock();
    // system + two history messages + the new user message
    assert_eq!(requests[2].len(), 4);
    assert_eq!(requests[2][1].content, "two");
}

#[tokio::test]
async fn test_provider_failure_saves_nothing() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let provider = Arc::new(EchoProvider {
        fail: true,
        ..EchoProvider::default()
    });
    let chat = service(store.clone(), provider, ChatConfig::default());

    let err = chat.ask("v", "hi").await.unwrap_err();
    assert!(matches!(err, ApiError::ProviderRequestFailed(_)));
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn test_failed_transcript_save_still_replies() {
    let store = Arc::new(MemoryKeyValueStore::new());
    store.fail_writes_matching(CHAT_PREFIX);
    let chat = service(store, Arc::new(EchoProvider::default()), ChatConfig::default());

    let reply = chat.ask("v", "hi").await.unwrap();
    assert_eq!(reply.reply, "echo: hi");
    assert!(!reply.persisted);
}

#[tokio::test]
async fn test_rejects_bad_input() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let config = ChatConfig {
        max_message_chars: 10,
        ..ChatConfig::default()
    };
    let chat = service(store, Arc::new(EchoProvider::default()), config);

    assert!(matches!(
        chat.ask("../etc", "hi").await.unwrap_err(),
        ApiError::InvalidInput(_)
    ));
    assert!(matches!(chat.ask("v", "   ").await.unwrap_err(), ApiError::InvalidInput(_)));
    assert!(matches!(
        chat.ask("v", "far too long for the limit").await.unwrap_err(),
        ApiError::InvalidInput(_)
    ));
}
