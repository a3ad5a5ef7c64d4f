//! Caption generation
//!
//! Captions are suggested titles, descriptions and tags for gallery images.
//! They live in a local JSON file keyed by image id and only ever fill curator
//! fields that are still empty at merge time.

use crate::catalog::ImageMetadata;
use crate::error::{ApiError, CatalogError, StoreError};
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CAPTION_PROMPT: &str = "You write captions for a fine-art photography gallery. \
Answer with a single JSON object with the keys \"title\" (at most six words), \
\"description\" (one or two sentences) and \"tags\" (three to eight lowercase keywords). \
Do not add any other text.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Caption {
    fn tidy(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        let mut seen = BTreeSet::new();
        self.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        self
    }
}

/// Captions keyed by image id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionIndex(BTreeMap<String, Caption>);

impl Deref for CaptionIndex {
    type Target = BTreeMap<String, Caption>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for CaptionIndex {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl CaptionIndex {
    /// Read the caption file. A file that does not exist yet is an empty index.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(CatalogError::SourceUnreadable {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };
        serde_json::from_str(&text).map_err(|e| CatalogError::SourceUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(path, json + "\n")?;
        Ok(())
    }
}

/// Produces a caption for one image
#[async_trait]
pub trait CaptionGenerator: Send + Sync {
    async fn generate(&self, id: &str, image_url: &str) -> Result<Caption, ApiError>;
}

/// Caption generator backed by a vision-capable chat model
pub struct LlmCaptionGenerator {
    client: Arc<dyn ModelProviderClient>,
    options: CompletionOptions,
    prompt: String,
}

impl LlmCaptionGenerator {
    pub fn new(client: Arc<dyn ModelProviderClient>, options: CompletionOptions) -> Self {
        Self {
            client,
            options,
            prompt: DEFAULT_CAPTION_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl CaptionGenerator for LlmCaptionGenerator {
    async fn generate(&self, id: &str, image_url: &str) -> Result<Caption, ApiError> {
        let messages = vec![
            ChatMessage::system(self.prompt.clone()),
            ChatMessage::user(format!("Caption the image \"{}\".", id)).with_image(image_url),
        ];
        let response = self.client.complete(messages, self.options.clone()).await?;
        parse_caption_reply(&response.content)
    }
}

/// Extract the JSON object from a model reply, tolerating markdown fences
/// and chatter around it.
pub fn parse_caption_reply(reply: &str) -> Result<Caption, ApiError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(ApiError::ProviderError(format!(
                "Caption reply contains no JSON object: {}",
                truncate(reply, 80)
            )))
        }
    };
    let caption: Caption = serde_json::from_str(json)
        .map_err(|e| ApiError::ProviderError(format!("Caption reply is not a caption: {}", e)))?;
    let caption = caption.tidy();
    if caption.title.is_empty() {
        return Err(ApiError::ProviderError("Caption reply has an empty title".to_string()));
    }
    Ok(caption)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

/// Outcome of a caption generation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptionRun {
    pub generated: Vec<String>,
    /// `(id, reason)` for every image whose caption could not be produced
    pub failures: Vec<(String, String)>,
    /// Images still without a caption because of the run limit
    pub skipped: usize,
}

/// Caption every image in `metadata` that has no entry in `index` yet.
///
/// At most `concurrency` requests are in flight. Failures are collected per
/// image and never stop the run.
pub async fn generate_missing_captions<F>(
    generator: &dyn CaptionGenerator,
    metadata: &[ImageMetadata],
    index: &mut CaptionIndex,
    image_url: F,
    limit: Option<usize>,
    concurrency: usize,
) -> CaptionRun
where
    F: Fn(&ImageMetadata) -> String,
{
    let mut seen = BTreeSet::new();
    let pending: Vec<(String, String)> = metadata
        .iter()
        .filter(|item| !index.contains_key(&item.id()) && seen.insert(item.id()))
        .map(|item| (item.id(), image_url(item)))
        .collect();

    let take = limit.unwrap_or(pending.len()).min(pending.len());
    let mut run = CaptionRun {
        skipped: pending.len() - take,
        ..CaptionRun::default()
    };
    info!(pending = pending.len(), requested = take, concurrency, "Generating captions");

    let results: Vec<(String, Result<Caption, ApiError>)> = stream::iter(pending.into_iter().take(take))
        .map(|(id, url)| async move {
            let result = generator.generate(&id, &url).await;
            (id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for (id, result) in results {
        match result {
            Ok(caption) => {
                index.insert(id.clone(), caption);
                run.generated.push(id);
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Caption generation failed");
                run.failures.push((id, e.to_string()));
            }
        }
    }
    run.generated.sort();
    run.failures.sort();
    run
}
