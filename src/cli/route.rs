//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::assets::{audit_catalog, AssetCheck, FsAssetStore};
use crate::captions::{generate_missing_captions, CaptionIndex, LlmCaptionGenerator};
use crate::catalog::{load_metadata, CatalogSync};
use crate::chat::ChatService;
use crate::config::{ConfigLoader, DarkroomConfig};
use crate::error::ApiError;
use crate::pricing::{compute_final_price, compute_physical_dimensions};
use crate::provider::{CompletionOptions, ModelProviderClient, ProviderFactory};
use crate::store::{open_store, KeyValueStore, SnapshotStore, StoreEnvironment};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn};

use crate::cli::help::{command_name, needs_store};
use crate::cli::parse::{BackupCommands, CaptionCommands, CatalogCommands, ChatCommands, Commands};
use crate::cli::presentation::{
    format_audit_text, format_backup_list_text, format_caption_run_text, format_catalog_text,
    format_restore_report_text, format_transcript_text, format_update_report_text,
    format_visitor_list_text, parse_output_format, to_json, OutputFormat,
};

/// Runtime context for CLI execution: workspace and loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: DarkroomConfig,
    provider_override: Option<Arc<dyn ModelProviderClient>>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self::from_config(workspace_root, config))
    }

    pub fn from_config(workspace_root: PathBuf, config: DarkroomConfig) -> Self {
        Self {
            workspace_root,
            config,
            provider_override: None,
        }
    }

    /// Select the REST credential set, e.g. from `--env production`.
    pub fn with_store_environment(mut self, environment: StoreEnvironment) -> Result<Self, ApiError> {
        self.config.store.environment = environment;
        self.config
            .store
            .validate()
            .map_err(|e| ApiError::ConfigError(format!("store: {}", e)))?;
        Ok(self)
    }

    /// Use this client instead of the one described by `[provider]`.
    pub fn with_provider_client(mut self, client: Arc<dyn ModelProviderClient>) -> Self {
        self.provider_override = Some(client);
        self
    }

    pub fn config(&self) -> &DarkroomConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let store = if needs_store(command) {
            Some(open_store(&self.config.store, &self.workspace_root)?)
        } else {
            None
        };
        self.run(command, store)
    }

    /// Execute against an already opened store.
    pub fn execute_with_store(
        &self,
        command: &Commands,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<String, ApiError> {
        self.run(command, Some(store))
    }

    fn run(&self, command: &Commands, store: Option<Arc<dyn KeyValueStore>>) -> Result<String, ApiError> {
        let name = command_name(command);
        let span = info_span!("command", name = %name);
        let _entered = span.enter();
        let started = Instant::now();

        let result = self.dispatch(command, store);
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(duration_ms, "Command finished"),
            Err(e) => warn!(duration_ms, error = %e, "Command failed"),
        }
        result
    }

    fn dispatch(&self, command: &Commands, store: Option<Arc<dyn KeyValueStore>>) -> Result<String, ApiError> {
        match command {
            Commands::Price { gross, extra_large } => self.handle_price(*gross, *extra_large),
            Commands::Dimensions { width, height, dpi } => {
                self.handle_dimensions(*width, *height, *dpi)
            }
            Commands::Backups {
                command: BackupCommands::Restore { key, yes },
            } => {
                if !*yes && !confirm(&format!("Replace the live catalog with {}?", key))? {
                    return Ok("Restore cancelled".to_string());
                }
                let store = require_store(store)?;
                block_on(self.handle_restore(key, store))
            }
            Commands::Captions { command } => block_on(self.handle_captions(command)),
            other => {
                let store = require_store(store)?;
                block_on(self.dispatch_store_command(other, store))
            }
        }
    }

    async fn dispatch_store_command(
        &self,
        command: &Commands,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<String, ApiError> {
        match command {
            Commands::Update {
                metadata,
                captions,
                dry_run,
                format,
            } => {
                self.handle_update(metadata.as_deref(), captions.as_deref(), *dry_run, format, store)
                    .await
            }
            Commands::Backups { command } => self.handle_backups(command, store).await,
            Commands::Catalog { command } => self.handle_catalog(command, store).await,
            Commands::Chat { command } => self.handle_chat(command, store).await,
            Commands::Captions { .. } | Commands::Price { .. } | Commands::Dimensions { .. } => {
                Err(ApiError::InvalidInput(format!(
                    "'{}' does not use the store",
                    command_name(command)
                )))
            }
        }
    }

    async fn handle_update(
        &self,
        metadata: Option<&Path>,
        captions: Option<&Path>,
        dry_run: bool,
        format: &str,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<String, ApiError> {
        let format = parse_output_format(format)?;
        let gallery = &self.config.gallery;
        let metadata_path = metadata
            .map(Path::to_path_buf)
            .unwrap_or_else(|| gallery.metadata_path(&self.workspace_root));
        let captions_path = captions
            .map(Path::to_path_buf)
            .unwrap_or_else(|| gallery.captions_path(&self.workspace_root));

        let index = CaptionIndex::load(&captions_path)?;
        let sync = self.catalog_sync(store)?;
        let report = sync.run_catalog_update(&metadata_path, &index, dry_run).await?;
        render(format, &report, format_update_report_text)
    }

    async fn handle_backups(
        &self,
        command: &BackupCommands,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<String, ApiError> {
        let snapshots = SnapshotStore::new(store);
        match command {
            BackupCommands::List { format } => {
                let format = parse_output_format(format)?;
                let backups = snapshots.list_backups().await?;
                render(format, backups.as_slice(), format_backup_list_text)
            }
            BackupCommands::Show { key, format } => {
                let format = parse_output_format(format)?;
                let catalog = snapshots.load_backup(key).await?;
                render(format, catalog.as_slice(), format_catalog_text)
            }
            BackupCommands::Restore { key, .. } => {
                let store = Arc::clone(snapshots.store());
                self.handle_restore(key, store).await
            }
        }
    }

    async fn handle_restore(&self, key: &str, store: Arc<dyn KeyValueStore>) -> Result<String, ApiError> {
        // Restore never checks assets; the backup is written back as stored.
        let sync = CatalogSync::new(
            SnapshotStore::new(store),
            self.config.pricing.clone(),
            self.config.gallery.layout.clone(),
            Arc::new(|_: &str| true),
        );
        let report = sync.restore_backup(key).await?;
        Ok(format_restore_report_text(&report))
    }

    async fn handle_catalog(
        &self,
        command: &CatalogCommands,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<String, ApiError> {
        let snapshots = SnapshotStore::new(store);
        match command {
            CatalogCommands::Show { format } => {
                let format = parse_output_format(format)?;
                let catalog = snapshots.load_catalog().await?.entries;
                render(format, catalog.as_slice(), format_catalog_text)
            }
            CatalogCommands::Audit { format } => {
                let format = parse_output_format(format)?;
                let assets = self.asset_store()?;
                let catalog = snapshots.load_catalog().await?.entries;
                let audit = audit_catalog(&assets, &self.config.gallery.layout, &catalog);
                render(format, &audit, format_audit_text)
            }
        }
    }

    async fn handle_captions(&self, command: &CaptionCommands) -> Result<String, ApiError> {
        let CaptionCommands::Generate { limit, concurrency } = command;
        let gallery = &self.config.gallery;
        if gallery.public_base_url.is_none() {
            return Err(ApiError::ConfigError(
                "gallery.public_base_url is required to caption images".to_string(),
            ));
        }

        let client = self.provider_client()?;
        let generator = LlmCaptionGenerator::new(client, self.completion_options());
        let metadata = load_metadata(&gallery.metadata_path(&self.workspace_root))?;
        let captions_path = gallery.captions_path(&self.workspace_root);
        let mut index = CaptionIndex::load(&captions_path)?;

        let run = generate_missing_captions(
            &generator,
            &metadata,
            &mut index,
            |item| gallery.public_url(&item.file).unwrap_or_default(),
            *limit,
            concurrency.unwrap_or(gallery.caption_concurrency),
        )
        .await;

        if !run.generated.is_empty() {
            index.save(&captions_path)?;
            info!(path = %captions_path.display(), count = index.len(), "Caption file saved");
        }
        Ok(format_caption_run_text(&run))
    }

    async fn handle_chat(
        &self,
        command: &ChatCommands,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<String, ApiError> {
        match command {
            ChatCommands::Ask { visitor, message } => {
                let service = self.chat_service(store)?;
                let reply = service.ask(visitor, message).await?;
                if reply.persisted {
                    Ok(reply.reply)
                } else {
                    Ok(format!("{}\n\n(transcript not saved)", reply.reply))
                }
            }
            ChatCommands::Show { visitor, format } => {
                let format = parse_output_format(format)?;
                let service = self.chat_service(store)?;
                let transcript = service.transcript(visitor).await?.ok_or_else(|| {
                    ApiError::InvalidInput(format!("No transcript for visitor '{}'", visitor))
                })?;
                render(format, &transcript, format_transcript_text)
            }
            ChatCommands::List => {
                let visitors = self.chat_service(store)?.list_visitors().await?;
                Ok(format_visitor_list_text(&visitors))
            }
        }
    }

    fn handle_price(&self, gross: f64, extra_large: bool) -> Result<String, ApiError> {
        if !gross.is_finite() || gross < 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "Gross cost must be a non-negative number, got {}",
                gross
            )));
        }
        let policy = &self.config.pricing;
        let price = compute_final_price(gross, extra_large, policy.min_margin, policy.vat_rate);
        Ok(policy.format_price(price))
    }

    fn handle_dimensions(&self, width: u32, height: u32, dpi: Option<f64>) -> Result<String, ApiError> {
        if width == 0 || height == 0 {
            return Err(ApiError::InvalidInput(
                "Width and height must be positive".to_string(),
            ));
        }
        let dpi = dpi.unwrap_or(self.config.pricing.dpi);
        if !dpi.is_finite() || dpi <= 0.0 {
            return Err(ApiError::InvalidInput(format!("DPI must be positive, got {}", dpi)));
        }
        Ok(compute_physical_dimensions(width, height, dpi).label())
    }

    fn asset_store(&self) -> Result<FsAssetStore, ApiError> {
        let root = self.config.gallery.asset_root(&self.workspace_root);
        FsAssetStore::new(&root).map_err(|e| {
            ApiError::ConfigError(format!("Asset root {} is not accessible: {}", root.display(), e))
        })
    }

    fn catalog_sync(&self, store: Arc<dyn KeyValueStore>) -> Result<CatalogSync, ApiError> {
        let assets: Arc<dyn AssetCheck> = Arc::new(self.asset_store()?);
        Ok(CatalogSync::new(
            SnapshotStore::new(store),
            self.config.pricing.clone(),
            self.config.gallery.layout.clone(),
            assets,
        ))
    }

    fn chat_service(&self, store: Arc<dyn KeyValueStore>) -> Result<ChatService, ApiError> {
        Ok(ChatService::new(
            store,
            self.provider_client()?,
            self.config.chat.clone(),
            self.completion_options(),
        ))
    }

    fn provider_client(&self) -> Result<Arc<dyn ModelProviderClient>, ApiError> {
        match &self.provider_override {
            Some(client) => Ok(Arc::clone(client)),
            None => ProviderFactory::from_optional(self.config.provider.as_ref()),
        }
    }

    fn completion_options(&self) -> CompletionOptions {
        self.config
            .provider
            .as_ref()
            .map(|p| p.default_options.clone())
            .unwrap_or_default()
    }
}

fn block_on<F: std::future::Future<Output = Result<String, ApiError>>>(
    future: F,
) -> Result<String, ApiError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;
    rt.block_on(future)
}

fn require_store(store: Option<Arc<dyn KeyValueStore>>) -> Result<Arc<dyn KeyValueStore>, ApiError> {
    store.ok_or_else(|| ApiError::ConfigError("No store opened for this command".to_string()))
}

fn confirm(prompt: &str) -> Result<bool, ApiError> {
    use dialoguer::Confirm;
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))
}

fn render<T, F>(format: OutputFormat, value: &T, text: F) -> Result<String, ApiError>
where
    T: serde::Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => to_json(value),
        OutputFormat::Text => Ok(text(value)),
    }
}
