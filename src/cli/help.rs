//! Command-name contract used for log spans.

use crate::cli::parse::{BackupCommands, CaptionCommands, CatalogCommands, ChatCommands, Commands};

/// Command name string (e.g. "backups.restore", "chat.ask").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Update { .. } => "update".to_string(),
        Commands::Backups { command } => format!("backups.{}", backup_command_name(command)),
        Commands::Catalog { command } => format!("catalog.{}", catalog_command_name(command)),
        Commands::Captions { command } => format!("captions.{}", caption_command_name(command)),
        Commands::Chat { command } => format!("chat.{}", chat_command_name(command)),
        Commands::Price { .. } => "price".to_string(),
        Commands::Dimensions { .. } => "dimensions".to_string(),
    }
}

pub fn backup_command_name(command: &BackupCommands) -> &'static str {
    match command {
        BackupCommands::List { .. } => "list",
        BackupCommands::Show { .. } => "show",
        BackupCommands::Restore { .. } => "restore",
    }
}

pub fn catalog_command_name(command: &CatalogCommands) -> &'static str {
    match command {
        CatalogCommands::Show { .. } => "show",
        CatalogCommands::Audit { .. } => "audit",
    }
}

pub fn caption_command_name(command: &CaptionCommands) -> &'static str {
    match command {
        CaptionCommands::Generate { .. } => "generate",
    }
}

pub fn chat_command_name(command: &ChatCommands) -> &'static str {
    match command {
        ChatCommands::Ask { .. } => "ask",
        ChatCommands::Show { .. } => "show",
        ChatCommands::List => "list",
    }
}

/// Whether a command reads or writes the key-value store.
pub fn needs_store(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Price { .. } | Commands::Dimensions { .. } | Commands::Captions { .. }
    )
}
