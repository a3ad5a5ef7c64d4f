//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, needs_store};
pub use output::{exit_code, map_error};
pub use parse::{BackupCommands, CaptionCommands, CatalogCommands, ChatCommands, Cli, Commands};
pub use route::RunContext;
