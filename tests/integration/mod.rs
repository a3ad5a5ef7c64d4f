//! Integration tests for the darkroom gallery backend

mod backup_protocol;
mod catalog_update;
mod chat_transcripts;
mod cli_routes;
mod config_integration;
mod test_utils;
