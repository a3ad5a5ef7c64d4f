//! Darkroom: gallery catalog sync for a photography portfolio site.
//!
//! Merges image-pipeline metadata with the curated catalog, persists it to a
//! key-value store with verbatim backups, and backs the site assistant.

pub mod assets;
pub mod captions;
pub mod catalog;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pricing;
pub mod provider;
pub mod store;
