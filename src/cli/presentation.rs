//! CLI presentation: text and json formatters per command family.

mod catalog;
mod chat;
mod shared;

pub use catalog::{
    format_audit_text, format_backup_list_text, format_catalog_text, format_restore_report_text,
    format_update_report_text,
};
pub use chat::{format_caption_run_text, format_transcript_text, format_visitor_list_text};
pub use shared::{format_section_heading, parse_output_format, to_json, OutputFormat};
