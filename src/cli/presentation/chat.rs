//! Chat and caption presentation.

use super::shared::format_section_heading;
use crate::captions::CaptionRun;
use crate::chat::Transcript;
use crate::provider::MessageRole;
use owo_colors::OwoColorize;

pub fn format_transcript_text(transcript: &Transcript) -> String {
    let mut out = format!(
        "{}\n\n",
        format_section_heading(&format!("Transcript: {}", transcript.visitor_id))
    );
    for message in &transcript.messages {
        let who = match message.role {
            MessageRole::User => format!("{}", "visitor".cyan()),
            MessageRole::Assistant => format!("{}", "assistant".green()),
            MessageRole::System => "system".to_string(),
        };
        out.push_str(&format!(
            "[{}] {}: {}\n",
            message.timestamp.format("%Y-%m-%d %H:%M"),
            who,
            message.content
        ));
    }
    out.push_str(&format!(
        "\n{} message(s), last update {}",
        transcript.messages.len(),
        transcript.updated_at.to_rfc3339()
    ));
    out
}

pub fn format_visitor_list_text(visitors: &[String]) -> String {
    if visitors.is_empty() {
        return "No transcripts stored.".to_string();
    }
    let mut out = visitors.join("\n");
    out.push_str(&format!("\n\nTotal: {} visitor(s)", visitors.len()));
    out
}

pub fn format_caption_run_text(run: &CaptionRun) -> String {
    let mut out = format!("Captioned {} image(s)\n", run.generated.len());
    if run.skipped > 0 {
        out.push_str(&format!("{} image(s) left for a later run\n", run.skipped));
    }
    if !run.failures.is_empty() {
        out.push_str(&format!("\n{} ({}):\n", "Failed".red(), run.failures.len()));
        for (id, reason) in &run.failures {
            out.push_str(&format!("  - {}: {}\n", id, reason));
        }
    }
    out
}
