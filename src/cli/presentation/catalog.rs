//! Catalog, update and backup presentation.

use super::shared::format_section_heading;
use crate::assets::AssetAudit;
use crate::catalog::{CatalogEntry, RestoreReport, UpdateReport};
use crate::store::BackupInfo;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_update_report_text(report: &UpdateReport) -> String {
    let mut out = String::new();
    let heading = if report.dry_run {
        "Catalog update (dry run)"
    } else {
        "Catalog update"
    };
    out.push_str(&format!("{}\n\n", format_section_heading(heading)));
    out.push_str(&format!("  Items: {} (previously {})\n", report.item_count, report.previous_count));
    out.push_str(&format!("  Dropped: {}\n", report.dropped_count()));
    match &report.backup_key {
        Some(key) => out.push_str(&format!("  Backup: {}\n", key)),
        None if report.dry_run => out.push_str("  Backup: skipped (dry run)\n"),
        None if report.previous_read_failed => out.push_str(&format!(
            "  Backup: {}\n",
            "none, previous catalog could not be read and was overwritten".red()
        )),
        None => out.push_str("  Backup: none (no previous catalog)\n"),
    }

    if !report.missing_ids.is_empty() {
        out.push_str(&format!(
            "\n{} ({}), removed from the gallery:\n",
            "Missing".yellow(),
            report.missing_ids.len()
        ));
        for id in &report.missing_ids {
            out.push_str(&format!("  - {}\n", id));
        }
    }
    if !report.warnings.is_empty() {
        out.push_str(&format!("\n{} ({}):\n", "Warnings".yellow(), report.warnings.len()));
        for warning in &report.warnings {
            out.push_str(&format!("  - {}\n", warning));
        }
    }
    out
}

pub fn format_restore_report_text(report: &RestoreReport) -> String {
    let mut out = format!(
        "Restored {} item(s) from {}\n",
        report.item_count, report.restored_from
    );
    if let Some(key) = &report.backup_key {
        out.push_str(&format!("Previous catalog saved as {}\n", key));
    }
    out
}

pub fn format_backup_list_text(backups: &[BackupInfo]) -> String {
    if backups.is_empty() {
        return "No backups found.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Created (UTC)"]);
    for backup in backups {
        let created = backup
            .created_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![backup.key.clone(), created]);
    }
    format!("{}\n\nTotal: {} backup(s)", table, backups.len())
}

pub fn format_catalog_text(catalog: &[CatalogEntry]) -> String {
    if catalog.is_empty() {
        return "Catalog is empty.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Id", "Title", "Size", "Formats", "Prices", "Sold", "Visible"]);
    for entry in catalog {
        let formats: Vec<&str> = entry.print_formats.iter().map(String::as_str).collect();
        let prices: Vec<String> = entry
            .price_details
            .iter()
            .filter_map(|(code, price)| price.as_ref().map(|p| format!("{} {}", code, p)))
            .collect();
        table.add_row(vec![
            entry.id.clone(),
            entry.title.clone(),
            format!("{}×{}", entry.width, entry.height),
            formats.join(", "),
            prices.join(", "),
            entry.sold_count().to_string(),
            if entry.visible { "yes" } else { "no" }.to_string(),
        ]);
    }
    format!("{}\n\nTotal: {} item(s)", table, catalog.len())
}

pub fn format_audit_text(audit: &AssetAudit) -> String {
    if audit.is_clean() {
        return format!("{}", "All catalog assets present, no orphaned images.".green());
    }
    let mut out = String::new();
    if !audit.missing.is_empty() {
        out.push_str(&format!("{}\n\n", format_section_heading("Missing assets")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Id", "Path"]);
        for (id, path) in &audit.missing {
            table.add_row(vec![id.clone(), path.clone()]);
        }
        out.push_str(&format!("{}\n\n", table));
    }
    if !audit.orphans.is_empty() {
        out.push_str(&format!("{}\n\n", format_section_heading("Images without a catalog entry")));
        for path in &audit.orphans {
            out.push_str(&format!("  {}\n", path));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_update_report_lists_missing_ids() {
        let report = UpdateReport {
            item_count: 3,
            previous_count: 4,
            missing_ids: BTreeSet::from(["old-pier".to_string()]),
            warnings: Vec::new(),
            backup_key: Some("gallery:backup:1700000000000".to_string()),
            previous_read_failed: false,
            dry_run: false,
        };
        let text = format_update_report_text(&report);
        assert!(text.contains("Items: 3 (previously 4)"));
        assert!(text.contains("old-pier"));
        assert!(text.contains("gallery:backup:1700000000000"));
    }

    #[test]
    fn test_update_report_flags_unbacked_overwrite() {
        let report = UpdateReport {
            item_count: 2,
            previous_count: 0,
            missing_ids: BTreeSet::new(),
            warnings: Vec::new(),
            backup_key: None,
            previous_read_failed: true,
            dry_run: false,
        };
        let text = format_update_report_text(&report);
        assert!(text.contains("previous catalog could not be read and was overwritten"));
        assert!(!text.contains("no previous catalog"));
    }

    #[test]
    fn test_empty_outputs() {
        assert_eq!(format_backup_list_text(&[]), "No backups found.");
        assert_eq!(format_catalog_text(&[]), "Catalog is empty.");
    }

    #[test]
    fn test_catalog_table_shows_prices() {
        let entry: CatalogEntry = serde_json::from_value(serde_json::json!({
            "id": "pier",
            "title": "Pier",
            "priceDetails": {"L": "€427", "artist": null},
            "printFormats": ["L"]
        }))
        .unwrap();
        let text = format_catalog_text(&[entry]);
        assert!(text.contains("L €427"));
        assert!(text.contains("Total: 1 item(s)"));
    }
}
