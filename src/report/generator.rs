//! Dashboard page generation.
//!
//! Embeds the aggregated dataset mapping into the HTML page, and renders
//! the same mapping as standalone JSON for `--dry-run`.

use crate::analysis::Dashboard;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

/// Placeholder replaced by the dataset JSON in the page template.
pub const DATA_PLACEHOLDER: &str = "{{ analytics_data }}";

/// Placeholder replaced by the static asset URL prefix.
pub const STATIC_PLACEHOLDER: &str = "{{ static_url }}";

/// Page shipped with the binary, used when no template is configured.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Read the page template, falling back to the bundled one.
pub fn load_template(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return DEFAULT_TEMPLATE.to_string();
    };

    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "Failed to read template {}: {}; using bundled page",
                path.display(),
                e
            );
            DEFAULT_TEMPLATE.to_string()
        }
    }
}

/// Point asset links in the template at the configured URL prefix.
pub fn apply_static_prefix(template: &str, url_prefix: &str) -> String {
    template.replace(STATIC_PLACEHOLDER, url_prefix)
}

/// Serialize the mapping for embedding inside a `<script>` element.
///
/// `</` is escaped so a value cannot terminate the script early.
pub fn embeddable_json(dashboard: &Dashboard) -> Result<String> {
    let json = serde_json::to_string(dashboard).context("Failed to serialize dashboard data")?;
    Ok(json.replace("</", "<\\/"))
}

/// Produce the complete HTML page.
pub fn generate_page(template: &str, dashboard: &Dashboard) -> Result<String> {
    let json = embeddable_json(dashboard)?;

    if template.contains(DATA_PLACEHOLDER) {
        return Ok(template.replace(DATA_PLACEHOLDER, &json));
    }

    // No placeholder: inject the data ahead of the page scripts' load handlers
    let script = format!("<script>window.analyticsData = {};</script>\n", json);
    let mut page = template.to_string();
    match page.rfind("</body>") {
        Some(pos) => page.insert_str(pos, &script),
        None => page.push_str(&script),
    }
    Ok(page)
}

/// Pretty-printed JSON for the CLI dump.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).context("Failed to serialize dashboard data")
}
