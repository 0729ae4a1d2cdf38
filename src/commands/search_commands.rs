use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Duration, Local, Utc};

use crate::data::{self, repository};
use crate::error::AppError;
use crate::models::screenshot::{ScreenshotRecord, SearchFilter, UNCATEGORIZED};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
const PREVIEW_CHARS: usize = 100;

/// Start of the `days` window ending at `now`, clamped to the earliest
/// representable time.
pub fn since_days(days: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn search(db_path: &Path, filter: &SearchFilter) -> Result<Vec<ScreenshotRecord>, AppError> {
    let conn = data::open_database(db_path)?;
    repository::search(&conn, filter)
}

pub fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

pub fn format_results(results: &[ScreenshotRecord]) -> String {
    if results.is_empty() {
        return "No matching screenshots found.\n".to_string();
    }

    let mut out = String::new();
    for (i, record) in results.iter().enumerate() {
        let _ = writeln!(out, "\n[{}] {}", i + 1, record.file_name);
        let _ = writeln!(out, "    Path: {}", record.file_path);
        let _ = writeln!(out, "    App: {}", record.app_name.as_deref().unwrap_or("Unknown"));
        let _ = writeln!(
            out,
            "    Category: {}",
            record.category.as_deref().unwrap_or(UNCATEGORIZED)
        );
        let _ = writeln!(
            out,
            "    Date: {}",
            record.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(text) = record.ocr_text.as_deref().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "    Text: {}", preview(text));
        }
    }
    out
}
