use std::fmt::Write;
use std::path::Path;

use crate::data::{self, repository};
use crate::error::AppError;
use crate::models::context::UNKNOWN;
use crate::models::screenshot::{LabelCount, UNCATEGORIZED};

pub const DEFAULT_STATS_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStats {
    pub total: i64,
    pub categories: Vec<LabelCount>,
    pub apps: Vec<LabelCount>,
}

pub fn collect(db_path: &Path, count: usize) -> Result<CatalogStats, AppError> {
    let conn = data::open_database(db_path)?;
    Ok(CatalogStats {
        total: repository::count(&conn)?,
        categories: repository::top_categories(&conn, count)?,
        apps: repository::top_apps(&conn, count)?,
    })
}

pub fn format_stats(stats: &CatalogStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Database Statistics ===");
    let _ = writeln!(out, "Total screenshots: {}", stats.total);

    let _ = writeln!(out, "\nMost common categories:");
    for entry in &stats.categories {
        let label = entry.label.as_deref().unwrap_or(UNCATEGORIZED);
        let _ = writeln!(out, "  {label}: {}", entry.count);
    }

    let _ = writeln!(out, "\nMost common applications:");
    for entry in &stats.apps {
        let label = entry.label.as_deref().unwrap_or(UNKNOWN);
        let _ = writeln!(out, "  {label}: {}", entry.count);
    }
    out
}
