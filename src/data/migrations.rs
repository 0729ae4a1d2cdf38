use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS screenshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_path TEXT UNIQUE NOT NULL,
    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    file_hash TEXT NOT NULL,
    category TEXT,
    app_name TEXT,
    window_title TEXT,
    created_at TEXT NOT NULL,
    ocr_text TEXT,
    ocr_confidence REAL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_screenshots_hash ON screenshots(file_hash);
CREATE INDEX IF NOT EXISTS idx_screenshots_category_time ON screenshots(category, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_screenshots_app_time ON screenshots(app_name, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_screenshots_time ON screenshots(created_at DESC);
";

pub fn run_migrations(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA_V1)?;
    Ok(())
}
