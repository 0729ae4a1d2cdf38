use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::error::AppError;
use crate::models::screenshot::{LabelCount, NewScreenshot, ScreenshotRecord, SearchFilter};

const RECORD_COLUMNS: &str = "id, file_path, file_name, file_size, file_hash, category, app_name, window_title, created_at, ocr_text, ocr_confidence";

fn record_from_row(row: &Row<'_>) -> Result<ScreenshotRecord, rusqlite::Error> {
    Ok(ScreenshotRecord {
        id: row.get(0)?,
        file_path: row.get(1)?,
        file_name: row.get(2)?,
        file_size: row.get(3)?,
        file_hash: row.get(4)?,
        category: row.get(5)?,
        app_name: row.get(6)?,
        window_title: row.get(7)?,
        created_at: row.get(8)?,
        ocr_text: row.get(9)?,
        ocr_confidence: row.get(10)?,
    })
}

pub fn insert_screenshot(conn: &Connection, new: &NewScreenshot) -> Result<ScreenshotRecord, AppError> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO screenshots (file_path, file_name, file_size, file_hash, category, app_name, window_title, created_at, ocr_text, ocr_confidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            new.file_path,
            new.file_name,
            new.file_size,
            new.file_hash,
            new.category,
            new.app_name,
            new.window_title,
            created_at,
            new.ocr_text,
            new.ocr_confidence,
        ],
    )?;

    Ok(ScreenshotRecord {
        id: conn.last_insert_rowid(),
        file_path: new.file_path.clone(),
        file_name: new.file_name.clone(),
        file_size: new.file_size,
        file_hash: new.file_hash.clone(),
        category: new.category.clone(),
        app_name: new.app_name.clone(),
        window_title: new.window_title.clone(),
        created_at,
        ocr_text: new.ocr_text.clone(),
        ocr_confidence: new.ocr_confidence,
    })
}

pub fn find_by_hash(conn: &Connection, file_hash: &str) -> Result<Option<ScreenshotRecord>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM screenshots WHERE file_hash = ?1"
    ))?;
    let record = stmt.query_row(params![file_hash], record_from_row).optional()?;
    Ok(record)
}

pub fn get_by_path(conn: &Connection, file_path: &str) -> Result<Option<ScreenshotRecord>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM screenshots WHERE file_path = ?1"
    ))?;
    let record = stmt.query_row(params![file_path], record_from_row).optional()?;
    Ok(record)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Newest-first lookup; every filter left as `None` is ignored.
pub fn search(conn: &Connection, filter: &SearchFilter) -> Result<Vec<ScreenshotRecord>, AppError> {
    if filter.limit == 0 {
        return Ok(Vec::new());
    }

    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        clauses.push(
            "(ocr_text LIKE ? ESCAPE '\\' OR window_title LIKE ? ESCAPE '\\' OR file_name LIKE ? ESCAPE '\\')",
        );
        let pattern = escape_like(query);
        values.push(Box::new(pattern.clone()));
        values.push(Box::new(pattern.clone()));
        values.push(Box::new(pattern));
    }
    if let Some(category) = filter.category.as_deref() {
        clauses.push("category = ? COLLATE NOCASE");
        values.push(Box::new(category.to_string()));
    }
    if let Some(app_name) = filter.app_name.as_deref() {
        clauses.push("app_name = ? COLLATE NOCASE");
        values.push(Box::new(app_name.to_string()));
    }
    if let Some(min_date) = filter.min_date {
        clauses.push("created_at >= ?");
        values.push(Box::new(min_date));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    values.push(Box::new(filter.limit as i64));

    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM screenshots {where_sql} ORDER BY created_at DESC, id DESC LIMIT ?"
    ))?;
    let records = stmt
        .query_map(params_from_iter(values.iter()), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn count(conn: &Connection) -> Result<i64, AppError> {
    let total = conn.query_row("SELECT COUNT(*) FROM screenshots", [], |row| row.get(0))?;
    Ok(total)
}

fn top_by_column(conn: &Connection, column: &str, limit: usize) -> Result<Vec<LabelCount>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(id) AS total FROM screenshots
         GROUP BY {column} ORDER BY total DESC, {column} ASC LIMIT ?1"
    ))?;
    let counts = stmt
        .query_map(params![limit as i64], |row| {
            Ok(LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(counts)
}

pub fn top_categories(conn: &Connection, limit: usize) -> Result<Vec<LabelCount>, AppError> {
    top_by_column(conn, "category", limit)
}

pub fn top_apps(conn: &Connection, limit: usize) -> Result<Vec<LabelCount>, AppError> {
    top_by_column(conn, "app_name", limit)
}

// Needed for rusqlite optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
