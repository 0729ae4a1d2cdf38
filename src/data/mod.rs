pub mod migrations;
pub mod repository;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::AppError;

/// Opens (creating if needed) the screenshot catalog and brings its schema up to date.
pub fn open_database(db_path: &Path) -> Result<Connection, AppError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}
