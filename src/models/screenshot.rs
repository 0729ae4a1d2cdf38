use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    pub id: i64,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_hash: String,
    pub category: Option<String>,
    pub app_name: Option<String>,
    pub window_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ocr_text: Option<String>,
    pub ocr_confidence: Option<f64>,
}

/// Field values for a record that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewScreenshot {
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_hash: String,
    pub category: Option<String>,
    pub app_name: Option<String>,
    pub window_title: Option<String>,
    pub ocr_text: Option<String>,
    pub ocr_confidence: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub query: Option<String>,
    pub category: Option<String>,
    pub app_name: Option<String>,
    pub min_date: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            query: None,
            category: None,
            app_name: None,
            min_date: None,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: Option<String>,
    pub count: i64,
}
