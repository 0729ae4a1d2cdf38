#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    General(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Context error: {0}")]
    Context(String),

    #[error("Watcher error: {0}")]
    Watcher(String),
}

impl From<notify::Error> for AppError {
    fn from(err: notify::Error) -> Self {
        AppError::Watcher(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
