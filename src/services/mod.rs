pub mod categorize_service;
pub mod context_service;
pub mod file_service;
pub mod ingest_service;
pub mod naming_service;
pub mod ocr_service;
pub mod summarize_service;
pub mod watch_service;
