use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Foreground window at the moment a capture was ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowContext {
    pub title: String,
    pub app: String,
}

impl WindowContext {
    pub fn unknown() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            app: UNKNOWN.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.title == UNKNOWN && self.app == UNKNOWN
    }
}
