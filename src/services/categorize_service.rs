use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::error::AppError;
use crate::models::screenshot::UNCATEGORIZED;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Code",
        &[
            "vscode", "pycharm", "sublime", "intellij", "eclipse", "code", "python",
            "javascript", "java", "c++", "github", "git",
        ],
    ),
    (
        "Errors",
        &[
            "error", "exception", "fail", "crash", "bug", "traceback", "warning", "issue",
            "problem",
        ],
    ),
    (
        "Tutorials",
        &[
            "tutorial", "guide", "how to", "example", "walkthrough", "learning", "lesson",
            "course",
        ],
    ),
    (
        "Chats",
        &[
            "slack", "discord", "teams", "whatsapp", "telegram", "message", "chat",
            "conversation",
        ],
    ),
    (
        "Documents",
        &[
            "pdf", "word", "excel", "powerpoint", "doc", "xls", "ppt", "spreadsheet",
            "presentation",
        ],
    ),
    (
        "Media",
        &[
            "image", "photo", "screenshot", "picture", "video", "screencast", "recording",
        ],
    ),
];

/// Keyword vocabulary per category, kept in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    entries: Vec<(String, Vec<String>)>,
}

impl CategoryTable {
    pub fn builtin() -> Self {
        Self {
            entries: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, keywords)| {
                    (
                        name.to_string(),
                        keywords.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn from_entries(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// Parses a JSON object of `{"Category": ["keyword", ...]}` preserving key order.
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut entries = Vec::with_capacity(map.len());
        for (name, value) in map {
            let keywords: Vec<String> = serde_json::from_value(value)?;
            entries.push((name, keywords));
        }
        Ok(Self { entries })
    }

    /// Loads a table from disk, falling back to the built-in table when the
    /// file cannot be read or parsed.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };

        let loaded = std::fs::read_to_string(path)
            .map_err(AppError::from)
            .and_then(|raw| Self::from_json(&raw));
        match loaded {
            Ok(table) => table,
            Err(e) => {
                warn!("could not load categories from {}: {e}", path.display());
                Self::builtin()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    table: CategoryTable,
}

fn token_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
    {
        *counts.entry(token.to_string()).or_insert(0) += 1;
    }
    counts
}

impl Categorizer {
    pub fn new(table: CategoryTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Fraction of the category's keywords that appear as whole tokens.
    fn match_score(features: &HashMap<String, usize>, keywords: &[String]) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }
        let matches = keywords
            .iter()
            .filter(|kw| features.get(&kw.to_lowercase()).is_some_and(|count| *count > 0))
            .count();
        matches as f64 / keywords.len() as f64
    }

    /// Picks the best-scoring category. Ties go to the category declared first.
    pub fn categorize(
        &self,
        text: &str,
        app_name: &str,
        window_title: &str,
        min_confidence: f64,
    ) -> (String, f64) {
        let combined = format!("{app_name} {window_title} {text}").to_lowercase();
        let features = token_counts(&combined);

        let mut best: Option<(&str, f64)> = None;
        for (name, keywords) in &self.table.entries {
            let score = Self::match_score(&features, keywords);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name.as_str(), score));
            }
        }

        match best {
            Some((name, score)) if score >= min_confidence && score > 0.0 => {
                (name.to_string(), score)
            }
            _ => (UNCATEGORIZED.to_string(), 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categorizer() -> Categorizer {
        Categorizer::new(CategoryTable::builtin())
    }

    #[test]
    fn empty_input_is_uncategorized() {
        let (category, score) = categorizer().categorize("", "", "", DEFAULT_MIN_CONFIDENCE);
        assert_eq!(category, UNCATEGORIZED);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn error_text_lands_in_errors() {
        let (category, score) = categorizer().categorize(
            "Traceback: error exception raised",
            "",
            "",
            DEFAULT_MIN_CONFIDENCE,
        );
        assert_eq!(category, "Errors");
        assert!(score >= 0.3);
        assert!((score - 3.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_keywords_do_not_inflate_score() {
        let once = categorizer().categorize("error exception traceback", "", "", 0.0);
        let many = categorizer().categorize(
            "error error error exception exception traceback traceback",
            "",
            "",
            0.0,
        );
        assert_eq!(once, many);
    }

    #[test]
    fn app_and_title_contribute() {
        let (category, _) = categorizer().categorize(
            "",
            "slack",
            "discord chat message",
            DEFAULT_MIN_CONFIDENCE,
        );
        assert_eq!(category, "Chats");
    }

    #[test]
    fn below_threshold_is_uncategorized() {
        let (category, score) =
            categorizer().categorize("one python file", "", "", DEFAULT_MIN_CONFIDENCE);
        assert_eq!(category, UNCATEGORIZED);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn tokens_match_whole_words_only() {
        let table = CategoryTable::from_entries(vec![(
            "Errors".to_string(),
            vec!["error".to_string()],
        )]);
        let (category, _) = Categorizer::new(table).categorize("errors everywhere", "", "", 0.3);
        assert_eq!(category, UNCATEGORIZED);
    }

    #[test]
    fn ties_go_to_first_declared_category() {
        let table = CategoryTable::from_entries(vec![
            ("Alpha".to_string(), vec!["shared".to_string()]),
            ("Beta".to_string(), vec!["shared".to_string()]),
        ]);
        let categorizer = Categorizer::new(table);
        for _ in 0..10 {
            assert_eq!(
                categorizer.categorize("shared", "", "", 0.3),
                ("Alpha".to_string(), 1.0)
            );
        }
    }

    #[test]
    fn empty_table_is_uncategorized() {
        let categorizer = Categorizer::new(CategoryTable::from_entries(Vec::new()));
        assert_eq!(
            categorizer.categorize("error exception", "", "", 0.0),
            (UNCATEGORIZED.to_string(), 0.0)
        );
    }

    #[test]
    fn category_without_keywords_scores_zero() {
        let table = CategoryTable::from_entries(vec![("Empty".to_string(), Vec::new())]);
        assert_eq!(
            Categorizer::new(table).categorize("anything", "", "", 0.0),
            (UNCATEGORIZED.to_string(), 0.0)
        );
    }

    #[test]
    fn scores_stay_within_unit_interval() {
        let categorizer = categorizer();
        let samples = [
            "vscode pycharm sublime intellij eclipse code python javascript java github git",
            "pdf word excel",
            "random words",
        ];
        for sample in samples {
            let (_, score) = categorizer.categorize(sample, "", "", 0.0);
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn json_table_preserves_order() {
        let table =
            CategoryTable::from_json(r#"{"Zeta": ["z"], "Alpha": ["a"], "Mid": ["m"]}"#).unwrap();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn keywords_are_case_folded() {
        let table = CategoryTable::from_json(r#"{"Games": ["Steam"]}"#).unwrap();
        let (category, score) = Categorizer::new(table).categorize("STEAM library", "", "", 0.3);
        assert_eq!(category, "Games");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn unreadable_table_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("categories.json");
        std::fs::write(&broken, "{not json").unwrap();

        assert_eq!(
            CategoryTable::load_or_builtin(Some(&broken)),
            CategoryTable::builtin()
        );
        assert_eq!(
            CategoryTable::load_or_builtin(Some(&dir.path().join("missing.json"))),
            CategoryTable::builtin()
        );
    }

    #[test]
    fn custom_table_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.json");
        std::fs::write(&path, r#"{"Finance": ["invoice", "receipt"]}"#).unwrap();

        let table = CategoryTable::load_or_builtin(Some(&path));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Finance"]);
    }
}
