use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::error::AppError;

pub const SUMMARY_WORDS: usize = 15;
pub const FALLBACK_WORDS: usize = 5;
pub const MIN_MODEL_WORDS: usize = 20;
pub const MAX_FRAGMENT_CHARS: usize = 50;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "let", "may", "she", "that", "this",
    "with", "from", "they", "will", "would", "there", "their", "what", "when", "where", "which",
    "who", "why", "your", "been", "were", "into", "than", "then", "them", "these", "those",
    "also", "just", "more", "some", "such", "only", "over", "very", "about", "after", "before",
];

/// Abstractive summarizer backend.
pub trait SummaryModel: Send + Sync {
    fn summarize(&self, text: &str, max_words: usize) -> Result<String, AppError>;
}

/// Runs an external command with the text on stdin and reads the summary from stdout.
pub struct CommandSummaryModel {
    program: String,
    args: Vec<String>,
}

impl CommandSummaryModel {
    pub fn from_command_line(command_line: &str) -> Result<Self, AppError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| AppError::Config("summarizer command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl SummaryModel for CommandSummaryModel {
    fn summarize(&self, text: &str, max_words: usize) -> Result<String, AppError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("SHOTWISE_SUMMARY_WORDS", max_words.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(AppError::General(format!(
                "summarizer exited with {}",
                output.status
            )));
        }

        let summary = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if summary.is_empty() {
            return Err(AppError::General("summarizer produced no output".to_string()));
        }
        Ok(summary.split_whitespace().take(max_words).collect::<Vec<_>>().join(" "))
    }
}

type ModelFactory = Box<dyn Fn() -> Result<Box<dyn SummaryModel>, AppError> + Send + Sync>;

/// Builds the summary model on first use and remembers the outcome, including failure.
pub struct ModelSlot {
    factory: ModelFactory,
    model: OnceLock<Option<Box<dyn SummaryModel>>>,
}

impl ModelSlot {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn SummaryModel>, AppError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            model: OnceLock::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self::new(|| Err(AppError::General("no summarizer configured".to_string())))
    }

    pub fn from_command(command_line: Option<String>) -> Self {
        match command_line {
            Some(command_line) => Self::new(move || {
                let model = CommandSummaryModel::from_command_line(&command_line)?;
                Ok(Box::new(model) as Box<dyn SummaryModel>)
            }),
            None => Self::unavailable(),
        }
    }

    pub fn get(&self) -> Option<&dyn SummaryModel> {
        self.model
            .get_or_init(|| match (self.factory)() {
                Ok(model) => Some(model),
                Err(e) => {
                    debug!("summary model unavailable: {e}");
                    None
                }
            })
            .as_deref()
    }
}

/// Produces a short digest, preferring the model and falling back to keywords.
pub fn summarize(slot: &ModelSlot, text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    if text.split_whitespace().count() >= MIN_MODEL_WORDS {
        if let Some(model) = slot.get() {
            match model.summarize(text, SUMMARY_WORDS) {
                Ok(summary) => return summary,
                Err(e) => warn!("summary model failed, using keywords: {e}"),
            }
        }
    }

    extractive_summary(text, FALLBACK_WORDS)
}

pub fn extractive_summary(text: &str, max_words: usize) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 2 && !STOP_WORDS.contains(token))
        .take(max_words)
        .collect::<Vec<_>>()
        .join("_")
}

/// Reduces arbitrary text to a filename-safe fragment joined with `_`.
pub fn sanitize_fragment(text: &str, max_chars: usize) -> String {
    let replaced: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    let mut cleaned = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() > max_chars {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        cleaned = match truncated.rfind(' ') {
            Some(idx) if truncated[..idx].chars().count() > max_chars / 2 => {
                truncated[..idx].to_string()
            }
            _ => truncated,
        };
    }

    collapse_separators(&cleaned.replace(' ', "_"))
}

/// Collapses runs of `_` into one and trims them from both ends.
pub fn collapse_separators(value: &str) -> String {
    value
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedModel(&'static str);

    impl SummaryModel for FixedModel {
        fn summarize(&self, _text: &str, _max_words: usize) -> Result<String, AppError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenModel;

    impl SummaryModel for BrokenModel {
        fn summarize(&self, _text: &str, _max_words: usize) -> Result<String, AppError> {
            Err(AppError::General("model crashed".to_string()))
        }
    }

    fn long_text() -> String {
        "the quarterly revenue report shows growth across every region and the team \
         expects further expansion next year with new product launches planned soon"
            .to_string()
    }

    #[test]
    fn extractive_drops_stop_words_and_short_tokens() {
        let summary = extractive_summary("The cat is on the big red mat in Paris", 5);
        assert_eq!(summary, "cat_big_red_mat_paris");
    }

    #[test]
    fn extractive_never_fails() {
        for input in ["", "   ", "!!!", "a b c", "日本語のテキスト", "\u{0}\u{1}"] {
            let _ = extractive_summary(input, FALLBACK_WORDS);
        }
        assert_eq!(extractive_summary("", FALLBACK_WORDS), "");
    }

    #[test]
    fn short_text_skips_model() {
        let slot = ModelSlot::new(|| Ok(Box::new(FixedModel("model says hi")) as Box<dyn SummaryModel>));
        assert_eq!(summarize(&slot, "compile error in main"), "compile_error_main");
    }

    #[test]
    fn long_text_uses_model() {
        let slot = ModelSlot::new(|| Ok(Box::new(FixedModel("revenue growth")) as Box<dyn SummaryModel>));
        assert_eq!(summarize(&slot, &long_text()), "revenue growth");
    }

    #[test]
    fn failing_model_falls_back() {
        let slot = ModelSlot::new(|| Ok(Box::new(BrokenModel) as Box<dyn SummaryModel>));
        assert_eq!(
            summarize(&slot, &long_text()),
            "quarterly_revenue_report_shows_growth"
        );
    }

    #[test]
    fn factory_runs_once_even_when_unavailable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let slot = ModelSlot::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AppError::General("no model".to_string()))
        });

        for _ in 0..3 {
            assert_eq!(summarize(&slot, &long_text()), "quarterly_revenue_report_shows_growth");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_text_summarizes_to_nothing() {
        assert_eq!(summarize(&ModelSlot::unavailable(), "  "), "");
    }

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(
            sanitize_fragment("main.rs — shotwise (Workspace)", 50),
            "main_rs_shotwise_Workspace"
        );
        assert_eq!(sanitize_fragment("  __a__  b  ", 50), "a_b");
        assert_eq!(sanitize_fragment("", 50), "");
    }

    #[test]
    fn sanitize_breaks_on_word_boundary_past_midpoint() {
        let fragment = sanitize_fragment("alpha beta gamma delta epsilon", 20);
        assert_eq!(fragment, "alpha_beta_gamma");
    }

    #[test]
    fn sanitize_hard_cuts_when_boundary_is_early() {
        let fragment = sanitize_fragment("ab supercalifragilisticexpialidocious", 20);
        assert_eq!(fragment, "ab_supercalifragilis");
    }

    #[test]
    fn command_model_rejects_empty_command() {
        assert!(CommandSummaryModel::from_command_line("   ").is_err());
    }
}
