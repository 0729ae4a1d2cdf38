use std::path::Path;

use chrono::{DateTime, Local};

use crate::models::context::WindowContext;
use crate::services::context_service::simplified_app_name;
use crate::services::file_service::{MAX_NAME_BYTES, MAX_SUFFIX_CHARS};
use crate::services::summarize_service::{
    collapse_separators, sanitize_fragment, summarize, ModelSlot, MAX_FRAGMENT_CHARS,
};

pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 200;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const MIN_TEXT_FRAGMENT_CHARS: usize = 4;
const SEPARATOR: char = '_';

/// Builds descriptive, filesystem-safe file stems for captures.
pub struct FilenameSynthesizer {
    summarizer: ModelSlot,
    max_length: usize,
}

impl FilenameSynthesizer {
    pub fn new(summarizer: ModelSlot, max_length: usize) -> Self {
        Self {
            summarizer,
            max_length,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn synthesize(&self, file_path: &Path, context: &WindowContext, text: Option<&str>) -> String {
        self.synthesize_at(file_path, context, text, Local::now())
    }

    /// Extension-less stem for `file_path`, stamped with `now`.
    pub fn synthesize_at(
        &self,
        file_path: &Path,
        context: &WindowContext,
        text: Option<&str>,
        now: DateTime<Local>,
    ) -> String {
        let app_token = simplified_app_name(context);
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();

        let text_fragment = text
            .filter(|t| !t.trim().is_empty())
            .map(|t| sanitize_fragment(&summarize(&self.summarizer, t), MAX_FRAGMENT_CHARS))
            .unwrap_or_default();
        let title_fragment = sanitize_fragment(&context.title, MAX_FRAGMENT_CHARS);

        let mut parts = vec![app_token.clone()];
        if !title_fragment.is_empty()
            && !title_fragment
                .to_lowercase()
                .contains(&app_token.to_lowercase())
        {
            parts.push(title_fragment);
        }
        if text_fragment.chars().count() >= MIN_TEXT_FRAGMENT_CHARS {
            parts.push(text_fragment);
        }
        parts.push(timestamp.clone());

        let joined = parts.join(&SEPARATOR.to_string());
        let filename = clean_stem(&joined);

        let extension = file_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension_chars = if extension.is_empty() { 0 } else { extension.chars().count() + 1 };
        let extension_bytes = if extension.is_empty() { 0 } else { extension.len() + 1 };

        let mut max_chars = self.max_length.saturating_sub(extension_chars);
        let mut max_bytes = MAX_NAME_BYTES.saturating_sub(extension_bytes);
        // Leave room for a collision counter when the timestamp still fits.
        if max_chars.min(max_bytes) > timestamp.len() + 1 + MAX_SUFFIX_CHARS {
            max_chars -= MAX_SUFFIX_CHARS;
            max_bytes -= MAX_SUFFIX_CHARS;
        }
        truncate_keeping_timestamp(&filename, &timestamp, max_chars, max_bytes)
    }
}

/// Replaces every disallowed character with the separator and collapses runs.
fn clean_stem(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == SEPARATOR {
                c
            } else {
                SEPARATOR
            }
        })
        .collect();
    collapse_separators(&replaced)
}

fn fits(value: &str, max_chars: usize, max_bytes: usize) -> bool {
    value.len() <= max_bytes && value.chars().count() <= max_chars
}

/// Shortens `filename` to both limits, keeping the trailing ASCII `timestamp`.
fn truncate_keeping_timestamp(
    filename: &str,
    timestamp: &str,
    max_chars: usize,
    max_bytes: usize,
) -> String {
    if fits(filename, max_chars, max_bytes) {
        return filename.to_string();
    }

    let limit = max_chars.min(max_bytes);
    if limit <= timestamp.len() + 1 {
        return timestamp.chars().take(limit).collect();
    }

    let char_budget = max_chars - timestamp.len() - 1;
    let byte_budget = max_bytes - timestamp.len() - 1;
    let mut head = String::new();
    for (count, c) in filename.chars().enumerate() {
        if count + 1 > char_budget || head.len() + c.len_utf8() > byte_budget {
            break;
        }
        head.push(c);
    }
    let head = match head.rfind(SEPARATOR) {
        Some(idx) if idx > 0 => head[..idx].to_string(),
        _ => head,
    };
    let head = collapse_separators(&head);
    if head.is_empty() {
        return timestamp.to_string();
    }
    format!("{head}{SEPARATOR}{timestamp}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn synthesizer() -> FilenameSynthesizer {
        FilenameSynthesizer::new(ModelSlot::unavailable(), DEFAULT_MAX_FILENAME_LENGTH)
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn context(app: &str, title: &str) -> WindowContext {
        WindowContext {
            title: title.to_string(),
            app: app.to_string(),
        }
    }

    fn is_allowed(c: char) -> bool {
        c.is_alphanumeric() || c == '-' || c == '_'
    }

    #[test]
    fn composes_app_title_text_and_timestamp() {
        let name = synthesizer().synthesize_at(
            Path::new("/shots/raw.png"),
            &context("firefox", "Rust Book"),
            Some("The borrow checker enforces ownership rules"),
            fixed_now(),
        );
        assert_eq!(
            name,
            "Firefox_Rust_Book_borrow_checker_enforces_ownership_rules_2024-03-09_14-05-07"
        );
    }

    #[test]
    fn redundant_title_is_omitted() {
        let name = synthesizer().synthesize_at(
            Path::new("/shots/raw.png"),
            &context("slack", "Slack general"),
            None,
            fixed_now(),
        );
        assert_eq!(name, "Slack_2024-03-09_14-05-07");
    }

    #[test]
    fn unknown_context_yields_app_and_timestamp() {
        let name = synthesizer().synthesize_at(
            Path::new("/shots/raw.png"),
            &WindowContext::unknown(),
            None,
            fixed_now(),
        );
        assert_eq!(name, "Unknown_2024-03-09_14-05-07");
    }

    #[test]
    fn short_text_fragment_is_skipped() {
        let name = synthesizer().synthesize_at(
            Path::new("/shots/raw.png"),
            &context("", ""),
            Some("ok go"),
            fixed_now(),
        );
        assert_eq!(name, "Screenshot_2024-03-09_14-05-07");
    }

    #[test]
    fn output_only_uses_safe_characters() {
        let name = synthesizer().synthesize_at(
            Path::new("/shots/raw.png"),
            &context("my/app.exe", "C:\\Users\\me\\*secret?* <draft> | \"quoted\""),
            Some("path/../../etc/passwd; rm -rf ~ && echo $HOME"),
            fixed_now(),
        );
        assert!(name.chars().all(is_allowed), "unexpected character in {name}");
        assert!(!name.starts_with('_') && !name.ends_with('_'));
        assert!(!name.contains("__"));
    }

    #[test]
    fn long_names_are_truncated_and_keep_timestamp() {
        let title = "word ".repeat(40);
        let text = "lengthy ".repeat(80);
        let synthesizer = FilenameSynthesizer::new(ModelSlot::unavailable(), 60);
        let name = synthesizer.synthesize_at(
            Path::new("/shots/raw.jpeg"),
            &context("terminal", &title),
            Some(&text),
            fixed_now(),
        );
        assert!(name.chars().count() + ".jpeg".len() <= 60, "{name} too long");
        assert!(name.ends_with("_2024-03-09_14-05-07"));
        assert!(name.starts_with("Terminal_"));
    }

    #[test]
    fn length_limit_holds_for_default_maximum() {
        let title = "a".repeat(300);
        let name = synthesizer().synthesize_at(
            Path::new("/shots/raw.png"),
            &context("editor", &format!("{title} {title}")),
            Some(&"tok ".repeat(500)),
            fixed_now(),
        );
        assert!(name.chars().count() + 4 <= DEFAULT_MAX_FILENAME_LENGTH);
    }

    #[test]
    fn tiny_limit_falls_back_to_timestamp() {
        let synthesizer = FilenameSynthesizer::new(ModelSlot::unavailable(), 24);
        let name = synthesizer.synthesize_at(
            Path::new("/shots/raw.png"),
            &context("browser", "very long window title here"),
            None,
            fixed_now(),
        );
        assert_eq!(name, "2024-03-09_14-05-07");
    }

    #[test]
    fn truncation_breaks_on_separator() {
        let out = truncate_keeping_timestamp("Alpha_Beta_Gamma_TS", "TS", 14, usize::MAX);
        assert_eq!(out, "Alpha_Beta_TS");
    }

    #[test]
    fn wide_characters_stay_within_byte_limit() {
        let title = "界".repeat(120);
        let text = "語彙語彙 ".repeat(60);
        let name = synthesizer().synthesize_at(
            Path::new("/shots/raw.png"),
            &context("editor", &title),
            Some(&text),
            fixed_now(),
        );
        assert!(name.len() + ".png".len() + MAX_SUFFIX_CHARS <= MAX_NAME_BYTES, "{} bytes", name.len());
        assert!(name.ends_with("_2024-03-09_14-05-07"));
    }

    #[test]
    fn collision_counter_fits_under_limit() {
        let synthesizer = FilenameSynthesizer::new(ModelSlot::unavailable(), 60);
        let name = synthesizer.synthesize_at(
            Path::new("/shots/raw.png"),
            &context("terminal", &"word ".repeat(40)),
            None,
            fixed_now(),
        );
        assert!(name.chars().count() + "_10000.png".len() <= 60, "{name} too long");
    }

    #[test]
    fn byte_budget_truncates_on_char_boundary() {
        let out = truncate_keeping_timestamp("ééééé_TS", "TS", 100, 8);
        assert_eq!(out, "éé_TS");
    }
}
