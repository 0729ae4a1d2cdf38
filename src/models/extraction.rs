/// Outcome of running text extraction over one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Text {
        text: String,
        confidence: Option<f64>,
    },
    Unavailable(String),
    Failed(String),
}

impl Extraction {
    /// Recognised text, if any was found.
    pub fn text(&self) -> Option<&str> {
        match self {
            Extraction::Text { text, .. } if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            Extraction::Text { confidence, .. } if self.text().is_some() => *confidence,
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Extraction::Text { text, .. } if text.trim().is_empty() => "no text detected".to_string(),
            Extraction::Text { text, .. } => format!("{} chars", text.chars().count()),
            Extraction::Unavailable(reason) => format!("unavailable ({reason})"),
            Extraction::Failed(reason) => format!("failed ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_counts_as_no_text() {
        let extraction = Extraction::Text {
            text: "  \n".to_string(),
            confidence: Some(0.8),
        };
        assert_eq!(extraction.text(), None);
        assert_eq!(extraction.confidence(), None);
    }

    #[test]
    fn failures_carry_no_text() {
        assert_eq!(Extraction::Failed("boom".into()).text(), None);
        assert_eq!(Extraction::Unavailable("missing".into()).text(), None);
    }

    #[test]
    fn text_exposes_confidence() {
        let extraction = Extraction::Text {
            text: "hello".to_string(),
            confidence: Some(0.75),
        };
        assert_eq!(extraction.text(), Some("hello"));
        assert_eq!(extraction.confidence(), Some(0.75));
    }
}
