//! Scanned-vs-text classification of the input document.
//!
//! A PDF whose pages are image scans has no text layer, so `pdftotext`
//! returns little or nothing for it. Sampling page 1 is a cheap proxy: if
//! the extractor fails or yields fewer than [`ScanPolicy::min_words`] words
//! the document goes down the OCR path.
//!
//! The heuristic is fuzzy by nature. A misclassification degrades the
//! quality of the rewrite but never fails the run, which is why
//! classification returns a [`Verdict`] rather than a `Result`.

use crate::error::ToolError;
use crate::pipeline::tools::Toolchain;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// How the first N pages will be turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// A usable text layer exists; extract it directly.
    Text,
    /// Image-only pages; rasterise and OCR.
    Scanned,
}

impl Verdict {
    /// Human-readable extraction method, used in logs and errors.
    pub fn method(self) -> &'static str {
        match self {
            Verdict::Text => "Direct",
            Verdict::Scanned => "OCR",
        }
    }
}

/// Word-count threshold deciding [`Verdict::Scanned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPolicy {
    /// Page 1 must yield at least this many words to count as text.
    pub min_words: usize,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self { min_words: 20 }
    }
}

impl ScanPolicy {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    /// Classify from the result of extracting page 1.
    ///
    /// A binary that cannot be found at all says nothing about the document,
    /// so it yields [`Verdict::Text`]; the direct extractor then reports the
    /// missing tool as a proper extraction failure.
    pub fn classify(&self, sample: &Result<String, ToolError>) -> Verdict {
        match sample {
            Ok(text) => {
                let words = text.split_whitespace().count();
                debug!("Page 1 sample: {} words (threshold {})", words, self.min_words);
                if words < self.min_words {
                    Verdict::Scanned
                } else {
                    Verdict::Text
                }
            }
            Err(e) if e.is_missing_binary() => {
                warn!("Scan check skipped: {}", e);
                Verdict::Text
            }
            Err(e) => {
                debug!("Page 1 extraction failed, assuming scanned: {}", e);
                Verdict::Scanned
            }
        }
    }
}

/// Sample page 1 of `pdf` through `tools` and classify it.
pub async fn classify_document(tools: &dyn Toolchain, pdf: &Path, policy: ScanPolicy) -> Verdict {
    let sample = tools.extract_text(pdf, 1, 1).await;
    policy.classify(&sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn words(n: usize) -> String {
        vec!["lorem"; n].join(" ")
    }

    #[test]
    fn enough_words_is_text() {
        let policy = ScanPolicy::default();
        assert_eq!(policy.classify(&Ok(words(20))), Verdict::Text);
        assert_eq!(policy.classify(&Ok(words(250))), Verdict::Text);
    }

    #[test]
    fn few_words_is_scanned() {
        let policy = ScanPolicy::default();
        assert_eq!(policy.classify(&Ok(words(19))), Verdict::Scanned);
        assert_eq!(policy.classify(&Ok("\n\x0c\n".into())), Verdict::Scanned);
    }

    #[test]
    fn threshold_is_pluggable() {
        let policy = ScanPolicy::new(3);
        assert_eq!(policy.classify(&Ok("one two three".into())), Verdict::Text);
        assert_eq!(policy.classify(&Ok("one two".into())), Verdict::Scanned);
    }

    #[test]
    fn extractor_failure_is_scanned() {
        let sample = Err(ToolError::Exit {
            program: PathBuf::from("pdftotext"),
            status: "exit status: 1".into(),
            stderr: "Syntax Error: Couldn't find trailer dictionary".into(),
        });
        assert_eq!(ScanPolicy::default().classify(&sample), Verdict::Scanned);
    }

    #[test]
    fn missing_extractor_is_text() {
        let sample = Err(ToolError::NotFound {
            program: PathBuf::from("pdftotext"),
        });
        assert_eq!(ScanPolicy::default().classify(&sample), Verdict::Text);
    }
}
