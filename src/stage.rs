//! Run states of the page-replacement pipeline.
//!
//! ```text
//! Init ─▶ Counted ─▶ Extracted ─▶ Rewritten ─▶ Rendered ─┬─▶ Spliced ─┬─▶ Merged ─▶ Done
//!                                                         └────────────┘
//!   any state ─▶ Failed
//! ```
//!
//! `Spliced` is skipped when the document has no pages past the rewritten
//! ones. Every transition is attempted exactly once per run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A state of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    /// Page count known and non-zero.
    Counted,
    /// Plain text of the first N pages available.
    Extracted,
    /// AI-restructured markup available.
    Rewritten,
    /// Replacement pages rendered to PDF.
    Rendered,
    /// Original pages N+1..end written to a standalone PDF.
    Spliced,
    /// Final output assembled.
    Merged,
    Done,
    Failed,
}

impl Stage {
    /// The state reached after this one succeeds.
    ///
    /// `has_tail` selects whether `Rendered` continues through `Spliced`.
    /// Terminal states return themselves.
    pub fn next(self, has_tail: bool) -> Stage {
        match self {
            Stage::Init => Stage::Counted,
            Stage::Counted => Stage::Extracted,
            Stage::Extracted => Stage::Rewritten,
            Stage::Rewritten => Stage::Rendered,
            Stage::Rendered if has_tail => Stage::Spliced,
            Stage::Rendered | Stage::Spliced => Stage::Merged,
            Stage::Merged => Stage::Done,
            Stage::Done => Stage::Done,
            Stage::Failed => Stage::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Short label used in logs and progress output.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Counted => "count pages",
            Stage::Extracted => "extract text",
            Stage::Rewritten => "AI rewrite",
            Stage::Rendered => "render PDF",
            Stage::Spliced => "splice tail",
            Stage::Merged => "merge",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(has_tail: bool) -> Vec<Stage> {
        let mut s = Stage::Init;
        let mut seen = vec![s];
        while !s.is_terminal() {
            s = s.next(has_tail);
            seen.push(s);
        }
        seen
    }

    #[test]
    fn long_document_visits_splice() {
        assert_eq!(
            walk(true),
            vec![
                Stage::Init,
                Stage::Counted,
                Stage::Extracted,
                Stage::Rewritten,
                Stage::Rendered,
                Stage::Spliced,
                Stage::Merged,
                Stage::Done,
            ]
        );
    }

    #[test]
    fn short_document_skips_splice() {
        let stages = walk(false);
        assert!(!stages.contains(&Stage::Spliced));
        assert_eq!(stages.last(), Some(&Stage::Done));
    }

    #[test]
    fn failed_is_absorbing() {
        assert_eq!(Stage::Failed.next(true), Stage::Failed);
        assert!(Stage::Failed.is_terminal());
    }
}
