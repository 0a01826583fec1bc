//! Serialisable summaries of a run, for callers and for `--json`.

use crate::pipeline::classify::Verdict;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

/// Outcome of a successful [`crate::process`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Pages in the input document.
    pub page_count: usize,
    /// Leading pages that were replaced: `min(N, page_count)`.
    pub pages_rewritten: usize,
    /// Pages produced by the renderer for the rewritten content.
    pub rendered_pages: usize,
    /// Original pages carried over unchanged.
    pub tail_pages: usize,
    pub verdict: Verdict,
    pub extracted_chars: usize,
    pub markup_chars: usize,
    pub output_bytes: u64,
    /// Token usage as reported by the provider; 0 when unknown.
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub stages: Vec<StageTiming>,
    pub total_duration_ms: u64,
}

/// Result of [`crate::inspect`]: what a run would do, without doing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectReport {
    pub input: PathBuf,
    pub page_count: usize,
    pub verdict: Verdict,
    pub pages_to_process: usize,
    /// `true` when pages past N exist and would be spliced back on.
    pub has_tail: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serialises_snake_case_stages() {
        let report = InspectReport {
            input: "in.pdf".into(),
            page_count: 5,
            verdict: Verdict::Scanned,
            pages_to_process: 2,
            has_tail: true,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["verdict"], "scanned");
        assert_eq!(json["has_tail"], true);

        let timing = serde_json::to_value(StageTiming {
            stage: Stage::Spliced,
            duration_ms: 12,
        })
        .unwrap();
        assert_eq!(timing["stage"], "spliced");
    }
}
