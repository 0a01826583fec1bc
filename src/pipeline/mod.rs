//! Pipeline stages for replacing the opening pages of a PDF.
//!
//! Each submodule implements exactly one step; [`crate::process`] wires
//! them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document ──▶ classify ──▶ extract ──▶ rewrite ──▶ postprocess ──▶ render ──▶ document ──▶ merge
//! (check)   (count)      (page 1)     (text/OCR)   (LLM)      (cleanup)       (soffice)   (splice)     (pdfunite)
//! ```
//!
//! * [`input`]    — existence, permission and `%PDF` checks
//! * [`document`] — page counting and tail splicing in-process via `lopdf`
//! * [`classify`] — scanned-vs-text verdict from a page-1 sample
//! * [`extract`]  — direct text extraction or rasterise + OCR
//! * [`rewrite`]  — the single AI round trip; the only stage with network I/O
//! * [`postprocess`] — deterministic cleanup of the model's HTML
//! * [`render`]   — wrap the fragment in a document and convert it to PDF
//! * [`merge`]    — concatenate rendered pages and tail, publish the output
//! * [`tools`]    — the external binaries behind the [`tools::Toolchain`] seam

pub mod classify;
pub mod document;
pub mod extract;
pub mod input;
pub mod merge;
pub mod postprocess;
pub mod render;
pub mod rewrite;
pub mod tools;
