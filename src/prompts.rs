//! Instruction text for the AI rewrite.
//!
//! Callers can override the default via
//! [`crate::config::RewriteConfig::rewrite_prompt`]; [`REWRITE_PROMPT`] is
//! used only when no override is provided.

/// Default instruction sent ahead of the extracted text.
///
/// It asks for an HTML *fragment*: the pipeline wraps the fragment in its own
/// document shell before rendering, so the model must not emit `<html>`,
/// `<head>` or `<body>` itself.
pub const REWRITE_PROMPT: &str = r#"Rewrite the following text, intelligently structuring it with HTML to improve readability. Format the output as clean HTML body content.

Follow these rules precisely:

1. Use heading tags (<h1>, <h2>, <h3>) for titles and section headings.
2. Use <strong> for key terms and important phrases.
3. Wrap each paragraph in <p> tags.
4. Use <ul> or <ol> with <li> for any lists.
5. Use <br> only for line breaks that carry meaning, such as in addresses.
6. Preserve the meaning and all factual content of the original text.

VERY IMPORTANT: Do NOT include <html>, <head>, or <body> tags. Do NOT wrap the output in Markdown code fences. Output only the HTML content itself.

Here is the text:
"#;

/// Build the single user message sent to the provider: instruction, then text.
pub fn build_rewrite_request(instruction: &str, text: &str) -> String {
    let mut request = String::with_capacity(instruction.len() + text.len() + 1);
    request.push_str(instruction);
    if !instruction.is_empty() && !instruction.ends_with('\n') {
        request.push('\n');
    }
    request.push_str(text);
    request
}
