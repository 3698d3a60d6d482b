//! Prompt text for note generation.
//!
//! Callers can override the default via
//! [`crate::config::GenerationConfig::prompt_template`]; the constant here is
//! used only when no override is provided.

/// Placeholder replaced with the page text.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default note-taking prompt. `{text}` is substituted verbatim.
pub const DEFAULT_NOTES_PROMPT: &str = r#"Transform the following text into detailed, well-structured notes. Maintain the original content's depth while making it easier to understand. Use clear explanations and simple language where possible, but keep all important information:

{text}

Guidelines for notes generation:
- Keep maximum information from the source text
- Maintain the original content's depth and detail
- Use clear section headings with <h2> tags
- Break down complex concepts into digestible parts
- Use bullet points (<ul> and <li>) for better readability
- Highlight key terms with <strong> tags
- Explain Difficult terms in simpler language using brackets '()' 
- Organize content logically with proper hierarchy
- Use examples where they help clarify concepts
- Keep formulas, cycles, flowcharts, tables etc as it is
- Include all relevant details, dates, numbers, and specific information"#;

/// Fill the template with `text`.
///
/// Only the first placeholder is replaced, so page text that itself contains
/// `{text}` is embedded untouched.
pub fn render_prompt(template: &str, text: &str) -> String {
    template.replacen(TEXT_PLACEHOLDER, text, 1)
}

/// Label prepended to a page's recognized text before note generation.
pub fn page_input(page_num: usize, recognized: &str) -> String {
    format!("Page {page_num}:\n{recognized}")
}
