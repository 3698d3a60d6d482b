//! Response formatting: markdown-flavoured model output → display HTML.
//!
//! The generative upstream is asked for HTML but routinely answers with
//! markdown headings, bullets and `**bold**`. These rules convert those
//! tokens so the editor shows structure instead of asterisks.
//!
//! ## Rule Order
//!
//! Each rule consumes the previous rule's output. Headings and list items
//! are converted before list wrapping so the wrapper sees `<li>` lines; bold
//! runs after list conversion so a `**` at line start is never mistaken for
//! a `* ` bullet; spacing is added last and then normalised.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Convert raw generated text to HTML.
///
/// Rules (applied in order):
/// 1. Collapse 3+ newlines to 2
/// 2. `# `, `## `, `### ` at line start → `<h1>`–`<h3>`
/// 3. `* ` or `- ` at line start → `<li>`
/// 4. Wrap each run of consecutive `<li>` lines in one `<ul>`
/// 5. `**text**` → `<strong>text</strong>`
/// 6. Newline after `</h1>`, `</h2>`, `</h3>`, `</ul>`
/// 7. Collapse 3+ newlines to 2 and runs of spaces to one
/// 8. Trim
pub fn format_response(raw: &str) -> String {
    let s = collapse_newlines(raw);
    let s = convert_headings(&s);
    let s = convert_list_items(&s);
    let s = wrap_list_runs(&s);
    let s = convert_bold(&s);
    let s = space_block_ends(&s);
    let s = collapse_newlines(&s);
    let s = collapse_spaces(&s);
    s.trim().to_string()
}

// ── Rules 1 & 7: newline and space collapsing ───────────────────────────────

static RE_EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_EXTRA_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

fn collapse_newlines(input: &str) -> String {
    RE_EXTRA_NEWLINES.replace_all(input, "\n\n").into_owned()
}

fn collapse_spaces(input: &str) -> String {
    RE_EXTRA_SPACES.replace_all(input, " ").into_owned()
}

// ── Rule 2: headings ────────────────────────────────────────────────────────

static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.*)$").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.*)$").unwrap());
static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### (.*)$").unwrap());

fn convert_headings(input: &str) -> String {
    let s = RE_H1.replace_all(input, "<h1>${1}</h1>");
    let s = RE_H2.replace_all(&s, "<h2>${1}</h2>");
    RE_H3.replace_all(&s, "<h3>${1}</h3>").into_owned()
}

// ── Rule 3: list items ──────────────────────────────────────────────────────

static RE_STAR_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\* (.*)$").unwrap());
static RE_DASH_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- (.*)$").unwrap());

fn convert_list_items(input: &str) -> String {
    let s = RE_STAR_ITEM.replace_all(input, "<li>${1}</li>");
    RE_DASH_ITEM.replace_all(&s, "<li>${1}</li>").into_owned()
}

// ── Rule 4: wrap list runs ──────────────────────────────────────────────────
//
// The optional `<ul>` / `</ul>` around the run let us see whether the run is
// already wrapped; a wrapped run is returned unchanged so formatting our own
// output is a no-op.

static RE_LIST_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(<ul>)?((?:<li>.*</li>\n?)+)(</ul>)?").unwrap());

fn wrap_list_runs(input: &str) -> String {
    RE_LIST_RUN
        .replace_all(input, |caps: &Captures<'_>| {
            let open = caps.get(1).map_or("", |m| m.as_str());
            let close = caps.get(3).map_or("", |m| m.as_str());
            if !open.is_empty() && !close.is_empty() {
                return caps[0].to_string();
            }
            format!("{open}<ul>{}</ul>{close}", &caps[2])
        })
        .into_owned()
}

// ── Rule 5: bold ────────────────────────────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

fn convert_bold(input: &str) -> String {
    RE_BOLD
        .replace_all(input, "<strong>${1}</strong>")
        .into_owned()
}

// ── Rule 6: spacing after block ends ────────────────────────────────────────

static RE_BLOCK_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"</h[123]>|</ul>").unwrap());

fn space_block_ends(input: &str) -> String {
    RE_BLOCK_END.replace_all(input, "${0}\n").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
