//! Rewrites a rendered resume into a self-contained document the rasterizer
//! can read from a single content root.
//!
//! The rasterizer only walks `<body>`, so every `<style>` and stylesheet
//! `<link>` in `<head>` is moved, in document order, into a wrapper element at
//! the top of the body. A reset rule goes first so inherited surface styling
//! is neutralized and the template's own rules still win on equal
//! specificity. A `<base>` stays in the head so relative URLs keep resolving.

use std::sync::OnceLock;

use regex::Regex;

use crate::export::page::{PageConfig, PaginationMode};

/// Attribute marking the wrapper every hoisted style and body node lives in.
pub const EXPORT_ROOT_ATTR: &str = "data-export-root";

const RESET_RULE: &str = "<style>* { all: revert; }</style>";

const AVOID_BREAKS_RULE: &str = "<style>[data-export-root] > *, [data-export-root] section, \
[data-export-root] li, [data-export-root] tr { break-inside: avoid; page-break-inside: avoid; }</style>";

fn head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<head\b[^>]*>(.*?)</head\s*>").expect("static regex"))
}

/// `<style>` blocks and `<link>` tags, in one pass so order survives.
fn style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>|<link\b[^>]*>").expect("static regex")
    })
}

fn stylesheet_rel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\brel\s*=\s*["']?[^"'>]*\bstylesheet\b"#).expect("static regex")
    })
}

fn base_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<base\b[^>]*>").expect("static regex"))
}

fn body_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").expect("static regex"))
}

/// Document scaffolding stripped when the template has no `<body>`.
fn scaffold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<!doctype[^>]*>|</?html\b[^>]*>|</?body\b[^>]*>").expect("static regex")
    })
}

fn head_inner(html: &str) -> Option<&str> {
    head_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|head| head.as_str())
}

/// Head `<style>` blocks and stylesheet `<link>`s in document order, markup
/// included. Other links (icons, preloads) are dropped.
pub fn head_styles(html: &str) -> Vec<&str> {
    head_inner(html)
        .map(|head| {
            style_re()
                .find_iter(head)
                .map(|m| m.as_str())
                .filter(|tag| {
                    let is_link = tag.get(..5).is_some_and(|t| t.eq_ignore_ascii_case("<link"));
                    !is_link || stylesheet_rel_re().is_match(tag)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The head's `<base>` element, if any.
pub fn head_base(html: &str) -> Option<&str> {
    head_inner(html).and_then(|head| base_re().find(head).map(|m| m.as_str()))
}

fn body_content(html: &str) -> String {
    if let Some(inner) = body_re().captures(html).and_then(|c| c.get(1)) {
        return inner.as_str().to_string();
    }
    let without_head = head_re().replace(html, "");
    scaffold_re().replace_all(&without_head, "").into_owned()
}

/// Builds the isolated document: a head with only the charset and any
/// `<base>`, and a body holding one content root with the reset, the hoisted
/// styles, an optional break-avoidance rule and the untouched body markup, in
/// that order.
pub fn isolate_document(html: &str, page: &PageConfig) -> String {
    let base = head_base(html).unwrap_or_default();
    let styles = head_styles(html).join("\n");
    let body = body_content(html);
    let pagination = match page.pagination {
        PaginationMode::AvoidAll => AVOID_BREAKS_RULE,
        PaginationMode::Css => "",
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">{base}</head>\n\
<body style=\"margin: 0; padding: 0; background: white;\">\n\
<div {EXPORT_ROOT_ATTR} style=\"display: block; background: white; color: #333;\">\n\
{RESET_RULE}\n{styles}\n{pagination}\n{body}\n</div>\n</body>\n</html>\n"
    )
}
