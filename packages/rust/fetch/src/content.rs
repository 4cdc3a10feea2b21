//! HTML reduction for browser-rendered pages.
//!
//! The browser backend returns full rendered HTML. This module strips page
//! chrome, converts the main content to markdown via `htmd`, and applies a
//! few cleanup passes so downstream extraction sees readable text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::backend::RenderedPage;

/// Pages shorter than this that mention sign-in phrases are treated as
/// login walls rather than real content.
const LOGIN_WALL_MAX_LEN: usize = 1200;

/// Phrases that mark a page as gated behind authentication.
const LOGIN_WALL_PHRASES: &[&str] = &[
    "log in to continue",
    "log in to facebook",
    "sign in to continue",
    "you must log in",
    "create an account to see",
    "join facebook to",
];

// ---------------------------------------------------------------------------
// Reduction
// ---------------------------------------------------------------------------

/// Reduce rendered HTML to a `RenderedPage` with markdown text.
pub fn reduce_html(html: &str) -> RenderedPage {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc);
    let description = extract_meta_description(&doc);
    let content_html = extract_content_html(&doc, html);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "iframe", "noscript", "svg", "header", "footer", "aside",
        ])
        .build();

    // htmd only fails on malformed input; fall back to the bare text nodes
    let markdown = converter
        .convert(&content_html)
        .unwrap_or_else(|_| text_fallback(&doc));

    RenderedPage {
        text: cleanup(&markdown),
        title,
        description,
    }
}

/// Check whether reduced page text looks like a login wall instead of content.
pub fn looks_like_login_wall(text: &str) -> bool {
    if text.len() >= LOGIN_WALL_MAX_LEN {
        return false;
    }
    let lower = text.to_lowercase();
    LOGIN_WALL_PHRASES.iter().any(|p| lower.contains(p))
}

// ---------------------------------------------------------------------------
// Metadata extraction
// ---------------------------------------------------------------------------

fn extract_title(doc: &Html) -> Option<String> {
    static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector")
    });
    static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));

    if let Some(el) = doc.select(&OG_TITLE).next() {
        if let Some(content) = el.value().attr("content") {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }

    doc.select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn extract_meta_description(doc: &Html) -> Option<String> {
    static META_DESC: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(r#"meta[name="description"], meta[property="og:description"]"#)
            .expect("valid selector")
    });

    doc.select(&META_DESC)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Select the main content container, falling back to `<body>`.
fn extract_content_html(doc: &Html, raw: &str) -> String {
    let selectors = ["main", "article", "[role=\"main\"]", ".content", "body"];

    for sel_str in &selectors {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                return el.inner_html();
            }
        }
    }

    raw.to_string()
}

fn text_fallback(doc: &Html) -> String {
    doc.root_element().text().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Cleanup passes
// ---------------------------------------------------------------------------

/// Normalize converted markdown: strip invisible characters, drop image-only
/// lines, and collapse runs of blank lines.
fn cleanup(markdown: &str) -> String {
    static INVISIBLE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\u{200b}\u{200c}\u{feff}]").expect("valid regex"));
    static IMAGE_ONLY_LINE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^!\[[^\]]*\]\([^)]*\)\s*$").expect("valid regex"));
    static BLANK_RUNS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let text = INVISIBLE.replace_all(markdown, "");
    let text = IMAGE_ONLY_LINE.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_extracts_main_content() {
        let html = r#"<html><head><title>Picnic | Events</title></head><body>
            <nav><a href="/">Home</a></nav>
            <main><h1>Community Picnic</h1><p>Saturday at noon.</p></main>
            <footer>Copyright 2026</footer>
        </body></html>"#;

        let page = reduce_html(html);
        assert!(page.text.contains("Community Picnic"));
        assert!(page.text.contains("Saturday at noon."));
        assert!(!page.text.contains("Copyright 2026"));
        assert_eq!(page.title.as_deref(), Some("Picnic | Events"));
    }

    #[test]
    fn reduce_prefers_og_title() {
        let html = r#"<html><head>
            <title>Fallback</title>
            <meta property="og:title" content="Shared Title">
            <meta name="description" content="A short description.">
        </head><body><main><p>Body</p></main></body></html>"#;

        let page = reduce_html(html);
        assert_eq!(page.title.as_deref(), Some("Shared Title"));
        assert_eq!(page.description.as_deref(), Some("A short description."));
    }

    #[test]
    fn reduce_falls_back_to_body() {
        let html = "<html><body><h1>No Main</h1><p>Direct body content.</p></body></html>";
        let page = reduce_html(html);
        assert!(page.text.contains("No Main"));
        assert!(page.text.contains("Direct body content."));
    }

    #[test]
    fn cleanup_collapses_blank_runs() {
        let cleaned = cleanup("line one\n\n\n\n\nline two");
        assert_eq!(cleaned, "line one\n\nline two");
    }

    #[test]
    fn cleanup_drops_image_only_lines() {
        let cleaned = cleanup("before\n\n![logo](https://example.com/logo.png)\n\nafter");
        assert!(!cleaned.contains("logo.png"));
        assert!(cleaned.contains("before"));
        assert!(cleaned.contains("after"));
    }

    #[test]
    fn login_wall_detected_on_short_gated_page() {
        let text = "Log in to Facebook\n\nYou must log in to continue.";
        assert!(looks_like_login_wall(text));
    }

    #[test]
    fn login_wall_ignored_on_long_pages() {
        let mut text = String::from("Sign in to continue reading our newsletter. ");
        text.push_str(&"Real event content. ".repeat(100));
        assert!(!looks_like_login_wall(&text));
    }

    #[test]
    fn login_wall_ignored_on_normal_content() {
        let text = "# Community Picnic\n\nJoin us Saturday at the park.";
        assert!(!looks_like_login_wall(text));
    }
}
