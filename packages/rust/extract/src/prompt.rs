//! Prompt construction for structured extraction.
//!
//! Each record kind has one fixed system prompt describing the exact JSON
//! envelope the model must return. The user prompt carries the fetched page
//! text plus the submitted URL for provenance.

use chrono::NaiveDate;
use tracing::warn;

use eventloom_shared::{FetchedContent, RecordKind};

/// Page text beyond this many bytes is truncated before prompting.
pub(crate) const MAX_BODY_BYTES: usize = 12_000;

const EVENT_SYSTEM_PROMPT: &str = r#"You extract structured event information from web page text.

For context, today's date is {today}. If the year of the event is not specified, assume the current year or a future year. Do not guess a past year.

Reply with a single JSON object and nothing else. On success the object is shaped exactly as:
{
  "success": true,
  "confidence": <number between 0.0 and 1.0>,
  "event": {
    "event_title": "the main title of the event",
    "description": "a detailed summary of the event",
    "start_datetime": "the starting date and time in strict ISO 8601 (YYYY-MM-DDTHH:MM:SS); if no time is given, use T00:00:00",
    "end_datetime": "the ending date and time in strict ISO 8601, or null if none is specified",
    "location": "the physical address or venue of the event"
  }
}

If the text does not describe an event, reply instead with:
{
  "success": false,
  "error": "a short explanation of why no event could be extracted"
}

Set any individual field you cannot find to null. Never invent values."#;

const UPDATE_SYSTEM_PROMPT: &str = r#"You extract a community update or announcement from web page text.

For context, today's date is {today}.

Reply with a single JSON object and nothing else. On success the object is shaped exactly as:
{
  "success": true,
  "confidence": <number between 0.0 and 1.0>,
  "update": {
    "content": "the announcement text, condensed to its essential message"
  }
}

If the text does not contain an announcement or update, reply instead with:
{
  "success": false,
  "error": "a short explanation of why no update could be extracted"
}

Never invent content that is not in the text."#;

/// Build the fixed system prompt for `kind`, anchored to `today`.
pub fn system_prompt(kind: RecordKind, today: NaiveDate) -> String {
    let template = match kind {
        RecordKind::Event => EVENT_SYSTEM_PROMPT,
        RecordKind::Update => UPDATE_SYSTEM_PROMPT,
    };
    template.replace("{today}", &today.format("%Y-%m-%d").to_string())
}

/// Build the user prompt carrying the fetched page text.
pub fn user_prompt(content: &FetchedContent) -> String {
    let (body, truncated) = truncate_body(&content.body);
    if truncated {
        warn!(
            limit = MAX_BODY_BYTES,
            original = content.body.len(),
            "page text truncated for completion"
        );
    }

    let mut prompt = format!(
        "Source URL (for provenance only, do not copy into fields): {}\n",
        content.source_url
    );
    if let Some(title) = &content.title {
        prompt.push_str(&format!("Page title: {title}\n"));
    }
    prompt.push_str("\nPage text:\n\n");
    prompt.push_str(body);
    if truncated {
        prompt.push_str("\n\n[truncated]");
    }
    prompt
}

/// Cut `body` at the byte limit, backing up to a char boundary.
fn truncate_body(body: &str) -> (&str, bool) {
    if body.len() <= MAX_BODY_BYTES {
        return (body, false);
    }
    let mut end = MAX_BODY_BYTES;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    (&body[..end], true)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use url::Url;

    use super::*;

    fn content_with_body(body: &str) -> FetchedContent {
        FetchedContent {
            source_url: Url::parse("https://example.com/page").expect("valid url"),
            body: body.to_string(),
            title: Some("Page Title".into()),
            description: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn system_prompt_substitutes_today() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 25).expect("valid date");
        let prompt = system_prompt(RecordKind::Event, today);
        assert!(prompt.contains("2026-08-25"));
        assert!(!prompt.contains("{today}"));
    }

    #[test]
    fn event_prompt_pins_datetime_format() {
        let prompt = system_prompt(RecordKind::Event, Utc::now().date_naive());
        assert!(prompt.contains("ISO 8601"));
        assert!(prompt.contains("T00:00:00"));
        assert!(prompt.contains("\"event\""));
    }

    #[test]
    fn update_prompt_asks_for_content() {
        let prompt = system_prompt(RecordKind::Update, Utc::now().date_naive());
        assert!(prompt.contains("\"update\""));
        assert!(prompt.contains("\"content\""));
    }

    #[test]
    fn user_prompt_carries_url_and_title() {
        let content = content_with_body("Some page text.");
        let prompt = user_prompt(&content);
        assert!(prompt.contains("https://example.com/page"));
        assert!(prompt.contains("Page Title"));
        assert!(prompt.contains("Some page text."));
    }

    #[test]
    fn user_prompt_truncates_long_bodies() {
        let content = content_with_body(&"x".repeat(MAX_BODY_BYTES * 2));
        let prompt = user_prompt(&content);
        assert!(prompt.ends_with("[truncated]"));
        assert!(prompt.len() < MAX_BODY_BYTES * 2);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multi-byte characters straddling the limit must not split
        let body = "é".repeat(MAX_BODY_BYTES);
        let (cut, truncated) = truncate_body(&body);
        assert!(truncated);
        assert!(cut.len() <= MAX_BODY_BYTES);
        assert!(std::str::from_utf8(cut.as_bytes()).is_ok());
    }
}
