/*!
 * Render
 * Markdown to class-annotated HTML, plain-text previews for cards, and the
 * small text helpers the detail views share
 */
pub mod markdown;
pub mod preview;

use chrono::{DateTime, Utc};

pub use markdown::render_markdown;
pub use preview::{preview_text, DEFAULT_PREVIEW_CHARS};

pub(crate) fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Escapes `text` and keeps its line structure with `<br />`.
pub fn render_plain_text(text: &str) -> String {
    text.lines()
        .map(escape_html)
        .collect::<Vec<_>>()
        .join("<br />")
}

/// "January 5, 2025"
pub fn published_on(ts: DateTime<Utc>) -> String {
    ts.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_published_on() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 5, 18, 30, 0).unwrap();
        assert_eq!(published_on(ts), "January 5, 2025");
    }

    #[test]
    fn test_render_plain_text_escapes_and_breaks_lines() {
        assert_eq!(
            render_plain_text("Line <one>\nLine & two"),
            "Line &lt;one&gt;<br />Line &amp; two"
        );
    }
}
