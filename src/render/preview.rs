use regex::Regex;

pub const DEFAULT_PREVIEW_CHARS: usize = 150;

lazy_static::lazy_static! {
    static ref HEADING_MARKER: Regex = Regex::new(r"(?m)^#+\s+").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*(.*?)\*").unwrap();
}

/// Plain-text excerpt of a markdown body for list cards.
///
/// Heading markers and `**`/`*` emphasis are stripped, blank lines dropped,
/// the rest joined with single spaces and cut at `budget` characters. The cut
/// is not word- or markup-aware.
pub fn preview_text(md: &str, budget: usize) -> String {
    let text = HEADING_MARKER.replace_all(md, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(budget)
        .collect()
}
