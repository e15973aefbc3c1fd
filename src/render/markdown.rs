//! Markdown rendering for blog bodies.
//!
//! Headings h1-h3, paragraphs, lists, list items, strong and emphasis are
//! emitted with fixed presentation classes; everything else uses the
//! pulldown-cmark defaults. Raw HTML in the source is shown as text.

use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Parser, Tag, TagEnd};

const H1_CLASS: &str = "text-3xl font-bold text-slate-300 mb-6 mt-8 first:mt-0";
const H2_CLASS: &str = "text-2xl font-bold text-slate-300 mb-4 mt-8 first:mt-0";
const H3_CLASS: &str = "text-xl font-semibold text-slate-300 mb-3 mt-6 first:mt-0";
const P_CLASS: &str = "text-slate-300 font-normal mb-4 leading-relaxed text-justify";
const UL_CLASS: &str = "list-disc list-inside mb-4 space-y-2 text-slate-300 font-normal";
const OL_CLASS: &str = "list-decimal list-inside mb-4 space-y-2 text-slate-300 font-normal";
const LI_CLASS: &str = "text-slate-300 font-normal";
const STRONG_CLASS: &str = "font-bold text-slate-300";
const EM_CLASS: &str = "italic text-slate-300";

fn heading(level: HeadingLevel) -> Option<(&'static str, &'static str)> {
    match level {
        HeadingLevel::H1 => Some(("h1", H1_CLASS)),
        HeadingLevel::H2 => Some(("h2", H2_CLASS)),
        HeadingLevel::H3 => Some(("h3", H3_CLASS)),
        _ => None,
    }
}

fn open(tag: &str, class: &str) -> Event<'static> {
    Event::Html(CowStr::from(format!("<{} class=\"{}\">", tag, class)))
}

fn close(tag: &str) -> Event<'static> {
    Event::Html(CowStr::from(format!("</{}>", tag)))
}

fn styled(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Heading {
            level,
            id,
            classes,
            attrs,
        }) => match heading(level) {
            Some((tag, class)) => open(tag, class),
            None => Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }),
        },
        Event::End(TagEnd::Heading(level)) => match heading(level) {
            Some((tag, _)) => Event::Html(CowStr::from(format!("</{}>\n", tag))),
            None => Event::End(TagEnd::Heading(level)),
        },
        Event::Start(Tag::Paragraph) => open("p", P_CLASS),
        Event::End(TagEnd::Paragraph) => Event::Html(CowStr::from("</p>\n")),
        Event::Start(Tag::List(None)) => Event::Html(CowStr::from(format!(
            "<ul class=\"{}\">\n",
            UL_CLASS
        ))),
        Event::Start(Tag::List(Some(1))) => Event::Html(CowStr::from(format!(
            "<ol class=\"{}\">\n",
            OL_CLASS
        ))),
        Event::Start(Tag::List(Some(start))) => Event::Html(CowStr::from(format!(
            "<ol class=\"{}\" start=\"{}\">\n",
            OL_CLASS, start
        ))),
        Event::End(TagEnd::List(false)) => Event::Html(CowStr::from("</ul>\n")),
        Event::End(TagEnd::List(true)) => Event::Html(CowStr::from("</ol>\n")),
        Event::Start(Tag::Item) => open("li", LI_CLASS),
        Event::End(TagEnd::Item) => Event::Html(CowStr::from("</li>\n")),
        Event::Start(Tag::Strong) => open("strong", STRONG_CLASS),
        Event::End(TagEnd::Strong) => close("strong"),
        Event::Start(Tag::Emphasis) => open("em", EM_CLASS),
        Event::End(TagEnd::Emphasis) => close("em"),
        other => other,
    }
}

fn sanitize(html: &str) -> String {
    ammonia::Builder::default()
        .add_generic_attributes(&["class"])
        .clean(html)
        .to_string()
}

/// Renders `md` to sanitized HTML.
pub fn render_markdown(md: &str) -> String {
    let parser = Parser::new(md).map(styled);
    let mut out = String::with_capacity(md.len() * 2);
    html::push_html(&mut out, parser);
    sanitize(&out)
}
