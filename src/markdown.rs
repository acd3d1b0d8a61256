//! Markdown collaborator shim (component J, §4.10, §6). The core never
//! reimplements a Markdown renderer (§1); it wraps `pulldown-cmark` behind
//! the narrow interface the template built-ins call, the way the teacher
//! wraps `pulldown_cmark` inline in `resource.rs`/`site.rs`.

use std::collections::HashSet;

use indexmap::IndexMap;
use pulldown_cmark::{html, Event, HeadingLevel, Parser, Tag};
use regex::Regex;

use crate::value::TemplateValue;

#[derive(Clone, Debug, PartialEq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

#[derive(Clone, Debug, Default)]
pub struct RenderedMarkdown {
    pub html: String,
    pub headings: Vec<Heading>,
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn slugify(text: &str, used: &mut HashSet<String>) -> String {
    let raw: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let mut collapsed = String::with_capacity(raw.len());
    let mut prev_dash = false;
    for c in raw.chars() {
        if c == '-' {
            if !prev_dash {
                collapsed.push(c);
            }
            prev_dash = true;
        } else {
            collapsed.push(c);
            prev_dash = false;
        }
    }
    let slug = collapsed.trim_matches('-').to_string();
    let slug = if slug.is_empty() { "section".to_string() } else { slug };

    let mut candidate = slug.clone();
    let mut n = 1;
    while used.contains(&candidate) {
        n += 1;
        candidate = format!("{}-{}", slug, n);
    }
    used.insert(candidate.clone());
    candidate
}

/// `renderMarkdown(src) -> { html, headings }` (§4.10).
pub fn render_markdown(src: &str) -> RenderedMarkdown {
    let events: Vec<Event> = Parser::new(src).collect();
    let mut headings = Vec::new();
    let mut used_ids = HashSet::new();
    let mut current: Option<(u8, Option<String>)> = None;
    let mut heading_text = String::new();

    for ev in &events {
        match ev {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((heading_level_to_u8(*level), id.as_ref().map(|c| c.to_string())));
                heading_text.clear();
            }
            Event::End(Tag::Heading { .. }) => {
                if let Some((level, explicit_id)) = current.take() {
                    let id = explicit_id.unwrap_or_else(|| slugify(&heading_text, &mut used_ids));
                    headings.push(Heading {
                        level,
                        text: heading_text.clone(),
                        id,
                    });
                }
            }
            Event::Text(t) | Event::Code(t) if current.is_some() => heading_text.push_str(t),
            _ => {}
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    RenderedMarkdown { html: out, headings }
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        if (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"') || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'') {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn parse_shortcode_args(args: &str) -> IndexMap<String, TemplateValue> {
    let token_re = Regex::new(r#""[^"]*"|'[^']*'|\S+"#).unwrap();
    let mut map = IndexMap::new();
    let mut idx = 0usize;
    for m in token_re.find_iter(args.trim()) {
        let tok = m.as_str();
        if let Some((k, v)) = tok.split_once('=') {
            map.insert(k.to_string(), TemplateValue::String(unquote(v)));
        } else {
            map.insert(idx.to_string(), TemplateValue::String(unquote(tok)));
            idx += 1;
        }
    }
    map
}

/// `renderMarkdownWithShortcodes(src, expander)` (§4.10): expands
/// `{{< name args >}}`-style shortcode spans before delegating to
/// `render_markdown`. `expander` is the template engine's sub-render entry
/// point, injected to avoid a markdown→template→markdown dependency cycle.
pub fn render_markdown_with_shortcodes(
    src: &str,
    expander: &dyn Fn(&str, &IndexMap<String, TemplateValue>) -> String,
) -> RenderedMarkdown {
    let shortcode_re = Regex::new(r"\{\{<\s*(\w+)([^>]*)>\}\}").unwrap();
    let expanded = shortcode_re.replace_all(src, |caps: &regex::Captures| {
        let name = &caps[1];
        let args = parse_shortcode_args(&caps[2]);
        expander(name, &args)
    });
    render_markdown(&expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let r = render_markdown("# Hello\n\nworld");
        assert!(r.html.contains("<h1"));
        assert_eq!(r.headings.len(), 1);
        assert_eq!(r.headings[0].level, 1);
        assert_eq!(r.headings[0].text, "Hello");
        assert_eq!(r.headings[0].id, "hello");
    }

    #[test]
    fn dedups_heading_slugs() {
        let r = render_markdown("# Intro\n\n# Intro");
        assert_eq!(r.headings[0].id, "intro");
        assert_eq!(r.headings[1].id, "intro-2");
    }

    #[test]
    fn shortcode_args_split_named_and_positional() {
        let args = parse_shortcode_args(r#"src="a.png" alt=thing"#);
        assert_eq!(args.get("src").and_then(|v| v.as_str_for_test()), Some("a.png"));
    }
}

#[cfg(test)]
impl TemplateValue {
    fn as_str_for_test(&self) -> Option<&str> {
        match self {
            TemplateValue::String(s) => Some(s),
            _ => None,
        }
    }
}
