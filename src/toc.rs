//! Table-of-contents builder (component J, §4.10, §6). Builds Hugo's
//! `<nav id="TableOfContents">` nested-`<ul>` tree from a flat heading list.

use crate::markdown::Heading;

/// `buildToc(headings) -> String` (§6): nests `<li>` entries by heading
/// level, clamping level jumps greater than one so a `# / ### / ##` sequence
/// still produces a well-formed tree instead of empty intermediate `<ul>`s.
pub fn build_toc(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return r#"<nav id="TableOfContents"></nav>"#.to_string();
    }

    let base = headings.iter().map(|h| h.level).min().unwrap();
    let mut out = String::from(r#"<nav id="TableOfContents">"#);
    out.push_str("<ul>");

    let mut depth: u8 = 0;
    let mut open_li = vec![false];

    for h in headings {
        let level = (h.level.saturating_sub(base)).min(depth + 1);

        if level > depth {
            out.push_str("<ul>");
            open_li.push(false);
            depth += 1;
        } else {
            while depth > level {
                if *open_li.last().unwrap() {
                    out.push_str("</li>");
                }
                out.push_str("</ul>");
                open_li.pop();
                depth -= 1;
            }
            if *open_li.last().unwrap() {
                out.push_str("</li>");
            }
        }

        out.push_str(&format!(
            r#"<li><a href="#{}">{}</a>"#,
            h.id,
            html_escape_text(&h.text)
        ));
        *open_li.last_mut().unwrap() = true;
    }

    while depth > 0 {
        if *open_li.last().unwrap() {
            out.push_str("</li>");
        }
        out.push_str("</ul>");
        open_li.pop();
        depth -= 1;
    }
    if *open_li.last().unwrap() {
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    out.push_str("</nav>");
    out
}

fn html_escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(level: u8, text: &str, id: &str) -> Heading {
        Heading {
            level,
            text: text.to_string(),
            id: id.to_string(),
        }
    }

    #[test]
    fn empty_headings_yields_empty_nav() {
        assert_eq!(build_toc(&[]), r#"<nav id="TableOfContents"></nav>"#);
    }

    #[test]
    fn flat_headings_single_level() {
        let headings = vec![h(2, "One", "one"), h(2, "Two", "two")];
        let toc = build_toc(&headings);
        assert_eq!(
            toc,
            r#"<nav id="TableOfContents"><ul><li><a href="#one">One</a></li><li><a href="#two">Two</a></li></ul></nav>"#
        );
    }

    #[test]
    fn nested_headings_open_and_close_sublists() {
        let headings = vec![h(1, "Top", "top"), h(2, "Child", "child"), h(1, "Top2", "top2")];
        let toc = build_toc(&headings);
        assert!(toc.contains("<ul><li><a href=\"#top\">Top</a><ul><li><a href=\"#child\">Child</a></li></ul></li><li><a href=\"#top2\">Top2</a></li></ul>"));
    }

    #[test]
    fn skipped_levels_are_clamped_to_one_deeper() {
        let headings = vec![h(1, "A", "a"), h(3, "B", "b")];
        let toc = build_toc(&headings);
        assert_eq!(
            toc,
            r#"<nav id="TableOfContents"><ul><li><a href="#a">A</a><ul><li><a href="#b">B</a></li></ul></li></ul></nav>"#
        );
    }
}
