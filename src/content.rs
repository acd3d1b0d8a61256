//! Front-matter parser (component C, §4.3). A bounded, hand-written
//! dialect — not a real YAML/TOML/JSON parser (§1 Non-goals) — detecting
//! JSON, YAML (`---`), or TOML (`+++`) front matter ahead of a content body.

use crate::frontmatter::{FrontMatter, FrontMatterMenu, ParamValue, ParsedContent};

/// §4.3 step 1: naive brace-counting extraction. Does not account for `}`
/// inside string values — preserved verbatim per §9's open-question note.
fn extract_json_front_matter(text: &str) -> Option<(String, usize)> {
    let offset = text.len() - text.trim_start().len();
    let rest = &text[offset..];
    if !rest.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    for (i, c) in rest.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = offset + i + 1;
                    return Some((rest[..=i].to_string(), end));
                }
            }
            _ => {}
        }
    }
    None
}

fn json_to_frontmatter(value: serde_json::Map<String, serde_json::Value>) -> FrontMatter {
    let mut fm = FrontMatter::default();
    for (key, v) in value {
        let lower = key.to_lowercase();
        apply_json_field(&mut fm, &lower, &v);
    }
    fm
}

fn json_value_to_param(v: &serde_json::Value) -> ParamValue {
    match v {
        serde_json::Value::Bool(b) => ParamValue::Bool(*b),
        serde_json::Value::Number(n) => ParamValue::Number(n.as_i64().unwrap_or(0)),
        serde_json::Value::String(s) => ParamValue::String(s.clone()),
        serde_json::Value::Array(items) => {
            ParamValue::Array(items.iter().map(json_value_to_param).collect())
        }
        _ => ParamValue::String(String::new()),
    }
}

fn json_string_array(v: &serde_json::Value) -> Vec<String> {
    match v {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|i| i.as_str().map(|s| s.to_string()))
            .collect(),
        serde_json::Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn apply_json_field(fm: &mut FrontMatter, key: &str, v: &serde_json::Value) {
    match key {
        "title" => fm.title = v.as_str().map(|s| s.to_string()),
        "date" => fm.date = v.as_str().and_then(parse_date),
        "draft" => fm.draft = v.as_bool().unwrap_or(false),
        "description" => fm.description = v.as_str().map(|s| s.to_string()),
        "slug" => fm.slug = v.as_str().map(|s| s.to_string()),
        "layout" => fm.layout = v.as_str().map(|s| s.to_string()),
        "type" => fm.content_type = v.as_str().map(|s| s.to_string()),
        "tags" => fm.tags = json_string_array(v),
        "categories" => fm.categories = json_string_array(v),
        "params" => {
            if let serde_json::Value::Object(obj) = v {
                for (k, pv) in obj {
                    fm.params.insert(k.to_lowercase(), json_value_to_param(pv));
                }
            }
        }
        "menu" => {
            if let serde_json::Value::Object(obj) = v {
                for (name, entry) in obj {
                    let mut m = FrontMatterMenu::new(name.clone());
                    if let serde_json::Value::Object(fields) = entry {
                        apply_menu_fields_json(&mut m, fields);
                    }
                    fm.menus.push(m);
                }
            }
        }
        _ => {
            fm.params.insert(key.to_string(), json_value_to_param(v));
        }
    }
}

fn apply_menu_fields_json(m: &mut FrontMatterMenu, fields: &serde_json::Map<String, serde_json::Value>) {
    for (k, v) in fields {
        match k.to_lowercase().as_str() {
            "weight" => m.weight = v.as_i64().unwrap_or(0),
            "name" => m.name = v.as_str().map(|s| s.to_string()),
            "parent" => m.parent = v.as_str().map(|s| s.to_string()),
            "identifier" => m.identifier = v.as_str().map(|s| s.to_string()),
            "pre" => m.pre = v.as_str().map(|s| s.to_string()),
            "post" => m.post = v.as_str().map(|s| s.to_string()),
            "title" => m.title = v.as_str().map(|s| s.to_string()),
            _ => {}
        }
    }
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn parse_inline_array(s: &str) -> Vec<String> {
    let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
    if inner.trim().is_empty() {
        return Vec::new();
    }
    inner.split(',').map(|i| unquote(i.trim())).collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Unquoted `true`/`false` → bool; otherwise `int32.tryParse` → number; else
/// trimmed string (§4.3).
fn parse_scalar(s: &str) -> ParamValue {
    let s = s.trim();
    if let Some(b) = parse_bool(s) {
        return ParamValue::Bool(b);
    }
    if let Ok(n) = s.parse::<i32>() {
        return ParamValue::Number(n as i64);
    }
    ParamValue::String(unquote(s))
}

fn parse_scalar_or_array(s: &str) -> ParamValue {
    let trimmed = s.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        ParamValue::Array(
            parse_inline_array(trimmed)
                .into_iter()
                .map(ParamValue::String)
                .collect(),
        )
    } else {
        parse_scalar(trimmed)
    }
}

/// ISO-8601 via chrono; failures silently leave the field unset (§4.3).
fn parse_date(s: &str) -> Option<chrono::NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0).unwrap());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
}

fn apply_top_level_scalar(fm: &mut FrontMatter, key: &str, val: &str) {
    match key {
        "title" => fm.title = Some(unquote(val)),
        "date" => fm.date = parse_date(&unquote(val)),
        "draft" => fm.draft = parse_bool(val.trim()).unwrap_or(false),
        "description" => fm.description = Some(unquote(val)),
        "slug" => fm.slug = Some(unquote(val)),
        "layout" => fm.layout = Some(unquote(val)),
        "type" => fm.content_type = Some(unquote(val)),
        "tags" => fm.tags = parse_inline_array(val),
        "categories" => fm.categories = parse_inline_array(val),
        _ => {
            fm.params.insert(key.to_string(), parse_scalar_or_array(val));
        }
    }
}

fn apply_menu_field(entry: &mut FrontMatterMenu, key: &str, val: &str) {
    match key {
        "weight" => entry.weight = val.trim().parse().unwrap_or(0),
        "name" => entry.name = Some(unquote(val)),
        "parent" => entry.parent = Some(unquote(val)),
        "identifier" => entry.identifier = Some(unquote(val)),
        "pre" => entry.pre = Some(unquote(val)),
        "post" => entry.post = Some(unquote(val)),
        "title" => entry.title = Some(unquote(val)),
        _ => {}
    }
}

/// YAML dialect per §4.3: two-space-indented blocks under `params`,
/// `tags`/`categories`, and `menu`; inline `[a, b, c]` arrays; `menu`
/// sub-blocks at 4-space indent for entry fields.
fn parse_yaml(block: &str) -> FrontMatter {
    let mut fm = FrontMatter::default();
    let lines: Vec<&str> = block.lines().collect();
    let mut i = 0usize;
    while i < lines.len() {
        let raw = lines[i];
        if raw.trim().is_empty() || raw.starts_with(' ') {
            i += 1;
            continue;
        }
        let Some(colon) = raw.find(':') else {
            i += 1;
            continue;
        };
        let key = raw[..colon].trim().to_lowercase();
        let rest = raw[colon + 1..].trim().to_string();
        i += 1;

        if rest.is_empty() && (key == "params" || key == "tags" || key == "categories" || key == "menu") {
            match key.as_str() {
                "params" => {
                    while i < lines.len() && lines[i].starts_with("  ") && !lines[i].starts_with("   ") {
                        let l = lines[i].trim();
                        if let Some(c) = l.find(':') {
                            fm.params
                                .insert(l[..c].trim().to_lowercase(), parse_scalar_or_array(l[c + 1..].trim()));
                        }
                        i += 1;
                    }
                }
                "tags" | "categories" => {
                    let mut items = Vec::new();
                    while i < lines.len() && lines[i].starts_with("  ") && !lines[i].starts_with("   ") {
                        let l = lines[i].trim();
                        if let Some(item) = l.strip_prefix("- ") {
                            items.push(unquote(item));
                        }
                        i += 1;
                    }
                    if key == "tags" {
                        fm.tags = items;
                    } else {
                        fm.categories = items;
                    }
                }
                "menu" => {
                    while i < lines.len() && lines[i].starts_with("  ") && !lines[i].starts_with("    ") {
                        let header = lines[i].trim();
                        i += 1;
                        let Some(c) = header.find(':') else { continue };
                        let name = header[..c].trim().to_string();
                        let header_rest = header[c + 1..].trim();
                        let mut entry = FrontMatterMenu::new(name);
                        if header_rest.is_empty() {
                            while i < lines.len() && lines[i].starts_with("    ") {
                                let l = lines[i].trim();
                                if let Some(c2) = l.find(':') {
                                    apply_menu_field(&mut entry, &l[..c2].trim().to_lowercase(), l[c2 + 1..].trim());
                                }
                                i += 1;
                            }
                        }
                        fm.menus.push(entry);
                    }
                }
                _ => unreachable!(),
            }
            continue;
        }

        if rest.is_empty() {
            // unrecognized key with no inline value and no recognized block:
            // skip any indented continuation (malformed lines are dropped).
            while i < lines.len() && lines[i].starts_with(' ') {
                i += 1;
            }
            continue;
        }

        apply_top_level_scalar(&mut fm, &key, &rest);
    }
    fm
}

/// TOML dialect per §4.3: `[params]` routes into params; `[[menu.<name>]]`
/// appends a new `FrontMatterMenu`.
fn parse_toml(block: &str) -> FrontMatter {
    enum Section {
        Top,
        Params,
        Menu(usize),
    }

    let mut fm = FrontMatter::default();
    let mut section = Section::Top;

    for raw in block.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix("[[").and_then(|s| s.strip_suffix("]]")) {
            if let Some(menu_name) = name.strip_prefix("menu.") {
                fm.menus.push(FrontMatterMenu::new(menu_name));
                section = Section::Menu(fm.menus.len() - 1);
            } else {
                section = Section::Top;
            }
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section = if name == "params" { Section::Params } else { Section::Top };
            continue;
        }
        let Some(eq) = line.find('=') else { continue };
        let key = line[..eq].trim().to_lowercase();
        let val = line[eq + 1..].trim();
        match &section {
            Section::Params => {
                fm.params.insert(key, parse_scalar_or_array(val));
            }
            Section::Menu(idx) => apply_menu_field(&mut fm.menus[*idx], &key, val),
            Section::Top => apply_top_level_scalar(&mut fm, &key, val),
        }
    }
    fm
}

/// `parseContent(text)` (§4.3). Detects JSON (leading `{`), YAML (`---`
/// fence), or TOML (`+++` fence) front matter ahead of the body.
pub fn parse_content(text: &str) -> ParsedContent {
    if let Some((json, end)) = extract_json_front_matter(text) {
        if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str::<serde_json::Value>(&json) {
            let body = text[end..].trim_start().to_string();
            return ParsedContent {
                front_matter: json_to_frontmatter(obj),
                body,
            };
        }
        // Invalid JSON front matter: whole text becomes body (§7).
        return ParsedContent {
            front_matter: FrontMatter::default(),
            body: text.to_string(),
        };
    }

    let lines: Vec<&str> = text.lines().collect();
    if let Some(&first) = lines.first() {
        let fence = match first.trim_end() {
            "---" => Some("---"),
            "+++" => Some("+++"),
            _ => None,
        };
        if let Some(fence) = fence {
            if let Some(close) = lines[1..].iter().position(|l| l.trim_end() == fence) {
                let close = close + 1;
                let block = lines[1..close].join("\n");
                let body = lines[close + 1..].join("\n");
                let front_matter = if fence == "---" { parse_yaml(&block) } else { parse_toml(&block) };
                return ParsedContent { front_matter, body };
            }
        }
    }

    ParsedContent {
        front_matter: FrontMatter::default(),
        body: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_front_matter_scenario() {
        let input = "---\ntitle: Hello\ntags: [a, b]\nparams:\n  foo: bar\n---\nbody text";
        let parsed = parse_content(input);
        assert_eq!(parsed.front_matter.title.as_deref(), Some("Hello"));
        assert_eq!(parsed.front_matter.tags, vec!["a", "b"]);
        assert_eq!(
            parsed.front_matter.params.get("foo").and_then(|p| p.as_str()),
            Some("bar")
        );
        assert_eq!(parsed.body, "body text");
    }

    #[test]
    fn toml_menu_weight() {
        let input = "+++\ntitle = \"Hi\"\n[[menu.main]]\nweight = 10\n+++\nbody";
        let parsed = parse_content(input);
        assert_eq!(parsed.front_matter.menus.len(), 1);
        assert_eq!(parsed.front_matter.menus[0].menu, "main");
        assert_eq!(parsed.front_matter.menus[0].weight, 10);
    }

    #[test]
    fn json_front_matter_no_body() {
        let input = "{\"title\": \"Hi\"}";
        let parsed = parse_content(input);
        assert_eq!(parsed.front_matter.title.as_deref(), Some("Hi"));
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn no_front_matter_is_whole_body() {
        let input = "just some text\nwith lines";
        let parsed = parse_content(input);
        assert!(parsed.front_matter.title.is_none());
        assert_eq!(parsed.body, input);
    }

    #[test]
    fn invalid_json_front_matter_keeps_whole_text_as_body() {
        let input = "{ not json }extra";
        let parsed = parse_content(input);
        assert!(parsed.front_matter.title.is_none());
        assert_eq!(parsed.body, input);
    }

    #[test]
    fn unrecognized_yaml_keys_become_params() {
        let input = "---\nauthor: jane\n---\nbody";
        let parsed = parse_content(input);
        assert_eq!(
            parsed.front_matter.params.get("author").and_then(|p| p.as_str()),
            Some("jane")
        );
    }
}
