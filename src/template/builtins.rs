//! Built-in functions (component G, §4.7) and the "receiver.method" method
//! dispatch table that backs the examples in §4.6.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::RenderAbort;
use crate::page::PageHandle;
use crate::value::TemplateValue;

use super::eval::{walk_path, BuildEnv, EvalContext, EvalResult};

const NAMES: &[&str] = &[
    "and", "or", "not", "cond", "default", "return",
    "add", "sub", "mul", "div", "mod",
    "lower", "upper", "title", "trim", "replace", "replaceRE", "truncate", "plainify", "urlize",
    "humanize", "split", "printf", "print",
    "strings.contains", "strings.hasPrefix", "strings.trimPrefix", "strings.trimSuffix",
    "slice", "append", "dict", "merge", "isset", "index", "delimit", "in", "where", "sort",
    "uniq", "after", "last", "group",
    "path.base", "urls.parse", "urls.joinPath", "urlquery", "relurl", "absurl", "relLangURL",
    "absLangURL", "safeURL", "safeHTML", "safeHTMLAttr", "safeJS", "safeCSS",
    "htmlEscape", "htmlUnescape",
    "md5", "crypto.sha1", "encoding.jsonify", "markdownify", "i18n",
    "hugo.isMultilingual", "hugo.isMultihost", "hugo.version", "hugo.isProduction",
    "hugo.isServer", "hugo.isDevelopment", "hugo.isExtended", "hugo.workingDir",
    "partial", "partialCached", "templates.exists",
    "resources.get", "resources.getMatch", "resources.match", "resources.byType",
    "resources.concat", "resources.fromString", "resources.executeAsTemplate",
    "resources.minify", "resources.fingerprint", "resources.copy", "resources.postProcess",
    "css.sass", "images.resize", "minify", "fingerprint", "resize",
    "time.format", "dateFormat", "errorf", "warnf",
    "eq", "ne", "lt", "le", "gt", "ge", "len",
];

pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

fn s(v: &TemplateValue) -> String {
    v.stringify()
}

fn n(v: &TemplateValue) -> i64 {
    match v {
        TemplateValue::Number(n) => *n,
        TemplateValue::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

const NIL: TemplateValue = TemplateValue::Nil;

fn arg<'a>(args: &'a [TemplateValue], i: usize) -> &'a TemplateValue {
    args.get(i).unwrap_or(&NIL)
}

pub fn call(name: &str, args: &[TemplateValue], ctx: &mut EvalContext) -> EvalResult {
    Ok(match name {
        "and" => TemplateValue::Bool(args.iter().all(|a| a.truthy())),
        "or" => TemplateValue::Bool(args.iter().any(|a| a.truthy())),
        "not" => TemplateValue::Bool(!arg(args, 0).truthy()),
        "cond" => if arg(args, 0).truthy() { arg(args, 1).clone() } else { arg(args, 2).clone() },
        "default" => if arg(args, 1).truthy() { arg(args, 1).clone() } else { arg(args, 0).clone() },
        "return" => return Err(super::eval::ReturnSignal(arg(args, 0).clone())),

        "add" => TemplateValue::Number(args.iter().map(n).sum()),
        "sub" => TemplateValue::Number(n(arg(args, 0)) - n(arg(args, 1))),
        "mul" => TemplateValue::Number(args.iter().map(n).product()),
        "div" => {
            let d = n(arg(args, 1));
            TemplateValue::Number(if d == 0 { 0 } else { n(arg(args, 0)) / d })
        }
        "mod" => {
            let d = n(arg(args, 1));
            TemplateValue::Number(if d == 0 { 0 } else { n(arg(args, 0)) % d })
        }

        "lower" => TemplateValue::String(s(arg(args, 0)).to_lowercase()),
        "upper" => TemplateValue::String(s(arg(args, 0)).to_uppercase()),
        "title" => TemplateValue::String(title_case(&s(arg(args, 0)))),
        "trim" => TemplateValue::String(s(arg(args, 0)).trim().to_string()),
        "replace" => TemplateValue::String(s(arg(args, 0)).replace(&s(arg(args, 1)), &s(arg(args, 2)))),
        "replaceRE" => replace_re(&s(arg(args, 0)), &s(arg(args, 1)), &s(arg(args, 2))),
        "truncate" => truncate_str(args),
        "plainify" => TemplateValue::String(strip_tags(&s(arg(args, 0)))),
        "urlize" => TemplateValue::String(urlize(&s(arg(args, 0)))),
        "humanize" => TemplateValue::String(humanize(&s(arg(args, 0)))),
        "split" => TemplateValue::StringArray(
            s(arg(args, 0)).split(&s(arg(args, 1))).map(String::from).collect(),
        ),
        "printf" => TemplateValue::String(printf(args)),
        "print" => TemplateValue::String(args.iter().map(s).collect::<Vec<_>>().join(" ")),

        "strings.contains" => TemplateValue::Bool(s(arg(args, 0)).contains(&s(arg(args, 1)))),
        "strings.hasPrefix" => TemplateValue::Bool(s(arg(args, 0)).starts_with(&s(arg(args, 1)))),
        "strings.trimPrefix" => {
            TemplateValue::String(s(arg(args, 0)).trim_start_matches(&s(arg(args, 1))).to_string())
        }
        "strings.trimSuffix" => {
            TemplateValue::String(s(arg(args, 0)).trim_end_matches(&s(arg(args, 1))).to_string())
        }

        "slice" => TemplateValue::AnyArray(args.to_vec()),
        "append" => {
            let mut items = match args.last() {
                Some(TemplateValue::AnyArray(v)) => v.clone(),
                _ => Vec::new(),
            };
            items.extend_from_slice(&args[..args.len().saturating_sub(1)]);
            TemplateValue::AnyArray(items)
        }
        "dict" => {
            let mut map = IndexMap::new();
            for pair in args.chunks(2) {
                if pair.len() == 2 {
                    map.insert(s(&pair[0]), pair[1].clone());
                }
            }
            TemplateValue::new_dict(map)
        }
        "merge" => merge_dicts(arg(args, 0), arg(args, 1)),
        "isset" => TemplateValue::Bool(!matches!(index_value(arg(args, 0), arg(args, 1)), TemplateValue::Nil)),
        "index" => index_value(arg(args, 0), arg(args, 1)),
        "delimit" => delimit(arg(args, 0), &s(arg(args, 1))),
        "in" => TemplateValue::Bool(contains(arg(args, 0), arg(args, 1))),
        "where" => where_filter(arg(args, 0), &s(arg(args, 1)), &s(arg(args, 2)), arg(args, 3)),
        "sort" => sort_collection(arg(args, 0), args.get(1), args.get(2)),
        "uniq" => uniq(arg(args, 0)),
        "after" => after(n(arg(args, 0)), arg(args, 1)),
        "last" => last(n(arg(args, 0)), arg(args, 1)),
        "group" => group(&s(arg(args, 0)), arg(args, 1)),

        "path.base" => TemplateValue::String(
            std::path::Path::new(&s(arg(args, 0)))
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
        ),
        "urls.parse" => TemplateValue::Url(Rc::new(crate::path::parse_url(&s(arg(args, 0))))),
        "urls.joinPath" => TemplateValue::String(crate::path::join_path(&s(arg(args, 0)), &s(arg(args, 1)))),
        "urlquery" => TemplateValue::String(url_encode(&s(arg(args, 0)))),
        "relurl" => TemplateValue::String(crate::path::ensure_leading_slash(&s(arg(args, 0)))),
        "absurl" => TemplateValue::String(abs_url(ctx, &s(arg(args, 0)), false)),
        "relLangURL" => TemplateValue::String(lang_url(ctx, &s(arg(args, 0)))),
        "absLangURL" => TemplateValue::String(abs_url(ctx, &lang_url(ctx, &s(arg(args, 0))), false)),
        "safeURL" | "safeHTML" | "safeHTMLAttr" | "safeJS" | "safeCSS" => TemplateValue::Html(s(arg(args, 0))),
        "htmlEscape" => TemplateValue::String(crate::value::escape_html(&s(arg(args, 0)))),
        "htmlUnescape" => TemplateValue::String(crate::value::unescape_html(&s(arg(args, 0)))),

        "md5" => TemplateValue::String(format!("{:x}", md5::compute(s(arg(args, 0)).as_bytes()))),
        "crypto.sha1" => TemplateValue::String(sha1_hex(s(arg(args, 0)).as_bytes())),
        "encoding.jsonify" => TemplateValue::String(
            serde_json::to_string(&to_json(arg(args, 0))).unwrap_or_default(),
        ),
        "markdownify" => TemplateValue::Html(strip_single_p(&crate::markdown::render_markdown(&s(arg(args, 0))).html)),
        "i18n" => i18n(ctx, &s(arg(args, 0))),

        "hugo.isMultilingual" => TemplateValue::Bool(false),
        "hugo.isMultihost" => TemplateValue::Bool(false),
        "hugo.version" => TemplateValue::VersionString("0.146.0".to_string()),
        "hugo.isProduction" => TemplateValue::Bool(ctx.build_env.is_production),
        "hugo.isServer" => TemplateValue::Bool(ctx.build_env.is_server),
        "hugo.isDevelopment" => TemplateValue::Bool(ctx.build_env.is_development),
        "hugo.isExtended" => TemplateValue::Bool(ctx.build_env.is_extended),
        "hugo.workingDir" => TemplateValue::String(
            std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_else(|_| ".".to_string()),
        ),

        "partial" | "partialCached" => return partial(ctx, &s(arg(args, 0)), args.get(1)),
        "templates.exists" => TemplateValue::Bool(ctx.templates.exists(&s(arg(args, 0)))),

        "resources.get" => resource_get(ctx, &s(arg(args, 0))),
        "resources.getMatch" => resource_get_match(ctx, &s(arg(args, 0))),
        "resources.match" => resource_match(ctx, &s(arg(args, 0))),
        "resources.byType" => resource_by_type(ctx, &s(arg(args, 0))),
        "resources.concat" => resource_concat(ctx, args),
        "resources.fromString" => resource_from_string(ctx, &s(arg(args, 0)), &s(arg(args, 1))),
        "resources.executeAsTemplate" => return resource_execute_as_template(ctx, args),
        "resources.minify" | "minify" => resource_minify(ctx, arg(args, 0)),
        "resources.fingerprint" | "fingerprint" => resource_fingerprint(ctx, arg(args, 0)),
        "resources.copy" => resource_copy(ctx, arg(args, 0), &s(arg(args, 1))),
        "resources.postProcess" => resource_post_process(ctx, arg(args, 0)),
        "css.sass" => resource_sass(ctx, arg(args, 0)),
        "images.resize" | "resize" => resource_resize(ctx, arg(args, 0), &s(arg(args, 1))),

        "time.format" | "dateFormat" => TemplateValue::String(format_date(&s(arg(args, 0)), &s(arg(args, 1)))),
        "errorf" => {
            log::error!("{}", printf(args));
            TemplateValue::Nil
        }
        "warnf" => {
            log::warn!("{}", printf(args));
            TemplateValue::Nil
        }

        "eq" => TemplateValue::Bool(compare(arg(args, 0), arg(args, 1)) == std::cmp::Ordering::Equal),
        "ne" => TemplateValue::Bool(compare(arg(args, 0), arg(args, 1)) != std::cmp::Ordering::Equal),
        "lt" => TemplateValue::Bool(compare(arg(args, 0), arg(args, 1)) == std::cmp::Ordering::Less),
        "le" => TemplateValue::Bool(compare(arg(args, 0), arg(args, 1)) != std::cmp::Ordering::Greater),
        "gt" => TemplateValue::Bool(compare(arg(args, 0), arg(args, 1)) == std::cmp::Ordering::Greater),
        "ge" => TemplateValue::Bool(compare(arg(args, 0), arg(args, 1)) != std::cmp::Ordering::Less),
        "len" => TemplateValue::Number(length_of(arg(args, 0))),

        _ => TemplateValue::Nil,
    })
}

/// "receiver.method" dispatch (§4.6): `.Site.GetPage`, `.Page.RenderString`,
/// `.Scratch.{Get,Set,Add,Delete,SetInMap,DeleteInMap}`.
pub fn dispatch_method(receiver: TemplateValue, method: &str, args: &[TemplateValue], ctx: &mut EvalContext) -> EvalResult {
    let method_lower = method.to_lowercase();
    Ok(match (&receiver, method_lower.as_str()) {
        (TemplateValue::Site(site), "getpage") => {
            let path = s(arg(args, 0));
            let normalized = crate::path::normalize_rel_permalink(&path);
            site.borrow()
                .all_pages
                .iter()
                .find(|p| p.borrow().rel_permalink == normalized)
                .cloned()
                .map(TemplateValue::Page)
                .unwrap_or(TemplateValue::Nil)
        }
        (TemplateValue::Page(_), "renderstring") => {
            let src = s(arg(args, 0));
            TemplateValue::Html(crate::markdown::render_markdown(&src).html)
        }
        (TemplateValue::Scratch(store), "get") => store.borrow().get(&s(arg(args, 0))),
        (TemplateValue::Scratch(store), "set") => {
            store.borrow_mut().set(&s(arg(args, 0)), arg(args, 1).clone());
            TemplateValue::Nil
        }
        (TemplateValue::Scratch(store), "add") => {
            store.borrow_mut().add(&s(arg(args, 0)), arg(args, 1).clone());
            TemplateValue::Nil
        }
        (TemplateValue::Scratch(store), "delete") => {
            store.borrow_mut().delete(&s(arg(args, 0)));
            TemplateValue::Nil
        }
        (TemplateValue::Scratch(store), "setinmap") => {
            store.borrow_mut().set_in_map(&s(arg(args, 0)), &s(arg(args, 1)), arg(args, 2).clone());
            TemplateValue::Nil
        }
        (TemplateValue::Scratch(store), "deleteinmap") => {
            store.borrow_mut().delete_in_map(&s(arg(args, 0)), &s(arg(args, 1)));
            TemplateValue::Nil
        }
        _ => TemplateValue::Nil,
    })
}

pub fn hugo_field(name: &str, build_env: &BuildEnv) -> TemplateValue {
    match name {
        "ismultilingual" => TemplateValue::Bool(false),
        "ismultihost" => TemplateValue::Bool(false),
        "version" => TemplateValue::VersionString("0.146.0".to_string()),
        "isproduction" => TemplateValue::Bool(build_env.is_production),
        "isserver" => TemplateValue::Bool(build_env.is_server),
        "isdevelopment" => TemplateValue::Bool(build_env.is_development),
        "isextended" => TemplateValue::Bool(build_env.is_extended),
        "workingdir" => TemplateValue::String(
            std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_else(|_| ".".to_string()),
        ),
        _ => TemplateValue::Nil,
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn replace_re(pattern: &str, repl: &str, text: &str) -> TemplateValue {
    match regex::Regex::new(pattern) {
        Ok(re) => TemplateValue::String(re.replace_all(text, repl).to_string()),
        Err(_) => TemplateValue::String(text.to_string()),
    }
}

fn truncate_str(args: &[TemplateValue]) -> TemplateValue {
    let limit = n(arg(args, 0)) as usize;
    let text = s(arg(args, 1));
    let ellipsis = args.get(2).map(s).unwrap_or_else(|| "...".to_string());
    if text.chars().count() <= limit {
        TemplateValue::String(text)
    } else {
        let truncated: String = text.chars().take(limit).collect();
        TemplateValue::String(format!("{}{}", truncated, ellipsis))
    }
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn urlize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn humanize(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let spaced = s.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn printf(args: &[TemplateValue]) -> String {
    let fmt = args.first().map(s).unwrap_or_default();
    let mut out = String::with_capacity(fmt.len());
    let mut rest = args.iter().skip(1);
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('%') => out.push('%'),
                Some('s') | Some('v') => out.push_str(&rest.next().map(s).unwrap_or_default()),
                Some('d') => out.push_str(&rest.next().map(|v| n(v).to_string()).unwrap_or_default()),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn index_value(container: &TemplateValue, key: &TemplateValue) -> TemplateValue {
    match container {
        TemplateValue::Dict(_) => container.field(&s(key)),
        TemplateValue::AnyArray(items) => items.get(n(key) as usize).cloned().unwrap_or(TemplateValue::Nil),
        TemplateValue::StringArray(items) => items
            .get(n(key) as usize)
            .cloned()
            .map(TemplateValue::String)
            .unwrap_or(TemplateValue::Nil),
        TemplateValue::PageArray(items) => items
            .get(n(key) as usize)
            .cloned()
            .map(TemplateValue::Page)
            .unwrap_or(TemplateValue::Nil),
        _ => TemplateValue::Nil,
    }
}

fn delimit(v: &TemplateValue, sep: &str) -> TemplateValue {
    let joined = match v {
        TemplateValue::StringArray(items) => items.clone(),
        TemplateValue::AnyArray(items) => items.iter().map(|i| i.stringify()).collect(),
        other => vec![other.stringify()],
    };
    TemplateValue::String(joined.join(sep))
}

fn contains(container: &TemplateValue, needle: &TemplateValue) -> bool {
    match container {
        TemplateValue::StringArray(items) => items.contains(&s(needle)),
        TemplateValue::AnyArray(items) => items.iter().any(|i| compare(i, needle) == std::cmp::Ordering::Equal),
        TemplateValue::String(s) => s.contains(&needle.stringify()),
        _ => false,
    }
}

/// `where(pages, path, op, expected)` (§4.7, §8 invariant 6). `path` is a
/// leading-dot field path evaluated against each page.
fn where_filter(container: &TemplateValue, path: &str, op: &str, expected: &TemplateValue) -> TemplateValue {
    let TemplateValue::PageArray(pages) = container else {
        return TemplateValue::Nil;
    };
    let segments: Vec<&str> = path.trim_start_matches('.').split('.').filter(|s| !s.is_empty()).collect();
    let filtered: Vec<PageHandle> = pages
        .iter()
        .filter(|p| {
            let actual = walk_path(TemplateValue::Page((*p).clone()), &segments);
            match op {
                "eq" => compare(&actual, expected) == std::cmp::Ordering::Equal,
                "ne" => compare(&actual, expected) != std::cmp::Ordering::Equal,
                "in" => contains(expected, &actual),
                "not in" => !contains(expected, &actual),
                _ => false,
            }
        })
        .cloned()
        .collect();
    TemplateValue::PageArray(filtered)
}

fn sort_collection(v: &TemplateValue, key: Option<&TemplateValue>, order: Option<&TemplateValue>) -> TemplateValue {
    let descending = order.map(s).map(|o| o == "desc").unwrap_or(false);
    match v {
        TemplateValue::PageArray(items) => {
            let mut out = items.clone();
            let path: Vec<String> = key
                .map(s)
                .unwrap_or_default()
                .trim_start_matches('.')
                .split('.')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            out.sort_by(|a, b| {
                let path_refs: Vec<&str> = path.iter().map(String::as_str).collect();
                let av = walk_path(TemplateValue::Page(a.clone()), &path_refs);
                let bv = walk_path(TemplateValue::Page(b.clone()), &path_refs);
                compare(&av, &bv)
            });
            if descending {
                out.reverse();
            }
            TemplateValue::PageArray(out)
        }
        TemplateValue::StringArray(items) => {
            let mut out = items.clone();
            out.sort();
            if descending {
                out.reverse();
            }
            TemplateValue::StringArray(out)
        }
        TemplateValue::AnyArray(items) => {
            let mut out = items.clone();
            out.sort_by(compare);
            if descending {
                out.reverse();
            }
            TemplateValue::AnyArray(out)
        }
        other => other.clone(),
    }
}

fn uniq(v: &TemplateValue) -> TemplateValue {
    match v {
        TemplateValue::StringArray(items) => {
            let mut seen = std::collections::HashSet::new();
            TemplateValue::StringArray(items.iter().filter(|s| seen.insert((*s).clone())).cloned().collect())
        }
        TemplateValue::AnyArray(items) => {
            let mut out: Vec<TemplateValue> = Vec::new();
            for item in items {
                if !out.iter().any(|o| compare(o, item) == std::cmp::Ordering::Equal) {
                    out.push(item.clone());
                }
            }
            TemplateValue::AnyArray(out)
        }
        other => other.clone(),
    }
}

fn after(count: i64, v: &TemplateValue) -> TemplateValue {
    let count = count.max(0) as usize;
    match v {
        TemplateValue::PageArray(items) => {
            TemplateValue::PageArray(items.get(count.min(items.len())..).unwrap_or(&[]).to_vec())
        }
        TemplateValue::StringArray(items) => {
            TemplateValue::StringArray(items.get(count.min(items.len())..).unwrap_or(&[]).to_vec())
        }
        TemplateValue::AnyArray(items) => {
            TemplateValue::AnyArray(items.get(count.min(items.len())..).unwrap_or(&[]).to_vec())
        }
        other => other.clone(),
    }
}

fn last(count: i64, v: &TemplateValue) -> TemplateValue {
    let count = count.max(0) as usize;
    match v {
        TemplateValue::PageArray(items) => {
            let start = items.len().saturating_sub(count);
            TemplateValue::PageArray(items[start..].to_vec())
        }
        TemplateValue::StringArray(items) => {
            let start = items.len().saturating_sub(count);
            TemplateValue::StringArray(items[start..].to_vec())
        }
        TemplateValue::AnyArray(items) => {
            let start = items.len().saturating_sub(count);
            TemplateValue::AnyArray(items[start..].to_vec())
        }
        other => other.clone(),
    }
}

fn group(path: &str, v: &TemplateValue) -> TemplateValue {
    let TemplateValue::PageArray(pages) = v else {
        return TemplateValue::Nil;
    };
    let segments: Vec<&str> = path.trim_start_matches('.').split('.').filter(|s| !s.is_empty()).collect();
    let mut groups: IndexMap<String, Vec<PageHandle>> = IndexMap::new();
    for p in pages {
        let key = walk_path(TemplateValue::Page(p.clone()), &segments).stringify();
        groups.entry(key).or_default().push(p.clone());
    }
    let items = groups
        .into_iter()
        .map(|(key, pages)| {
            let mut dict = IndexMap::new();
            dict.insert("key".to_string(), TemplateValue::String(key));
            dict.insert("pages".to_string(), TemplateValue::PageArray(pages));
            TemplateValue::new_dict(dict)
        })
        .collect();
    TemplateValue::AnyArray(items)
}

fn merge_dicts(a: &TemplateValue, b: &TemplateValue) -> TemplateValue {
    let (TemplateValue::Dict(a), TemplateValue::Dict(b)) = (a, b) else {
        return a.clone();
    };
    let mut out = a.borrow().clone();
    for (k, v) in b.borrow().iter() {
        out.insert(k.clone(), v.clone());
    }
    TemplateValue::new_dict(out)
}

fn length_of(v: &TemplateValue) -> i64 {
    match v {
        TemplateValue::StringArray(items) => items.len() as i64,
        TemplateValue::AnyArray(items) => items.len() as i64,
        TemplateValue::PageArray(items) => items.len() as i64,
        TemplateValue::MenuArray(items) => items.len() as i64,
        TemplateValue::String(s) | TemplateValue::Html(s) => s.chars().count() as i64,
        TemplateValue::Dict(d) => d.borrow().len() as i64,
        _ => 0,
    }
}

/// `eq/ne/lt/le/gt/ge`: semver comparison for `VersionString`, numeric for
/// `Number`, otherwise plain string comparison (§4.6).
fn compare(a: &TemplateValue, b: &TemplateValue) -> std::cmp::Ordering {
    if let (TemplateValue::VersionString(av), TemplateValue::VersionString(bv)) = (a, b) {
        if let (Ok(av), Ok(bv)) = (semver::Version::parse(&pad_semver(av)), semver::Version::parse(&pad_semver(bv))) {
            return av.cmp(&bv);
        }
    }
    if let (TemplateValue::Number(av), TemplateValue::Number(bv)) = (a, b) {
        return av.cmp(bv);
    }
    a.stringify().cmp(&b.stringify())
}

fn pad_semver(v: &str) -> String {
    let parts: Vec<&str> = v.split('.').collect();
    match parts.len() {
        1 => format!("{}.0.0", v),
        2 => format!("{}.0", v),
        _ => v.to_string(),
    }
}

fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn lang_url(ctx: &EvalContext, path: &str) -> String {
    let multi = ctx.site.as_ref().map(|s| s.borrow().is_multilingual()).unwrap_or(false);
    if multi {
        format!("/{}{}", ctx.language, crate::path::ensure_leading_slash(path))
    } else {
        crate::path::ensure_leading_slash(path)
    }
}

fn abs_url(ctx: &EvalContext, path: &str, _lang: bool) -> String {
    let base = ctx.site.as_ref().map(|s| s.borrow().base_url.clone()).unwrap_or_else(|| "/".to_string());
    crate::path::join_path(&base, path.trim_start_matches('/'))
}

fn i18n(ctx: &EvalContext, key: &str) -> TemplateValue {
    let translated = ctx
        .translator
        .as_ref()
        .and_then(|t| t.translate(&ctx.language, key));
    TemplateValue::String(translated.unwrap_or_else(|| key.to_string()))
}

fn strip_single_p(html: &str) -> String {
    let trimmed = html.trim();
    if let Some(inner) = trimmed.strip_prefix("<p>").and_then(|s| s.strip_suffix("</p>")) {
        if !inner.contains("<p>") {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

fn to_json(v: &TemplateValue) -> serde_json::Value {
    match v {
        TemplateValue::Nil => serde_json::Value::Null,
        TemplateValue::Bool(b) => serde_json::Value::Bool(*b),
        TemplateValue::Number(n) => serde_json::Value::Number((*n).into()),
        TemplateValue::String(s) | TemplateValue::Html(s) | TemplateValue::VersionString(s) => {
            serde_json::Value::String(s.clone())
        }
        TemplateValue::StringArray(items) => {
            serde_json::Value::Array(items.iter().map(|s| serde_json::Value::String(s.clone())).collect())
        }
        TemplateValue::AnyArray(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        TemplateValue::Dict(d) => {
            let mut map = serde_json::Map::new();
            for (k, v) in d.borrow().iter() {
                map.insert(k.clone(), to_json(v));
            }
            serde_json::Value::Object(map)
        }
        other => serde_json::Value::String(other.stringify()),
    }
}

/// Translates a (small, common) subset of Hugo's reference-time layout into
/// `chrono`'s strftime tokens, then formats `input` (best-effort RFC3339
/// parse, falling back to the raw string on failure) (§4.7).
fn format_date(layout: &str, input: &str) -> String {
    let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(input).map(|d| d.naive_utc()).or_else(|_| {
        chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0).unwrap())
    }) else {
        return input.to_string();
    };

    let strftime_layout = layout
        .replace("2006", "%Y")
        .replace("01", "%m")
        .replace("02", "%d")
        .replace("15", "%H")
        .replace("04", "%M")
        .replace("05", "%S")
        .replace("Monday", "%A")
        .replace("Mon", "%a")
        .replace("January", "%B")
        .replace("Jan", "%b")
        .replace("PM", "%p");
    parsed.format(&strftime_layout).to_string()
}

fn partial(ctx: &mut EvalContext, name: &str, extra: Option<&TemplateValue>) -> EvalResult {
    let body = match ctx.templates.get_partial(name) {
        Some(b) => b,
        None => return Ok(TemplateValue::Nil),
    };
    let dot = extra.cloned().unwrap_or_else(|| ctx.dot());
    ctx.push_scope(dot);
    let result = super::render::render_nodes(&body, ctx);
    ctx.pop_scope();
    match result {
        Ok(html) => Ok(TemplateValue::Html(html)),
        Err(super::eval::ReturnSignal(v)) => Ok(v),
    }
}

fn resource_get(ctx: &EvalContext, path: &str) -> TemplateValue {
    ctx.resource_manager
        .as_ref()
        .and_then(|m| m.get(path))
        .map(TemplateValue::Resource)
        .unwrap_or(TemplateValue::Nil)
}

fn resource_get_match(ctx: &EvalContext, pattern: &str) -> TemplateValue {
    ctx.resource_manager
        .as_ref()
        .and_then(|m| m.get_match(pattern))
        .map(TemplateValue::Resource)
        .unwrap_or(TemplateValue::Nil)
}

fn resource_match(ctx: &EvalContext, pattern: &str) -> TemplateValue {
    match &ctx.resource_manager {
        Some(m) => TemplateValue::PageResources(m.match_resources(pattern)),
        None => TemplateValue::Nil,
    }
}

fn resource_by_type(ctx: &EvalContext, kind: &str) -> TemplateValue {
    match &ctx.resource_manager {
        Some(m) => TemplateValue::PageResources(m.by_type(kind)),
        None => TemplateValue::Nil,
    }
}

fn resource_concat(ctx: &EvalContext, args: &[TemplateValue]) -> TemplateValue {
    let Some(manager) = &ctx.resource_manager else {
        return TemplateValue::Nil;
    };
    let target_name = s(arg(args, 0));
    let resources: Vec<_> = args
        .get(1..)
        .unwrap_or(&[])
        .iter()
        .filter_map(|v| match v {
            TemplateValue::Resource(r) => Some(r.clone()),
            TemplateValue::PageResources(rs) => rs.first().cloned(),
            _ => None,
        })
        .collect();
    TemplateValue::Resource(manager.concat(&target_name, &resources))
}

fn resource_from_string(ctx: &EvalContext, target_path: &str, content: &str) -> TemplateValue {
    match &ctx.resource_manager {
        Some(m) => TemplateValue::Resource(m.from_string(target_path, content)),
        None => TemplateValue::Nil,
    }
}

fn resource_minify(ctx: &EvalContext, input: &TemplateValue) -> TemplateValue {
    match (&ctx.resource_manager, input) {
        (Some(m), TemplateValue::Resource(r)) => TemplateValue::Resource(m.minify(r)),
        _ => TemplateValue::Nil,
    }
}

fn resource_fingerprint(ctx: &EvalContext, input: &TemplateValue) -> TemplateValue {
    match (&ctx.resource_manager, input) {
        (Some(m), TemplateValue::Resource(r)) => TemplateValue::Resource(m.fingerprint(r)),
        _ => TemplateValue::Nil,
    }
}

fn resource_post_process(ctx: &EvalContext, input: &TemplateValue) -> TemplateValue {
    match (&ctx.resource_manager, input) {
        (Some(m), TemplateValue::Resource(r)) => TemplateValue::Resource(m.post_process(r)),
        _ => TemplateValue::Nil,
    }
}

fn resource_execute_as_template(ctx: &mut EvalContext, args: &[TemplateValue]) -> EvalResult {
    let name = s(arg(args, 0));
    let content = match arg(args, 1) {
        TemplateValue::Resource(r) => r.text.clone().unwrap_or_default(),
        other => s(other),
    };
    let nodes = match super::parser::parse_template(&content) {
        Ok(n) => n,
        Err(_) => return Ok(TemplateValue::Nil),
    };
    let dot = ctx.dot();
    ctx.push_scope(dot);
    let result = super::render::render_nodes(&nodes, ctx);
    ctx.pop_scope();
    let rendered = match result {
        Ok(html) => html,
        Err(super::eval::ReturnSignal(v)) => return Ok(v),
    };
    Ok(resource_from_string(ctx, &name, &rendered))
}

fn resource_copy(ctx: &EvalContext, input: &TemplateValue, target_path: &str) -> TemplateValue {
    match (&ctx.resource_manager, input) {
        (Some(m), TemplateValue::Resource(r)) => TemplateValue::Resource(m.copy(target_path, r)),
        _ => TemplateValue::Nil,
    }
}

fn resource_sass(ctx: &mut EvalContext, input: &TemplateValue) -> TemplateValue {
    let (Some(manager), TemplateValue::Resource(r)) = (ctx.resource_manager.clone(), input) else {
        return TemplateValue::Nil;
    };
    match manager.sass_compile(r) {
        Ok(out) => TemplateValue::Resource(out),
        Err(e) => {
            abort(ctx, e);
            TemplateValue::Nil
        }
    }
}

fn resource_resize(ctx: &mut EvalContext, input: &TemplateValue, spec: &str) -> TemplateValue {
    let (Some(manager), TemplateValue::Resource(r)) = (ctx.resource_manager.clone(), input) else {
        return TemplateValue::Nil;
    };
    match manager.resize(r, spec) {
        Ok(out) => TemplateValue::Resource(out),
        Err(e) => {
            abort(ctx, e);
            TemplateValue::Nil
        }
    }
}

fn abort(ctx: &mut EvalContext, err: crate::error::ResourceError) {
    ctx.abort = Some(RenderAbort::from_resource_error(
        ctx.current_page_path.clone(),
        ctx.current_template.clone(),
        err,
    ));
}

/// Hand-rolled SHA-1 (§4.7 implementation note): no SHA-1 crate sits in the
/// teacher's or pack's dependency set, mirroring the existing `sha256`
/// dependency's plain `fn digest(bytes) -> hex string` shape.
fn sha1_hex(data: &[u8]) -> String {
    let mut h: [u32; 5] = [0x67452301, 0xEFCDAB89, 0x98BADCFE, 0x10325476, 0xC3D2E1F0];

    let ml = (data.len() as u64) * 8;
    let mut msg = data.to_vec();
    msg.push(0x80);
    while msg.len() % 64 != 56 {
        msg.push(0);
    }
    msg.extend_from_slice(&ml.to_be_bytes());

    for chunk in msg.chunks(64) {
        let mut w = [0u32; 80];
        for i in 0..16 {
            w[i] = u32::from_be_bytes([chunk[i * 4], chunk[i * 4 + 1], chunk[i * 4 + 2], chunk[i * 4 + 3]]);
        }
        for i in 16..80 {
            w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
        }

        let (mut a, mut b, mut c, mut d, mut e) = (h[0], h[1], h[2], h[3], h[4]);
        for (i, wi) in w.iter().enumerate() {
            let (f, k) = match i {
                0..=19 => ((b & c) | ((!b) & d), 0x5A827999u32),
                20..=39 => (b ^ c ^ d, 0x6ED9EBA1),
                40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1BBCDC),
                _ => (b ^ c ^ d, 0xCA62C1D6),
            };
            let temp = a
                .rotate_left(5)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(k)
                .wrapping_add(*wi);
            e = d;
            d = c;
            c = b.rotate_left(30);
            b = a;
            a = temp;
        }

        h[0] = h[0].wrapping_add(a);
        h[1] = h[1].wrapping_add(b);
        h[2] = h[2].wrapping_add(c);
        h[3] = h[3].wrapping_add(d);
        h[4] = h[4].wrapping_add(e);
    }

    h.iter().map(|x| format!("{:08x}", x)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_matches_known_vector() {
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn truncate_respects_char_count() {
        let out = truncate_str(&[TemplateValue::Number(5), TemplateValue::String("hello world".into())]);
        assert!(matches!(out, TemplateValue::String(s) if s == "hello..."));
    }

    #[test]
    fn plainify_strips_tags() {
        assert_eq!(strip_tags("<p>hi <b>there</b></p>"), "hi there");
    }

    #[test]
    fn printf_substitutes_s_and_d() {
        assert_eq!(printf(&[TemplateValue::String("%s has %d items".into()), TemplateValue::String("cart".into()), TemplateValue::Number(3)]), "cart has 3 items");
    }

    #[test]
    fn compare_uses_semver_for_version_strings() {
        let a = TemplateValue::VersionString("0.100.0".into());
        let b = TemplateValue::VersionString("0.99.0".into());
        assert_eq!(compare(&a, &b), std::cmp::Ordering::Greater);
    }
}
