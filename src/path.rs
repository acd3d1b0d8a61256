//! Path/URL/glob utilities (component I, §4.9).

use globset::GlobBuilder;

use crate::value::UrlValue;

/// Collapses `.` segments and applies `..` by popping one segment when
/// available; rejoins with `/`. No leading/trailing slash is added or kept.
pub fn normalize_rel_path(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

/// Strips one or more leading/trailing `/`.
pub fn trim_slashes(s: &str) -> String {
    s.trim_matches('/').to_string()
}

pub fn ensure_leading_slash(s: &str) -> String {
    if s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{}", s)
    }
}

pub fn ensure_trailing_slash(s: &str) -> String {
    if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{}/", s)
    }
}

/// `relPermalink` is always `/`-prefixed and slash-terminated (§3 invariant 1).
pub fn normalize_rel_permalink(path: &str) -> String {
    let trimmed = trim_slashes(path);
    let normalized = normalize_rel_path(&trimmed);
    ensure_trailing_slash(&ensure_leading_slash(&normalized))
}

/// Glob matcher (§4.4, §4.9, §9): `**` matches zero or more path segments,
/// `*` within a segment matches any substring, case-sensitive. Delegates to
/// `globset` (as the teacher's `sass.rs` does for its own asset globbing)
/// with `literal_separator` so `*` never crosses a `/`.
pub fn glob_match(pattern: &str, path: &str) -> bool {
    let matcher = match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(g) => g.compile_matcher(),
        Err(_) => return false,
    };
    matcher.is_match(path)
}

/// Absolute parsing via the host URL lib (`url` crate); relative falls back
/// to a manual split on first `#` and first `?`, never raising (§4.9).
pub fn parse_url(s: &str) -> UrlValue {
    if let Ok(u) = url::Url::parse(s) {
        return UrlValue {
            scheme: u.scheme().to_string(),
            host: u.host_str().unwrap_or("").to_string(),
            path: u.path().to_string(),
            query: u.query().unwrap_or("").to_string(),
            fragment: u.fragment().unwrap_or("").to_string(),
        };
    }

    let (rest, fragment) = match s.find('#') {
        Some(i) => (&s[..i], s[i + 1..].to_string()),
        None => (s, String::new()),
    };
    let (path, query) = match rest.find('?') {
        Some(i) => (&rest[..i], rest[i + 1..].to_string()),
        None => (rest, String::new()),
    };
    UrlValue {
        scheme: String::new(),
        host: String::new(),
        path: path.to_string(),
        query,
        fragment,
    }
}

pub fn join_path(base: &str, rel: &str) -> String {
    let base = ensure_trailing_slash(base.trim_end_matches('/'));
    format!("{}{}", base, rel.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dot_and_dotdot() {
        assert_eq!(normalize_rel_path("a/./b/../c"), "a/c");
        assert_eq!(normalize_rel_path("./a/b/"), "a/b");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_rel_path("a/./b/../c/../../d");
        let twice = normalize_rel_path(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn ensure_trailing_slash_is_idempotent() {
        let once = ensure_trailing_slash("a/b");
        let twice = ensure_trailing_slash(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "a/b/");
    }

    #[test]
    fn glob_double_star_matches_zero_or_more_segments() {
        assert!(glob_match("**/*.css", "a/b/c.css"));
        assert!(glob_match("a/**/c.css", "a/c.css"));
        assert!(glob_match("**/*.css", "c.css"));
        assert!(!glob_match("**/*.css", "a/b/c.js"));
    }

    #[test]
    fn glob_multi_star_ordered_substring() {
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxcyyb"));
    }

    #[test]
    fn parse_url_relative_splits_fragment_and_query() {
        let u = parse_url("/foo/bar?x=1#frag");
        assert_eq!(u.path, "/foo/bar");
        assert_eq!(u.query, "x=1");
        assert_eq!(u.fragment, "frag");
    }

    #[test]
    fn parse_url_absolute_uses_host_lib() {
        let u = parse_url("https://example.com/a?b=1#c");
        assert_eq!(u.scheme, "https");
        assert_eq!(u.host, "example.com");
        assert_eq!(u.path, "/a");
    }
}
