//! Pipeline evaluator and method dispatch (component F, §4.6).

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RenderAbort;
use crate::i18n::Translator;
use crate::resource::ResourceManagerHandle;
use crate::site::SiteHandle;
use crate::value::TemplateValue;

use super::ast::Expr;
use super::builtins;
use super::render::TemplateStore;

/// Host flags surfaced to `hugo.isProduction` etc. (§3 "BuildEnv", §4.7).
#[derive(Clone, Debug, Default)]
pub struct BuildEnv {
    pub is_production: bool,
    pub is_server: bool,
    pub is_development: bool,
    pub is_extended: bool,
}

/// `return`'s non-local control signal (§4.5 Define, §7 "Control signals"):
/// raised inside a partial body, caught only by `partial`/`partialCached`/
/// `executeAsTemplate`. Any other catcher must re-raise it — in this
/// implementation that means propagating the `Err` up through `render_nodes`.
#[derive(Debug)]
pub struct ReturnSignal(pub TemplateValue);

pub type EvalResult = Result<TemplateValue, ReturnSignal>;

struct Frame {
    dot: TemplateValue,
    vars: HashMap<String, TemplateValue>,
}

/// All state threaded through one page render (component F + H). Confined to
/// a single thread/build per §5.
pub struct EvalContext<'a> {
    frames: Vec<Frame>,
    root: TemplateValue,
    pub site: Option<SiteHandle>,
    pub resource_manager: Option<ResourceManagerHandle>,
    pub translator: Option<Rc<dyn Translator>>,
    pub language: String,
    pub build_env: BuildEnv,
    pub templates: &'a TemplateStore,
    pub current_page_path: String,
    pub current_template: String,
    /// Set when a resource-build fatal error occurs (§7); `render_nodes`
    /// checks this after every node and stops once it is `Some`.
    pub abort: Option<RenderAbort>,
}

impl<'a> EvalContext<'a> {
    pub fn new(dot: TemplateValue, templates: &'a TemplateStore) -> Self {
        Self {
            frames: vec![Frame { dot: dot.clone(), vars: HashMap::new() }],
            root: dot,
            site: None,
            resource_manager: None,
            translator: None,
            language: "en".to_string(),
            build_env: BuildEnv::default(),
            templates,
            current_page_path: String::new(),
            current_template: String::new(),
            abort: None,
        }
    }

    pub fn dot(&self) -> TemplateValue {
        self.frames.last().expect("frame stack never empty").dot.clone()
    }

    pub fn push_scope(&mut self, dot: TemplateValue) {
        self.frames.push(Frame { dot, vars: HashMap::new() });
    }

    pub fn pop_scope(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty());
    }

    pub fn declare(&mut self, name: &str, value: TemplateValue) {
        self.frames.last_mut().unwrap().vars.insert(name.to_string(), value);
    }

    /// `$x = v`: assigns to the nearest enclosing frame that already
    /// declared `x`; falls back to declaring in the current frame if
    /// undefined anywhere (§6).
    pub fn assign(&mut self, name: &str, value: TemplateValue) {
        for frame in self.frames.iter_mut().rev() {
            if frame.vars.contains_key(name) {
                frame.vars.insert(name.to_string(), value);
                return;
            }
        }
        self.declare(name, value);
    }

    fn lookup_var(&self, name: &str) -> TemplateValue {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.vars.get(name) {
                return v.clone();
            }
        }
        TemplateValue::Nil
    }

    fn hugo_global(&self, path: &[&str]) -> TemplateValue {
        builtins::hugo_field(path.join(".").to_lowercase().as_str(), &self.build_env)
    }

    fn site_global(&self) -> TemplateValue {
        self.site.clone().map(TemplateValue::Site).unwrap_or(TemplateValue::Nil)
    }

    /// Resolves a bare token (no call args): `.`, `$`, `.a.b`, `$v.a.b`,
    /// literals, or a bare global root (`site`, `hugo`) followed by a path.
    fn resolve_value_path(&self, token: &str) -> TemplateValue {
        if token == "." {
            return self.dot();
        }
        if token == "$" {
            return self.root.clone();
        }
        if let Some(rest) = token.strip_prefix('.') {
            let path: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();
            return walk_path(self.dot(), &path);
        }
        if let Some(rest) = token.strip_prefix('$') {
            let mut parts = rest.splitn(2, '.');
            let var_name = format!("${}", parts.next().unwrap_or(""));
            let base = self.lookup_var(&var_name);
            let path: Vec<&str> = parts.next().unwrap_or("").split('.').filter(|s| !s.is_empty()).collect();
            return walk_path(base, &path);
        }
        if let Some(literal) = parse_literal(token) {
            return literal;
        }
        let segments: Vec<&str> = token.split('.').collect();
        match segments[0].to_lowercase().as_str() {
            "hugo" => return self.hugo_global(&segments[1..]),
            "site" => return walk_path(self.site_global(), &segments[1..]),
            _ => {}
        }
        // Bare identifier naming a field on the current dot (e.g. `site` as
        // used from within a Page's field table) falls back to plain field
        // access before finally treating it as a zero-arg function call.
        let direct = walk_path(self.dot(), &segments);
        if !matches!(direct, TemplateValue::Nil) {
            return direct;
        }
        TemplateValue::Nil
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Pipeline(cmds) => {
                let mut value = TemplateValue::Nil;
                let mut first = true;
                for cmd in cmds {
                    value = self.eval_piped(cmd, if first { None } else { Some(value) })?;
                    first = false;
                }
                Ok(value)
            }
            other => self.eval_piped(other, None),
        }
    }

    fn eval_piped(&mut self, expr: &Expr, piped: Option<TemplateValue>) -> EvalResult {
        match expr {
            Expr::Token(t) => {
                if let Some(piped_value) = piped {
                    return self.call_by_name(t, vec![piped_value]);
                }
                if is_call_candidate(t) {
                    let direct = self.resolve_value_path(t);
                    if !matches!(direct, TemplateValue::Nil) || !looks_like_call_name(t) {
                        return Ok(direct);
                    }
                    return self.call_by_name(t, Vec::new());
                }
                Ok(self.resolve_value_path(t))
            }
            Expr::Access { base, path } => {
                let receiver_base = self.eval(base)?;
                let receiver = walk_path(receiver_base, &path[..path.len().saturating_sub(1)]);
                let method = path.last().cloned().unwrap_or_default();
                let mut args = Vec::new();
                if let Some(p) = piped {
                    args.push(p);
                }
                self.dispatch_method(receiver, &method, args)
            }
            Expr::Command { head, args } => {
                let mut values = Vec::with_capacity(args.len() + 1);
                for a in args {
                    values.push(self.eval(a)?);
                }
                if let Some(p) = piped {
                    values.push(p);
                }
                match head.as_ref() {
                    Expr::Token(name) => self.call_by_name(name, values),
                    Expr::Access { base, path } => {
                        let receiver_base = self.eval(base)?;
                        let receiver = walk_path(receiver_base, &path[..path.len().saturating_sub(1)]);
                        let method = path.last().cloned().unwrap_or_default();
                        self.dispatch_method(receiver, &method, values)
                    }
                    Expr::Pipeline(_) | Expr::Command { .. } => {
                        // Rare: a computed head. Evaluate and treat the
                        // result's stringification as a function name.
                        let head_val = self.eval(head)?.stringify();
                        self.call_by_name(&head_val, values)
                    }
                }
            }
        }
    }

    /// Splits a dotted name at the last `.` and dispatches either to a flat
    /// built-in (`strings.contains`, `hugo.version`, ...) or, when the
    /// prefix resolves to a receiver value, to `dispatch_method` (§4.6).
    fn call_by_name(&mut self, name: &str, mut args: Vec<TemplateValue>) -> EvalResult {
        if builtins::is_builtin(name) {
            return builtins::call(name, &args, self);
        }

        if let Some((prefix, method)) = name.rsplit_once('.') {
            let segments: Vec<&str> = prefix.split('.').collect();
            let receiver = match segments[0].to_lowercase().as_str() {
                "hugo" => return Ok(self.hugo_global(&segments[1..])),
                "resources" if segments.len() == 1 => {
                    args.insert(0, TemplateValue::Nil);
                    return builtins::call(&format!("resources.{}", method.to_lowercase()), &args[1..], self);
                }
                "site" => walk_path(self.site_global(), &segments[1..]),
                "." => self.dot(),
                _ if prefix.starts_with('.') => {
                    let path: Vec<&str> = prefix[1..].split('.').filter(|s| !s.is_empty()).collect();
                    walk_path(self.dot(), &path)
                }
                _ if prefix.starts_with('$') => {
                    let rest = &prefix[1..];
                    let mut parts = rest.splitn(2, '.');
                    let var_name = format!("${}", parts.next().unwrap_or(""));
                    let base = self.lookup_var(&var_name);
                    let path: Vec<&str> = parts.next().unwrap_or("").split('.').filter(|s| !s.is_empty()).collect();
                    walk_path(base, &path)
                }
                _ => walk_path(self.dot(), &segments),
            };
            return self.dispatch_method(receiver, method, args);
        }

        Ok(TemplateValue::Nil)
    }

    /// Method dispatch on a resolved receiver value (the second half of
    /// "receiver.method" names, §4.6).
    fn dispatch_method(&mut self, receiver: TemplateValue, method: &str, args: Vec<TemplateValue>) -> EvalResult {
        builtins::dispatch_method(receiver, method, &args, self)
    }
}

fn is_call_candidate(token: &str) -> bool {
    !token.starts_with('.')
        && !token.starts_with('$')
        && !token.starts_with('"')
        && !token.starts_with('\'')
        && !token.starts_with('`')
        && token != "true"
        && token != "false"
        && parse_literal(token).is_none()
}

fn looks_like_call_name(token: &str) -> bool {
    token.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false)
}

fn parse_literal(token: &str) -> Option<TemplateValue> {
    match token {
        "true" => return Some(TemplateValue::Bool(true)),
        "false" => return Some(TemplateValue::Bool(false)),
        "nil" => return Some(TemplateValue::Nil),
        _ => {}
    }
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if matches!(first, b'"' | b'\'' | b'`') && bytes[bytes.len() - 1] == first {
            let inner = &token[1..token.len() - 1];
            return Some(TemplateValue::String(unescape_literal(inner)));
        }
    }
    if let Ok(n) = token.parse::<i64>() {
        return Some(TemplateValue::Number(n));
    }
    None
}

fn unescape_literal(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\n", "\n").replace("\\t", "\t")
}

/// Walks `path` left-to-right from `start` via case-insensitive field
/// access; Nil at any step short-circuits to Nil (§4.1, §8 invariant 13).
pub fn walk_path(start: TemplateValue, path: &[&str]) -> TemplateValue {
    let mut current = start;
    for segment in path {
        if matches!(current, TemplateValue::Nil) {
            return TemplateValue::Nil;
        }
        current = current.field(segment);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_parsing_recognizes_numbers_and_strings() {
        assert!(matches!(parse_literal("42"), Some(TemplateValue::Number(42))));
        assert!(matches!(parse_literal("\"hi\""), Some(TemplateValue::String(s)) if s == "hi"));
        assert!(matches!(parse_literal("true"), Some(TemplateValue::Bool(true))));
        assert!(parse_literal(".Foo").is_none());
    }

    #[test]
    fn walk_path_short_circuits_on_nil() {
        assert!(matches!(walk_path(TemplateValue::Nil, &["a", "b"]), TemplateValue::Nil));
    }
}
