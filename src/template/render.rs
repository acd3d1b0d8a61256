//! Node renderer and the named-template/partial/define registry it reads
//! from (component H, §4.8).

use std::cell::RefCell;
use std::collections::HashMap;

use crate::value::TemplateValue;

use super::ast::Node;
use super::eval::{EvalContext, ReturnSignal};
use super::parser::{parse_template, ParseError};

/// Holds every registered named template plus the flattened `define` map
/// visible to `block`/`template` actions (§4.5, §4.8). Hugo's own template
/// set shares `define`s across every file loaded into one execution, which
/// this flattens into one global map rather than per-top-level-template —
/// a deliberate simplification (see DESIGN.md).
#[derive(Default)]
pub struct TemplateStore {
    templates: RefCell<HashMap<String, Vec<Node>>>,
    defines: RefCell<HashMap<String, Vec<Node>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, src: &str) -> Result<(), ParseError> {
        let nodes = parse_template(src)?;
        collect_defines(&nodes, &self.defines);
        self.templates.borrow_mut().insert(name.to_string(), nodes);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Vec<Node>> {
        self.templates.borrow().get(name).cloned()
    }

    /// `partials/<name>` or `_partials/<name>` (§4.7).
    pub fn get_partial(&self, name: &str) -> Option<Vec<Node>> {
        let store = self.templates.borrow();
        store
            .get(&format!("partials/{}", name))
            .or_else(|| store.get(&format!("_partials/{}", name)))
            .cloned()
    }

    pub fn get_define(&self, name: &str) -> Option<Vec<Node>> {
        self.defines.borrow().get(name).cloned()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.templates.borrow().contains_key(path)
    }
}

fn collect_defines(nodes: &[Node], into: &RefCell<HashMap<String, Vec<Node>>>) {
    for node in nodes {
        match node {
            Node::Define { name, body } => {
                into.borrow_mut().insert(name.clone(), body.clone());
                collect_defines(body, into);
            }
            Node::If { then_body, else_body, .. } => {
                collect_defines(then_body, into);
                collect_defines(else_body, into);
            }
            Node::With { then_body, else_body, .. } => {
                collect_defines(then_body, into);
                collect_defines(else_body, into);
            }
            Node::Range { body, else_body, .. } => {
                collect_defines(body, into);
                collect_defines(else_body, into);
            }
            Node::Block { fallback, .. } => collect_defines(fallback, into),
            _ => {}
        }
    }
}

/// Renders `nodes` into HTML text, per §4.8. Stops early (without error) if
/// `ctx.abort` has been set by a resource-build fatal failure (§7).
pub fn render_nodes(nodes: &[Node], ctx: &mut EvalContext) -> Result<String, ReturnSignal> {
    let mut out = String::new();
    for node in nodes {
        if ctx.abort.is_some() {
            break;
        }
        render_node(node, ctx, &mut out)?;
    }
    Ok(out)
}

fn emit_value(value: &TemplateValue, out: &mut String) {
    match value {
        TemplateValue::Html(s) => out.push_str(s),
        TemplateValue::String(s) => out.push_str(&crate::value::escape_html(s)),
        other => out.push_str(&crate::value::escape_html(&other.stringify())),
    }
}

fn render_node(node: &Node, ctx: &mut EvalContext, out: &mut String) -> Result<(), ReturnSignal> {
    match node {
        Node::Text(t) => out.push_str(t),
        Node::Output(expr) => {
            let value = ctx.eval(expr)?;
            emit_value(&value, out);
        }
        Node::Assignment { name, pipeline, declare } => {
            let value = ctx.eval(pipeline)?;
            if *declare {
                ctx.declare(name, value);
            } else {
                ctx.assign(name, value);
            }
        }
        Node::If { cond, then_body, else_body } => {
            let value = ctx.eval(cond)?;
            ctx.push_scope(ctx.dot());
            let rendered = if value.truthy() {
                render_nodes(then_body, ctx)
            } else {
                render_nodes(else_body, ctx)
            };
            ctx.pop_scope();
            out.push_str(&rendered?);
        }
        Node::With { expr, then_body, else_body } => {
            let value = ctx.eval(expr)?;
            if value.truthy() {
                ctx.push_scope(value);
                let rendered = render_nodes(then_body, ctx);
                ctx.pop_scope();
                out.push_str(&rendered?);
            } else {
                ctx.push_scope(ctx.dot());
                let rendered = render_nodes(else_body, ctx);
                ctx.pop_scope();
                out.push_str(&rendered?);
            }
        }
        Node::Range { expr, key_var, value_var, body, else_body } => {
            let value = ctx.eval(expr)?;
            let items = range_items(&value);
            if items.is_empty() {
                ctx.push_scope(ctx.dot());
                let rendered = render_nodes(else_body, ctx);
                ctx.pop_scope();
                out.push_str(&rendered?);
            } else {
                for (key, item) in items {
                    ctx.push_scope(item);
                    if let Some(k) = key_var {
                        ctx.declare(k, key);
                    }
                    if let Some(v) = value_var {
                        ctx.declare(v, ctx.dot());
                    }
                    let rendered = render_nodes(body, ctx);
                    ctx.pop_scope();
                    out.push_str(&rendered?);
                    if ctx.abort.is_some() {
                        break;
                    }
                }
            }
        }
        Node::Block { name, ctx: ctx_pipeline, fallback } => {
            let dot = match ctx_pipeline {
                Some(e) => {
                    let v = ctx.eval(e)?;
                    if v.truthy() {
                        v
                    } else {
                        ctx.dot()
                    }
                }
                None => ctx.dot(),
            };
            let body = ctx.templates.get_define(name);
            ctx.push_scope(dot);
            let rendered = match body {
                Some(nodes) => render_nodes(&nodes, ctx),
                None => render_nodes(fallback, ctx),
            };
            ctx.pop_scope();
            out.push_str(&rendered?);
        }
        Node::TemplateInvoke { name, ctx: ctx_pipeline } => {
            let dot = match ctx_pipeline {
                Some(e) => ctx.eval(e)?,
                None => ctx.dot(),
            };
            let body = ctx.templates.get_define(name).or_else(|| ctx.templates.get(name));
            if let Some(nodes) = body {
                ctx.push_scope(dot);
                let rendered = render_nodes(&nodes, ctx);
                ctx.pop_scope();
                out.push_str(&rendered?);
            }
        }
        Node::Define { .. } => {}
    }
    Ok(())
}

/// Flattens a ranged value into `(key-or-index, item)` pairs, preserving
/// insertion order for maps (§5 "Ordering").
fn range_items(value: &TemplateValue) -> Vec<(TemplateValue, TemplateValue)> {
    match value {
        TemplateValue::PageArray(items) => items
            .iter()
            .enumerate()
            .map(|(i, p)| (TemplateValue::Number(i as i64), TemplateValue::Page(p.clone())))
            .collect(),
        TemplateValue::StringArray(items) => items
            .iter()
            .enumerate()
            .map(|(i, s)| (TemplateValue::Number(i as i64), TemplateValue::String(s.clone())))
            .collect(),
        TemplateValue::AnyArray(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (TemplateValue::Number(i as i64), v.clone()))
            .collect(),
        TemplateValue::MenuArray(items) => items
            .iter()
            .enumerate()
            .map(|(i, m)| (TemplateValue::Number(i as i64), TemplateValue::MenuEntry(m.clone())))
            .collect(),
        TemplateValue::Dict(d) => d
            .borrow()
            .iter()
            .map(|(k, v)| (TemplateValue::String(k.clone()), v.clone()))
            .collect(),
        TemplateValue::Taxonomies(map) | TemplateValue::TaxonomyTerms(map) => {
            map.iter().map(|(k, v)| (TemplateValue::String(k.clone()), v.clone())).collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parser::parse_template;

    fn render_src(src: &str, dot: TemplateValue) -> String {
        let store = TemplateStore::new();
        let nodes = parse_template(src).unwrap();
        let mut ctx = EvalContext::new(dot, &store);
        render_nodes(&nodes, &mut ctx).unwrap()
    }

    #[test]
    fn empty_template_renders_empty() {
        assert_eq!(render_src("", TemplateValue::Nil), "");
    }

    #[test]
    fn pipeline_lower_upper_scenario() {
        assert_eq!(render_src(r#"{{ "foo BAR" | lower | upper }}"#, TemplateValue::Nil), "FOO BAR");
    }

    #[test]
    fn range_with_key_value_scenario() {
        let out = render_src(
            r#"{{ range $i, $v := slice "a" "b" }}{{$i}}={{$v}};{{ end }}"#,
            TemplateValue::Nil,
        );
        assert_eq!(out, "0=a;1=b;");
    }

    #[test]
    fn range_over_empty_runs_else() {
        let out = render_src(r#"{{ range slice }}x{{ else }}empty{{ end }}"#, TemplateValue::Nil);
        assert_eq!(out, "empty");
    }

    #[test]
    fn deep_access_on_nil_is_nil_not_error() {
        let out = render_src("{{ .Foo.Bar.Baz }}", TemplateValue::Nil);
        assert_eq!(out, "");
    }

    #[test]
    fn if_else_chooses_branch() {
        assert_eq!(render_src("{{ if true }}yes{{ else }}no{{ end }}", TemplateValue::Nil), "yes");
        assert_eq!(render_src("{{ if false }}yes{{ else }}no{{ end }}", TemplateValue::Nil), "no");
    }

    #[test]
    fn html_value_is_not_double_escaped() {
        let out = render_src(r#"{{ safeHTML "<b>x</b>" }}"#, TemplateValue::Nil);
        assert_eq!(out, "<b>x</b>");
    }

    #[test]
    fn plain_string_output_is_escaped() {
        let out = render_src(r#"{{ "<b>" }}"#, TemplateValue::Nil);
        assert_eq!(out, "&lt;b&gt;");
    }
}
