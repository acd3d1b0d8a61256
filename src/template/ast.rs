//! AST node and expression types (component E, §4.5).

#[derive(Clone, Debug)]
pub enum Expr {
    /// `.`, `$`, `.foo.bar`, `$x.field`, bare identifiers/keywords, string
    /// and numeric literals — anything that is a value lookup rather than a
    /// call (§4.6 evaluation rules).
    Token(String),
    /// `(<expr>).a.b.c`: a parenthesized sub-pipeline followed by one or
    /// more field accesses. The final segment, in call position, doubles as
    /// a method name (§4.5).
    Access { base: Box<Expr>, path: Vec<String> },
    /// A command: `head arg1 arg2 ...`. The piped-in value (if any) is
    /// appended by the evaluator as the final argument.
    Command { head: Box<Expr>, args: Vec<Expr> },
    /// A left-to-right `|`-separated sequence of commands.
    Pipeline(Vec<Expr>),
}

#[derive(Clone, Debug)]
pub enum Node {
    Text(String),
    /// `{{ pipeline }}`; output is HTML-escaped unless the pipeline value is
    /// already `Html`.
    Output(Expr),
    /// `{{ $x := pipeline }}` (declare) or `{{ $x = pipeline }}` (assign).
    Assignment { name: String, pipeline: Expr, declare: bool },
    /// `{{ template "name" pipeline }}`.
    TemplateInvoke { name: String, ctx: Option<Expr> },
    If { cond: Expr, then_body: Vec<Node>, else_body: Vec<Node> },
    With { expr: Expr, then_body: Vec<Node>, else_body: Vec<Node> },
    Range {
        expr: Expr,
        key_var: Option<String>,
        value_var: Option<String>,
        body: Vec<Node>,
        else_body: Vec<Node>,
    },
    Block { name: String, ctx: Option<Expr>, fallback: Vec<Node> },
    /// `{{ define "name" }}...{{ end }}`: registers `body` in the owning
    /// template's defines map; emits no output itself.
    Define { name: String, body: Vec<Node> },
}
