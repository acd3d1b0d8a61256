//! Two-stage parser: segment scan → token scan → recursive-descent AST build
//! (component E, §4.5).

use super::ast::{Expr, Node};
use super::lexer::{scan_segments, scan_tokens, Segment, Token};

#[derive(Debug, Clone)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "template parse error: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

fn err(msg: impl Into<String>) -> ParseError {
    ParseError(msg.into())
}

pub fn unquote(word: &str) -> String {
    if word.len() >= 2 {
        let bytes = word.as_bytes();
        let first = bytes[0];
        if (first == b'"' || first == b'\'' || first == b'`') && bytes[bytes.len() - 1] == first {
            return word[1..word.len() - 1].to_string();
        }
    }
    word.to_string()
}

/// A degenerate Action whose trimmed body is a comment (§4.5): parses to no
/// AST node at all.
fn is_comment(action: &str) -> bool {
    action.starts_with("/*") && action.ends_with("*/")
}

struct ActionParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ActionParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn expect_word(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token::Word(w)) => Ok(w),
            other => Err(err(format!("expected word, got {:?}", other))),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_pipeline_stopping(&[Token::RParen])?;
                match self.advance() {
                    Some(Token::RParen) => {}
                    other => return Err(err(format!("expected ')', got {:?}", other))),
                }
                if let Some(Token::Word(w)) = self.peek() {
                    if let Some(rest) = w.strip_prefix('.') {
                        let path: Vec<String> = rest.split('.').filter(|s| !s.is_empty()).map(String::from).collect();
                        self.advance();
                        return Ok(Expr::Access { base: Box::new(inner), path });
                    }
                }
                Ok(inner)
            }
            Some(Token::Word(w)) => {
                let w = w.clone();
                self.advance();
                Ok(Expr::Token(w))
            }
            other => Err(err(format!("expected expression, got {:?}", other))),
        }
    }

    fn is_arg_start(&self) -> bool {
        matches!(self.peek(), Some(Token::Word(_)) | Some(Token::LParen))
    }

    fn parse_command(&mut self) -> Result<Expr, ParseError> {
        let head = self.parse_primary()?;
        let mut args = Vec::new();
        while self.is_arg_start() {
            args.push(self.parse_primary()?);
        }
        if args.is_empty() {
            Ok(head)
        } else {
            Ok(Expr::Command { head: Box::new(head), args })
        }
    }

    /// Parses a `|`-separated pipeline, stopping (without consuming) at any
    /// token in `stop` or at end of input.
    fn parse_pipeline_stopping(&mut self, stop: &[Token]) -> Result<Expr, ParseError> {
        let mut commands = vec![self.parse_command()?];
        loop {
            match self.peek() {
                Some(Token::Pipe) => {
                    self.advance();
                    commands.push(self.parse_command()?);
                }
                Some(t) if stop.contains(t) => break,
                None => break,
                Some(other) => return Err(err(format!("unexpected token after command: {:?}", other))),
            }
        }
        if commands.len() == 1 {
            Ok(commands.into_iter().next().unwrap())
        } else {
            Ok(Expr::Pipeline(commands))
        }
    }

    fn parse_pipeline(&mut self) -> Result<Expr, ParseError> {
        self.parse_pipeline_stopping(&[])
    }
}

fn parse_assignment_prefix(tokens: &[Token]) -> Option<(String, bool)> {
    if let (Some(Token::Word(name)), Some(op)) = (tokens.first(), tokens.get(1)) {
        if name.starts_with('$') {
            match op {
                Token::ColonEq => return Some((name.clone(), true)),
                Token::Eq => return Some((name.clone(), false)),
                _ => {}
            }
        }
    }
    None
}

enum ActionHeader {
    If,
    Else,
    ElseIf,
    Range,
    With,
    Define,
    Block,
    Template,
    End,
    Assignment { name: String, declare: bool },
    Plain,
}

fn classify(tokens: &[Token]) -> ActionHeader {
    if let Some((name, declare)) = parse_assignment_prefix(tokens) {
        return ActionHeader::Assignment { name, declare };
    }
    match tokens.first() {
        Some(Token::Word(w)) if w == "if" => ActionHeader::If,
        Some(Token::Word(w)) if w == "range" => ActionHeader::Range,
        Some(Token::Word(w)) if w == "with" => ActionHeader::With,
        Some(Token::Word(w)) if w == "define" => ActionHeader::Define,
        Some(Token::Word(w)) if w == "block" => ActionHeader::Block,
        Some(Token::Word(w)) if w == "template" => ActionHeader::Template,
        Some(Token::Word(w)) if w == "end" => ActionHeader::End,
        Some(Token::Word(w)) if w == "else" => {
            if matches!(tokens.get(1), Some(Token::Word(w2)) if w2 == "if") {
                ActionHeader::ElseIf
            } else {
                ActionHeader::Else
            }
        }
        _ => ActionHeader::Plain,
    }
}

/// The flat token stream produced by the segment/token scan, as a cursor
/// the recursive-descent builder advances over.
struct Items {
    items: Vec<Segment>,
    pos: usize,
}

enum StopReason {
    End,
    Else,
    ElseIf(Expr),
    Eof,
}

impl Items {
    fn parse_block(&mut self, stop_on: StopOn) -> Result<(Vec<Node>, StopReason), ParseError> {
        let mut nodes = Vec::new();
        loop {
            if self.pos >= self.items.len() {
                if stop_on == StopOn::Anything {
                    return Ok((nodes, StopReason::Eof));
                }
                return Err(err("unexpected end of template, missing {{end}}"));
            }
            match &self.items[self.pos] {
                Segment::Text(t) => {
                    nodes.push(Node::Text(t.clone()));
                    self.pos += 1;
                }
                Segment::Action(body) => {
                    if is_comment(body) {
                        self.pos += 1;
                        continue;
                    }
                    let tokens = scan_tokens(body);
                    match classify(&tokens) {
                        ActionHeader::End => {
                            self.pos += 1;
                            return Ok((nodes, StopReason::End));
                        }
                        ActionHeader::Else if stop_on == StopOn::EndOrElse => {
                            self.pos += 1;
                            return Ok((nodes, StopReason::Else));
                        }
                        ActionHeader::ElseIf if stop_on == StopOn::EndOrElse => {
                            let mut ap = ActionParser::new(tokens[2..].to_vec());
                            let cond = ap.parse_pipeline()?;
                            self.pos += 1;
                            return Ok((nodes, StopReason::ElseIf(cond)));
                        }
                        _ => {
                            self.pos += 1;
                            nodes.push(self.build_node(body, tokens)?);
                        }
                    }
                }
            }
        }
    }

    fn build_node(&mut self, _raw: &str, tokens: Vec<Token>) -> Result<Node, ParseError> {
        match classify(&tokens) {
            ActionHeader::Assignment { name, declare } => {
                let mut ap = ActionParser::new(tokens[2..].to_vec());
                let pipeline = ap.parse_pipeline()?;
                Ok(Node::Assignment { name, pipeline, declare })
            }
            ActionHeader::If => {
                let mut ap = ActionParser::new(tokens[1..].to_vec());
                let cond = ap.parse_pipeline()?;
                self.parse_if_tail(cond)
            }
            ActionHeader::Range => {
                let rest = &tokens[1..];
                let (key_var, value_var, expr_tokens) = split_range_vars(rest);
                let mut ap = ActionParser::new(expr_tokens);
                let expr = ap.parse_pipeline()?;
                let (body, reason) = self.parse_block(StopOn::EndOrElse)?;
                let else_body = match reason {
                    StopReason::Else => self.parse_block(StopOn::EndOnly)?.0,
                    _ => Vec::new(),
                };
                Ok(Node::Range { expr, key_var, value_var, body, else_body })
            }
            ActionHeader::With => {
                let mut ap = ActionParser::new(tokens[1..].to_vec());
                let expr = ap.parse_pipeline()?;
                let (then_body, reason) = self.parse_block(StopOn::EndOrElse)?;
                let else_body = match reason {
                    StopReason::Else => self.parse_block(StopOn::EndOnly)?.0,
                    _ => Vec::new(),
                };
                Ok(Node::With { expr, then_body, else_body })
            }
            ActionHeader::Define => {
                let name = unquote(&expect_first_word(&tokens[1..])?);
                let (body, _) = self.parse_block(StopOn::EndOnly)?;
                Ok(Node::Define { name, body })
            }
            ActionHeader::Block => {
                let rest = &tokens[1..];
                let name = unquote(&expect_first_word(rest)?);
                let ctx_tokens = &rest[1..];
                let ctx = if ctx_tokens.is_empty() {
                    None
                } else {
                    Some(ActionParser::new(ctx_tokens.to_vec()).parse_pipeline()?)
                };
                let (fallback, _) = self.parse_block(StopOn::EndOnly)?;
                Ok(Node::Block { name, ctx, fallback })
            }
            ActionHeader::Template => {
                let rest = &tokens[1..];
                let name = unquote(&expect_first_word(rest)?);
                let ctx_tokens = &rest[1..];
                let ctx = if ctx_tokens.is_empty() {
                    None
                } else {
                    Some(ActionParser::new(ctx_tokens.to_vec()).parse_pipeline()?)
                };
                Ok(Node::TemplateInvoke { name, ctx })
            }
            ActionHeader::Else | ActionHeader::ElseIf | ActionHeader::End => {
                Err(err("unexpected `else`/`end` outside a block"))
            }
            ActionHeader::Plain => {
                let mut ap = ActionParser::new(tokens);
                let pipeline = ap.parse_pipeline()?;
                Ok(Node::Output(pipeline))
            }
        }
    }

    /// `else if` chains desugar into nested `If` nodes in the else branch
    /// (§4.5).
    fn parse_if_tail(&mut self, cond: Expr) -> Result<Node, ParseError> {
        let (then_body, reason) = self.parse_block(StopOn::EndOrElse)?;
        let else_body = match reason {
            StopReason::Else => self.parse_block(StopOn::EndOnly)?.0,
            StopReason::ElseIf(next_cond) => vec![self.parse_if_tail(next_cond)?],
            _ => Vec::new(),
        };
        Ok(Node::If { cond, then_body, else_body })
    }
}

#[derive(PartialEq, Clone, Copy)]
enum StopOn {
    EndOnly,
    EndOrElse,
    Anything,
}

fn expect_first_word(tokens: &[Token]) -> Result<String, ParseError> {
    match tokens.first() {
        Some(Token::Word(w)) => Ok(w.clone()),
        other => Err(err(format!("expected a name, got {:?}", other))),
    }
}

/// `range $k, $v := expr` / `range $v := expr` / `range expr`.
fn split_range_vars(tokens: &[Token]) -> (Option<String>, Option<String>, Vec<Token>) {
    if let (Some(Token::Word(k)), Some(Token::Comma), Some(Token::Word(v)), Some(Token::ColonEq)) =
        (tokens.first(), tokens.get(1), tokens.get(2), tokens.get(3))
    {
        if k.starts_with('$') && v.starts_with('$') {
            return (Some(k.clone()), Some(v.clone()), tokens[4..].to_vec());
        }
    }
    if let (Some(Token::Word(v)), Some(Token::ColonEq)) = (tokens.first(), tokens.get(1)) {
        if v.starts_with('$') {
            return (None, Some(v.clone()), tokens[2..].to_vec());
        }
    }
    (None, None, tokens.to_vec())
}

pub fn parse_template(src: &str) -> Result<Vec<Node>, ParseError> {
    let segments = scan_segments(src);
    let mut items = Items { items: segments, pos: 0 };
    let (nodes, _) = items.parse_block(StopOn::Anything)?;
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_template_parses_to_no_nodes() {
        assert_eq!(parse_template("").unwrap().len(), 0);
    }

    #[test]
    fn output_pipeline_parses() {
        let nodes = parse_template(r#"{{ "foo BAR" | lower | upper }}"#).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0], Node::Output(_)));
    }

    #[test]
    fn comment_action_drops_entirely() {
        let nodes = parse_template("a{{/* skip me */}}b").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(matches!(&nodes[0], Node::Text(t) if t == "a"));
        assert!(matches!(&nodes[1], Node::Text(t) if t == "b"));
    }

    #[test]
    fn if_else_if_chains_nest() {
        let nodes = parse_template("{{ if .A }}a{{ else if .B }}b{{ else }}c{{ end }}").unwrap();
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::If { else_body, .. } => {
                assert_eq!(else_body.len(), 1);
                assert!(matches!(&else_body[0], Node::If { .. }));
            }
            _ => panic!("expected If"),
        }
    }

    #[test]
    fn range_with_key_value_vars() {
        let nodes = parse_template(r#"{{ range $i, $v := slice "a" "b" }}{{$i}}={{$v}};{{ end }}"#).unwrap();
        match &nodes[0] {
            Node::Range { key_var, value_var, .. } => {
                assert_eq!(key_var.as_deref(), Some("$i"));
                assert_eq!(value_var.as_deref(), Some("$v"));
            }
            _ => panic!("expected Range"),
        }
    }

    #[test]
    fn define_registers_named_block() {
        let nodes = parse_template(r#"{{ define "foo" }}hi{{ end }}"#).unwrap();
        match &nodes[0] {
            Node::Define { name, body } => {
                assert_eq!(name, "foo");
                assert_eq!(body.len(), 1);
            }
            _ => panic!("expected Define"),
        }
    }

    #[test]
    fn access_expr_on_parenthesized_pipeline() {
        let nodes = parse_template(r#"{{ (.Site.GetPage "/x").Title }}"#).unwrap();
        match &nodes[0] {
            Node::Output(Expr::Access { path, .. }) => assert_eq!(path, &vec!["Title".to_string()]),
            other => panic!("expected Access output, got {:?}", other),
        }
    }

    #[test]
    fn whitespace_trim_markers_are_handled_before_tokenizing() {
        let nodes = parse_template("a  {{- .X -}}  b").unwrap();
        assert!(matches!(&nodes[0], Node::Text(t) if t == "a"));
        assert!(matches!(&nodes[2], Node::Text(t) if t == "b"));
    }
}
