//! Ruby syntax lowering using tree-sitter.
//!
//! A Puppetfile is Ruby, but only a handful of call shapes matter. This
//! module parses the text with the tree-sitter Ruby grammar (which never
//! evaluates anything) and lowers the concrete tree into a small call tree:
//! every receiverless method call becomes a [`CallNode`] with literal
//! arguments as [`Expr`]s, and every call nested inside it becomes a child.

use std::fmt;

use thiserror::Error;
use tree_sitter::{Node, Parser};

/// Errors that can occur while building the call tree.
#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error("Ruby grammar could not be loaded: {0}")]
    LanguageInit(String),

    #[error("Syntax error at line {line}")]
    Invalid { line: usize },

    #[error("Parser produced no syntax tree")]
    NoTree,
}

impl SyntaxError {
    /// Returns the line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            SyntaxError::Invalid { line } => Some(*line),
            _ => None,
        }
    }
}

/// A literal argument expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A string literal without interpolation.
    Str(String),
    /// A symbol, without its leading colon.
    Symbol(String),
    /// `nil`
    Nil,
    /// A hash literal or trailing keyword arguments, in source order.
    Map(Vec<(String, Expr)>),
    /// An array literal.
    List(Vec<Expr>),
    /// Any other expression, as source text.
    Other(String),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Str(s) => write!(f, "'{}'", s),
            Expr::Symbol(s) => write!(f, ":{}", s),
            Expr::Nil => f.write_str("nil"),
            Expr::Map(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, ":{} => {}", key, value)?;
                }
                f.write_str("}")
            }
            Expr::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Expr::Other(text) => f.write_str(text),
        }
    }
}

/// A receiverless call such as `mod 'puppetlabs/stdlib', '9.0.0'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallNode {
    /// The method name.
    pub name: String,
    /// Positional arguments; trailing keyword pairs are folded into one `Map`.
    pub args: Vec<Expr>,
    /// 1-based line of the call.
    pub line: usize,
    /// Calls nested in the arguments or block, in source order.
    pub children: Vec<CallNode>,
}

impl CallNode {
    /// Renders the call as `name(arg, arg)`.
    pub fn render(&self) -> String {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        format!("{}({})", self.name, args.join(", "))
    }
}

/// The lowered form of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTree {
    /// Top-level calls in source order.
    pub roots: Vec<CallNode>,
}

impl CallTree {
    /// Counts every call in the tree.
    pub fn call_count(&self) -> usize {
        fn count(node: &CallNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }
}

/// Wraps a tree-sitter parser configured for Ruby.
pub struct RubySyntax {
    parser: Parser,
}

impl RubySyntax {
    /// Create a parser for the Ruby grammar.
    pub fn new() -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_ruby::LANGUAGE.into())
            .map_err(|e| SyntaxError::LanguageInit(e.to_string()))?;

        Ok(Self { parser })
    }

    /// Parse source text into a call tree.
    ///
    /// Any ERROR or MISSING node in the concrete tree, or an `end` that
    /// closes nothing, rejects the whole document.
    pub fn parse(&mut self, source: &str) -> Result<CallTree, SyntaxError> {
        let tree = self.parser.parse(source, None).ok_or(SyntaxError::NoTree)?;
        let root = tree.root_node();

        if root.has_error() {
            let line = first_error_line(root).unwrap_or(1);
            return Err(SyntaxError::Invalid { line });
        }
        if let Some(line) = first_stray_end_line(root, source) {
            return Err(SyntaxError::Invalid { line });
        }

        let mut roots = Vec::new();
        collect_calls(root, source, &mut roots);
        Ok(CallTree { roots })
    }
}

/// Find the line of the first ERROR or MISSING node.
fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_error_line(child) {
            return Some(line);
        }
    }
    None
}

/// Node kinds whose last token is a closing `end`.
const END_CLOSED: [&str; 15] = [
    "do_block",
    "do",
    "method",
    "singleton_method",
    "class",
    "singleton_class",
    "module",
    "if",
    "unless",
    "while",
    "until",
    "for",
    "case",
    "case_match",
    "begin",
];

/// Node kinds that hold a list of statements.
const STATEMENT_LISTS: [&str; 6] = [
    "program",
    "body_statement",
    "block_body",
    "then",
    "else",
    "parenthesized_statements",
];

/// Find the line of an `end` that closes nothing.
///
/// The grammar recovers from an unbalanced `end` without an ERROR node,
/// while Ruby itself refuses to load such a file.
fn first_stray_end_line(node: Node, source: &str) -> Option<usize> {
    let parent_kind = node.parent().map(|p| p.kind());
    let stray = match node.kind() {
        "end" if !node.is_named() => !parent_kind.is_some_and(|k| END_CLOSED.contains(&k)),
        "identifier" => {
            node_text(node, source) == Some("end")
                && parent_kind.is_some_and(|k| STATEMENT_LISTS.contains(&k))
        }
        _ => false,
    };
    if stray {
        return Some(node.start_position().row + 1);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(line) = first_stray_end_line(child, source) {
            return Some(line);
        }
    }
    None
}

/// Recursively gather the outermost calls below `node`.
fn collect_calls(node: Node, source: &str, out: &mut Vec<CallNode>) {
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        match lower_call(child, source) {
            Some(call) => out.push(call),
            None => collect_calls(child, source, out),
        }
    }
}

/// Lower a `call` node without a receiver.
fn lower_call(node: Node, source: &str) -> Option<CallNode> {
    if node.kind() != "call" || node.child_by_field_name("receiver").is_some() {
        return None;
    }

    let method = node.child_by_field_name("method")?;
    let name = node_text(method, source)?.to_string();

    let args = node
        .child_by_field_name("arguments")
        .map(|args| lower_arguments(args, source))
        .unwrap_or_default();

    let mut children = Vec::new();
    collect_calls(node, source, &mut children);

    Some(CallNode {
        name,
        args,
        line: node.start_position().row + 1,
        children,
    })
}

/// Lower an argument list. Bare `key => value` pairs become one trailing map.
fn lower_arguments(node: Node, source: &str) -> Vec<Expr> {
    let mut args = Vec::new();
    let mut pairs = Vec::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "comment" => {}
            "pair" => {
                if let Some(pair) = lower_pair(child, source) {
                    pairs.push(pair);
                }
            }
            _ => args.push(lower_expr(child, source)),
        }
    }

    if !pairs.is_empty() {
        args.push(Expr::Map(pairs));
    }
    args
}

fn lower_pair(node: Node, source: &str) -> Option<(String, Expr)> {
    let key = node.child_by_field_name("key")?;
    let value = node.child_by_field_name("value")?;

    let key = match key.kind() {
        "hash_key_symbol" | "identifier" | "constant" => node_text(key, source)?.to_string(),
        "simple_symbol" => node_text(key, source)?.trim_start_matches(':').to_string(),
        "string" | "delimited_symbol" => string_literal(key, source)?,
        _ => node_text(key, source)?.to_string(),
    };

    Some((key, lower_expr(value, source)))
}

fn lower_expr(node: Node, source: &str) -> Expr {
    let raw = || Expr::Other(node_text(node, source).unwrap_or_default().to_string());

    match node.kind() {
        "string" => string_literal(node, source).map(Expr::Str).unwrap_or_else(raw),
        "simple_symbol" => node_text(node, source)
            .map(|s| Expr::Symbol(s.trim_start_matches(':').to_string()))
            .unwrap_or_else(raw),
        "delimited_symbol" => string_literal(node, source)
            .map(Expr::Symbol)
            .unwrap_or_else(raw),
        "chained_string" => {
            let mut cursor = node.walk();
            let parts: Option<Vec<String>> = node
                .named_children(&mut cursor)
                .map(|part| match part.kind() {
                    "string" => string_literal(part, source),
                    _ => None,
                })
                .collect();
            parts.map(|parts| Expr::Str(parts.concat())).unwrap_or_else(raw)
        }
        "nil" => Expr::Nil,
        "hash" => {
            let mut cursor = node.walk();
            let pairs = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() == "pair")
                .filter_map(|child| lower_pair(child, source))
                .collect();
            Expr::Map(pairs)
        }
        "array" => {
            let mut cursor = node.walk();
            let items = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                .map(|child| lower_expr(child, source))
                .collect();
            Expr::List(items)
        }
        _ => raw(),
    }
}

/// Extract the value of a string literal. Returns `None` for interpolated strings.
fn string_literal(node: Node, source: &str) -> Option<String> {
    let single_quoted = node_text(node, source)?.starts_with('\'');
    let mut value = String::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_content" => value.push_str(node_text(child, source)?),
            "escape_sequence" => value.push_str(&unescape(node_text(child, source)?)),
            _ => return None,
        }
    }

    if single_quoted {
        Some(unescape_single_quoted(&value))
    } else {
        Some(value)
    }
}

fn unescape(sequence: &str) -> String {
    match sequence {
        "\\n" => "\n".to_string(),
        "\\t" => "\t".to_string(),
        "\\r" => "\r".to_string(),
        "\\0" => "\0".to_string(),
        _ => sequence.strip_prefix('\\').unwrap_or(sequence).to_string(),
    }
}

/// Single-quoted strings only know the `\\` and `\'` escapes.
fn unescape_single_quoted(content: &str) -> String {
    let mut value = String::with_capacity(content.len());
    let mut chars = content.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '\'')) => value.push(next),
            Some(next) => {
                value.push('\\');
                value.push(next);
            }
            None => value.push('\\'),
        }
    }
    value
}

/// Extract the text content of a node.
fn node_text<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    source.get(node.start_byte()..node.end_byte())
}
