//! Declaration parser for Puppetfiles.
//!
//! Walks the call tree of one document and turns `mod` statements (and the
//! Boxen `github` alias) into [`ModuleDeclaration`]s. Nothing in the
//! document is ever evaluated; problems with individual statements are
//! returned as [`Diagnostic`]s and never stop the walk.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::syntax::{CallNode, Expr, RubySyntax};
use super::types::{
    Diagnostic, DiagnosticKind, ModuleDeclaration, OptionValue, ParseOutcome, ParserConfig,
    Payload, SourceKind, VersionSpec,
};

/// Key the `github` alias adds to route a declaration to [`SourceKind::DirectRepo`].
pub const BOXEN_MARKER: &str = "boxen";

/// Version keys for git sources, highest precedence first.
const GIT_VERSION_KEYS: [&str; 4] = ["ref", "tag", "commit", "branch"];

/// Version keys for svn sources, highest precedence first.
const SVN_VERSION_KEYS: [&str; 2] = ["rev", "revision"];

/// Parser for Puppetfile documents.
///
/// # Example
///
/// ```
/// use modscope::parser::{DeclarationParser, SourceKind, VersionSpec};
///
/// let mut parser = DeclarationParser::new();
/// let outcome = parser.parse("mod 'puppetlabs/stdlib', '9.4.1'\n");
///
/// assert_eq!(outcome.declarations.len(), 1);
/// assert_eq!(outcome.declarations[0].name, "puppetlabs-stdlib");
/// assert_eq!(outcome.declarations[0].source_kind, SourceKind::Forge);
/// assert_eq!(
///     outcome.declarations[0].version_spec,
///     VersionSpec::Exact("9.4.1".to_string())
/// );
/// ```
pub struct DeclarationParser {
    syntax: Result<RubySyntax, String>,
    config: ParserConfig,
}

impl DeclarationParser {
    /// Create a parser with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a parser with explicit configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        let syntax = RubySyntax::new().map_err(|e| e.to_string());
        Self { syntax, config }
    }

    /// Returns true if the Ruby grammar loaded and documents can be parsed.
    pub fn is_suitable(&self) -> bool {
        self.syntax.is_ok()
    }

    /// Parse one document.
    ///
    /// A document that does not parse yields exactly one error diagnostic
    /// and no declarations.
    pub fn parse(&mut self, document: &str) -> ParseOutcome {
        let syntax = match &mut self.syntax {
            Ok(syntax) => syntax,
            Err(message) => {
                return ParseOutcome::fatal(Diagnostic::new(
                    DiagnosticKind::UnsupportedRuntime,
                    message.clone(),
                    None,
                ));
            }
        };

        let tree = match syntax.parse(document) {
            Ok(tree) => tree,
            Err(err) => {
                debug!(error = %err, "rejecting Puppetfile");
                return ParseOutcome::fatal(Diagnostic::new(
                    DiagnosticKind::SyntaxError,
                    err.to_string(),
                    err.line(),
                ));
            }
        };

        let mut walk = Walk {
            config: self.config,
            outcome: ParseOutcome::default(),
        };
        for call in &tree.roots {
            walk.visit(call);
        }

        debug!(
            calls = tree.call_count(),
            declarations = walk.outcome.declarations.len(),
            diagnostics = walk.outcome.diagnostics.len(),
            "parsed Puppetfile"
        );
        walk.outcome
    }
}

impl Default for DeclarationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseOutcome {
    fn fatal(diagnostic: Diagnostic) -> Self {
        Self {
            declarations: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }
}

/// Traversal state for one document.
struct Walk {
    config: ParserConfig,
    outcome: ParseOutcome,
}

impl Walk {
    /// Depth-first, pre-order visit of a call and everything nested in it.
    fn visit(&mut self, call: &CallNode) {
        match call.name.as_str() {
            "mod" => {
                let mut args = call.args.iter();
                let name = args.next();
                let payload = payload_from(args.next());
                self.add_module(name, payload, call.line);
            }
            "forge" | "moduledir" => {
                trace!(call = %call.name, line = call.line, "skipping environment directive");
            }
            "github" if self.config.github_alias => self.add_github(call),
            _ => self.warn(
                DiagnosticKind::UnrecognizedInvocation,
                format!("Unexpected invocation of {}", call.render()),
                call.line,
            ),
        }

        for child in &call.children {
            self.visit(child);
        }
    }

    fn add_module(&mut self, name: Option<&Expr>, payload: Payload, line: usize) {
        match name {
            Some(Expr::Str(name)) if !name.is_empty() => self.classify(name, payload, line),
            other => {
                let rendered = other.map(|e| e.to_string()).unwrap_or_default();
                self.warn(
                    DiagnosticKind::NonStringModuleName,
                    format!("Non string module name in mod({})", rendered),
                    line,
                );
            }
        }
    }

    /// Handle the Boxen `github(name, version, options)` alias.
    fn add_github(&mut self, call: &CallNode) {
        let mut args = call.args.iter();
        let name = args.next();
        let version = match args.next() {
            None | Some(Expr::Nil) => Some(OptionValue::Nil),
            Some(Expr::Str(v)) => Some(OptionValue::Text(v.clone())),
            Some(_) => None,
        };
        let options = match args.next() {
            None => Some(BTreeMap::new()),
            Some(Expr::Map(pairs)) => Some(options_map(pairs)),
            Some(_) => None,
        };

        match (name, version, options) {
            (Some(Expr::Str(name)), Some(version), Some(mut options)) if !name.is_empty() => {
                options.insert(
                    BOXEN_MARKER.to_string(),
                    OptionValue::Text(BOXEN_MARKER.to_string()),
                );
                options.insert("version".to_string(), version);
                self.classify(name, Payload::OptionsMap(options), call.line);
            }
            _ => self.warn(
                DiagnosticKind::MalformedAlias,
                format!("Malformed github alias: {}", call.render()),
                call.line,
            ),
        }
    }

    fn classify(&mut self, name: &str, payload: Payload, line: usize) {
        match classify(name, payload, line) {
            Ok(declaration) => self.outcome.declarations.push(declaration),
            Err(diagnostic) => self.outcome.diagnostics.push(diagnostic),
        }
    }

    fn warn(&mut self, kind: DiagnosticKind, message: String, line: usize) {
        self.outcome
            .diagnostics
            .push(Diagnostic::new(kind, message, Some(line)));
    }
}

/// Decide what kind of declaration `mod(name, payload)` is.
fn classify(name: &str, payload: Payload, line: usize) -> Result<ModuleDeclaration, Diagnostic> {
    let forge = |version| ModuleDeclaration::new(name, SourceKind::Forge, None, version, line);

    match payload {
        Payload::Missing => Ok(forge(VersionSpec::Latest)),
        Payload::ExactVersion(version) => Ok(forge(VersionSpec::Exact(version))),
        Payload::OptionsMap(options) => classify_options(name, &options, line),
        unsupported @ Payload::Unsupported(_) => Err(Diagnostic::new(
            DiagnosticKind::UnknownDeclarationShape,
            format!("Unknown format: mod('{}', {})", name, unsupported.render()),
            Some(line),
        )),
    }
}

fn classify_options(
    name: &str,
    options: &BTreeMap<String, OptionValue>,
    line: usize,
) -> Result<ModuleDeclaration, Diagnostic> {
    let (kind, location, version) = if let Some(git) = options.get("git") {
        (SourceKind::Git, plain(git), first_present(options, &GIT_VERSION_KEYS))
    } else if let Some(svn) = options.get("svn") {
        (SourceKind::Svn, plain(svn), first_present(options, &SVN_VERSION_KEYS))
    } else if options.contains_key(BOXEN_MARKER) || options.contains_key("repo") {
        (
            SourceKind::DirectRepo,
            options.get("repo").and_then(plain),
            first_present(options, &["version"]),
        )
    } else {
        return Err(Diagnostic::new(
            DiagnosticKind::UnknownDeclarationShape,
            format!(
                "Unknown args format: mod('{}', {})",
                name,
                Payload::OptionsMap(options.clone()).render()
            ),
            Some(line),
        ));
    };

    Ok(ModuleDeclaration::new(name, kind, location, version, line))
}

/// The first of `keys` holding a non-nil value wins.
fn first_present(options: &BTreeMap<String, OptionValue>, keys: &[&str]) -> VersionSpec {
    keys.iter()
        .find_map(|key| options.get(*key).and_then(plain))
        .map(VersionSpec::Exact)
        .unwrap_or(VersionSpec::Latest)
}

/// Plain text of an option value; `nil` counts as absent.
fn plain(value: &OptionValue) -> Option<String> {
    match value {
        OptionValue::Nil => None,
        OptionValue::Text(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn payload_from(arg: Option<&Expr>) -> Payload {
    match arg {
        None | Some(Expr::Nil) => Payload::Missing,
        Some(Expr::Symbol(s)) if s == "latest" => Payload::Missing,
        Some(Expr::Str(s)) | Some(Expr::Symbol(s)) => Payload::ExactVersion(s.clone()),
        Some(Expr::Map(pairs)) => Payload::OptionsMap(options_map(pairs)),
        Some(other) => Payload::Unsupported(other.to_string()),
    }
}

fn options_map(pairs: &[(String, Expr)]) -> BTreeMap<String, OptionValue> {
    pairs
        .iter()
        .map(|(key, value)| (key.clone(), option_value(value)))
        .collect()
}

fn option_value(expr: &Expr) -> OptionValue {
    match expr {
        Expr::Str(s) | Expr::Symbol(s) => OptionValue::Text(s.clone()),
        Expr::Nil => OptionValue::Nil,
        Expr::List(items) => OptionValue::List(items.iter().map(option_value).collect()),
        other => OptionValue::Other(other.to_string()),
    }
}
