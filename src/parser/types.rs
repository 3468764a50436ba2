//! Shared types for Puppetfile parsing.
//!
//! This module defines the records produced by the declaration parser:
//! the parsed [`ModuleDeclaration`]s and the [`Diagnostic`]s reported
//! for statements that could not be turned into one.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Where a declared module's artifact comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The public module registry (the Forge). No location is recorded.
    Forge,
    /// A git repository, located by URL.
    Git,
    /// A subversion repository, located by URL.
    Svn,
    /// A directly named repository, as declared through the `github` alias.
    DirectRepo,
}

impl SourceKind {
    /// Returns the short label used in exported rows.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Forge => "forge",
            SourceKind::Git => "git",
            SourceKind::Svn => "svn",
            SourceKind::DirectRepo => "repo",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The version requested by a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// A pinned version, ref, tag, commit, branch or revision.
    Exact(String),
    /// Whatever is newest at install time.
    Latest,
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Exact(v) => f.write_str(v),
            VersionSpec::Latest => f.write_str("latest"),
        }
    }
}

impl Serialize for VersionSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One parsed `mod` statement.
///
/// The name is normalized to the `owner-name` convention, so
/// `mod 'puppetlabs/stdlib'` and `mod 'puppetlabs-stdlib'` produce the
/// same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDeclaration {
    /// The declared module slug.
    pub name: String,

    /// Where the module comes from.
    pub source_kind: SourceKind,

    /// URL or path for non-registry sources. `None` for the Forge.
    pub location: Option<String>,

    /// The requested version.
    pub version_spec: VersionSpec,

    /// 1-based line of the declaring call.
    pub line: usize,
}

impl ModuleDeclaration {
    /// Creates a new declaration, normalizing `/` in the name to `-`.
    pub fn new(
        name: &str,
        source_kind: SourceKind,
        location: Option<String>,
        version_spec: VersionSpec,
        line: usize,
    ) -> Self {
        Self {
            name: name.replace('/', "-"),
            source_kind,
            location,
            version_spec,
            line,
        }
    }

    /// Returns true if this module is installed from the registry.
    pub fn is_forge(&self) -> bool {
        self.source_kind == SourceKind::Forge
    }
}

impl fmt::Display for ModuleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version_spec, self.source_kind)?;
        if let Some(location) = &self.location {
            write!(f, " from {}", location)?;
        }
        Ok(())
    }
}

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The whole document was unusable.
    Error,
    /// A single statement was skipped.
    Warning,
}

/// The closed set of problems the parser reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The document could not be parsed at all.
    SyntaxError,
    /// The Ruby grammar could not be loaded into the parser.
    UnsupportedRuntime,
    /// `mod` was called with something other than a string literal name.
    NonStringModuleName,
    /// `mod` options matched none of the known source shapes.
    UnknownDeclarationShape,
    /// A call that is not part of the Puppetfile vocabulary.
    UnrecognizedInvocation,
    /// The `github` alias was called with the wrong argument types.
    MalformedAlias,
}

impl DiagnosticKind {
    /// Returns the severity that goes with this kind.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::SyntaxError | DiagnosticKind::UnsupportedRuntime => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

/// A problem found while parsing, returned as data rather than logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            line,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", level, line, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Everything one call to the parser produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub declarations: Vec<ModuleDeclaration>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    /// Returns true if the document itself was rejected.
    pub fn is_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Returns only the warning-level diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }
}

/// Parser behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Accept the Boxen `github(name, version, options)` alias.
    pub github_alias: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { github_alias: true }
    }
}

/// A value in a declaration's options map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A string or symbol literal.
    Text(String),
    /// An array literal.
    List(Vec<OptionValue>),
    /// `nil`, which counts as absent.
    Nil,
    /// Anything else, kept as source text.
    Other(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(s) => write!(f, "'{}'", s),
            OptionValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            OptionValue::Nil => f.write_str("nil"),
            OptionValue::Other(s) => f.write_str(s),
        }
    }
}

/// The second argument of a `mod` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// No second argument, an explicit `nil`, or `:latest`.
    Missing,
    /// A string or symbol, read as a registry version.
    ExactVersion(String),
    /// Keyword options such as `git:` and `tag:`.
    OptionsMap(BTreeMap<String, OptionValue>),
    /// Any other expression, kept as source text for reporting.
    Unsupported(String),
}

impl Payload {
    /// Renders the payload the way it would be written in the document.
    pub fn render(&self) -> String {
        match self {
            Payload::Missing => "nil".to_string(),
            Payload::ExactVersion(v) => format!("'{}'", v),
            Payload::OptionsMap(map) => {
                let pairs: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!(":{} => {}", k, v))
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            Payload::Unsupported(text) => text.clone(),
        }
    }
}
