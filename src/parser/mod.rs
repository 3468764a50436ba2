//! Parser module for modscope.
//!
//! This module recovers module declarations from Puppetfiles without
//! executing them. The document is parsed with tree-sitter's Ruby grammar,
//! lowered into a small call tree, and each recognized call shape is
//! classified into a [`ModuleDeclaration`].
//!
//! # Recognized Calls
//!
//! - **mod** - a module declaration (Forge, git, svn or direct repository)
//! - **forge**, **moduledir** - environment settings, skipped
//! - **github** - the Boxen alias, optional
//!
//! Anything else is reported as a diagnostic and skipped.
//!
//! # Example
//!
//! ```
//! use modscope::parser::{DeclarationParser, SourceKind};
//!
//! let mut parser = DeclarationParser::new();
//! let outcome = parser.parse(
//!     "mod 'acme-profile', :git => 'https://example.com/profile.git', :tag => 'v2'\n",
//! );
//!
//! let git: Vec<_> = outcome.declarations.iter()
//!     .filter(|d| d.source_kind == SourceKind::Git)
//!     .collect();
//! assert_eq!(git.len(), 1);
//! ```

pub mod files;
pub mod puppetfile;
pub mod syntax;
pub mod types;

// Re-export commonly used types for convenience
pub use files::{content_md5, find_puppetfiles, parse_file, ParseError, ParseResult, ParsedFile};
pub use puppetfile::DeclarationParser;
pub use types::{
    Diagnostic, DiagnosticKind, ModuleDeclaration, ParseOutcome, ParserConfig, Severity,
    SourceKind, VersionSpec,
};
