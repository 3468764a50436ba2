use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info, warn};

use modscope::analysis::{resolve, version_marker, ObservationTable};
use modscope::export::{
    self, csv::CsvExporter, json::JsonExporter, DocumentMeta, ExportFormat, Exporter,
};
use modscope::logging::{init_logging, LogConfig};
use modscope::parser::{
    find_puppetfiles, parse_file, DeclarationParser, Diagnostic, ParserConfig, Severity,
};

#[derive(Parser)]
#[command(name = "modscope")]
#[command(author = "Zachary Woods <143150513+zach-fau@users.noreply.github.com>")]
#[command(version = "0.1.0")]
#[command(about = "Puppetfile dependency parser and module usage attribution", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse module declarations from Puppetfiles
    Parse {
        /// A Puppetfile, or a directory to search for Puppetfiles
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (json, csv)
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Treat `github` calls as unrecognized instead of as the Boxen alias
        #[arg(long)]
        no_github_alias: bool,
    },
    /// Attribute observed element usage to declared dependencies
    Attribute {
        /// Slug of the analyzed module (owner-name)
        #[arg(short, long)]
        module: String,

        /// Version of the analyzed module
        #[arg(long = "version", value_name = "VERSION")]
        release: String,

        /// Declared dependency slug; repeat or separate with commas, order breaks ties
        #[arg(short, long = "dependency", value_delimiter = ',')]
        dependencies: Vec<String>,

        /// Append the admin row recording that this version was itemized
        #[arg(long)]
        with_version_marker: bool,

        /// Output format (json, csv)
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// JSON usage table: { kind: { element: count } }
        observations: PathBuf,
    },
    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogConfig {
        verbose: cli.verbose,
    })?;

    match cli.command {
        Some(Commands::Parse {
            path,
            format,
            no_github_alias,
        }) => {
            let config = ParserConfig {
                github_alias: !no_github_alias,
            };
            run_parse(&path, format, config)
        }
        Some(Commands::Attribute {
            module,
            release,
            dependencies,
            with_version_marker,
            format,
            observations,
        }) => run_attribute(
            &module,
            &release,
            &dependencies,
            with_version_marker,
            format,
            &observations,
        ),
        Some(Commands::Version) => {
            println!("modscope v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            println!("modscope - Puppetfile dependency parser and usage attribution");
            println!("Run 'modscope parse <path>' to list declared modules");
            println!("Run 'modscope --help' for more information");
            Ok(())
        }
    }
}

/// Totals for one `parse` run.
#[derive(Debug, Default)]
struct ParseSummary {
    files: usize,
    skipped: usize,
    declarations: usize,
    diagnostics: usize,
}

fn run_parse(path: &Path, format: ExportFormat, config: ParserConfig) -> Result<()> {
    let files = find_puppetfiles(path);
    if files.is_empty() {
        bail!("No Puppetfile found under {}", path.display());
    }
    debug!(count = files.len(), root = %path.display(), "found Puppetfiles");

    let mut parser = DeclarationParser::with_config(config);
    if !parser.is_suitable() {
        warn!("Ruby grammar unavailable; every Puppetfile will be rejected");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = match format {
        ExportFormat::Json => parse_files(&JsonExporter, &mut parser, &files, &mut out)?,
        ExportFormat::Csv => parse_files(&CsvExporter, &mut parser, &files, &mut out)?,
    };
    out.flush()?;

    info!(
        files = summary.files,
        skipped = summary.skipped,
        declarations = summary.declarations,
        diagnostics = summary.diagnostics,
        "parse complete"
    );
    Ok(())
}

fn parse_files<E: Exporter, W: Write>(
    exporter: &E,
    parser: &mut DeclarationParser,
    files: &[PathBuf],
    out: &mut W,
) -> Result<ParseSummary> {
    let mut summary = ParseSummary::default();
    exporter.begin_declarations(out)?;

    for file in files {
        let parsed = match parse_file(parser, file) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "skipping Puppetfile");
                summary.skipped += 1;
                continue;
            }
        };

        let outcome = &parsed.outcome;
        for diagnostic in &outcome.diagnostics {
            report(file, diagnostic);
        }

        let repo_name = repo_name(file);
        let document = DocumentMeta {
            repo_name: repo_name.as_deref(),
            md5: Some(parsed.md5.as_str()),
        };
        exporter
            .export_declarations(&document, &outcome.declarations, out)
            .with_context(|| format!("Failed to write declarations for {}", file.display()))?;

        summary.files += 1;
        summary.declarations += outcome.declarations.len();
        summary.diagnostics += outcome.diagnostics.len();
    }

    Ok(summary)
}

fn report(file: &Path, diagnostic: &Diagnostic) {
    let line = diagnostic.line.unwrap_or(0);
    match diagnostic.severity {
        Severity::Error => error!(
            path = %file.display(),
            line,
            kind = ?diagnostic.kind,
            "{}",
            diagnostic.message
        ),
        Severity::Warning => warn!(
            path = %file.display(),
            line,
            kind = ?diagnostic.kind,
            "{}",
            diagnostic.message
        ),
    }
}

/// Name of the directory holding a Puppetfile, used as the repository name.
fn repo_name(file: &Path) -> Option<String> {
    file.canonicalize()
        .ok()?
        .parent()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn run_attribute(
    module: &str,
    release: &str,
    dependencies: &[String],
    with_version_marker: bool,
    format: ExportFormat,
    observations: &Path,
) -> Result<()> {
    let table = ObservationTable::from_file(observations)
        .with_context(|| format!("Failed to load usage table {}", observations.display()))?;

    let mut rows = resolve(module, release, dependencies, table.observations());
    let attributed = rows.iter().filter(|row| row.is_attributed()).count();
    if with_version_marker {
        rows.push(version_marker(module, release));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    export::export_usage(format, &rows, &mut out).context("Failed to write usage rows")?;
    out.flush()?;

    info!(
        module,
        version = release,
        observations = table.len(),
        attributed,
        "attribution complete"
    );
    Ok(())
}
