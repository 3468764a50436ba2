//! Export functionality for parse and attribution results.
//!
//! This module provides exporters for writing module declarations and
//! usage rows as newline-delimited JSON (the warehouse load format) or CSV.

pub mod csv;
pub mod json;

use crate::analysis::UsageRow;
use crate::parser::ModuleDeclaration;
use std::io::{self, Write};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Newline-delimited JSON - one record per line
    #[default]
    Json,
    /// CSV format - spreadsheet-friendly
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "ndjson" | "jsonl" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: json, csv",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Where a batch of declarations came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentMeta<'a> {
    /// Repository holding the Puppetfile.
    pub repo_name: Option<&'a str>,
    /// Hex MD5 of the Puppetfile content.
    pub md5: Option<&'a str>,
}

/// Trait for exporters.
pub trait Exporter {
    /// Write a header, if the format has one.
    fn begin_declarations<W: Write>(&self, _writer: &mut W) -> io::Result<()> {
        Ok(())
    }

    /// Write declarations found in one document.
    fn export_declarations<W: Write>(
        &self,
        document: &DocumentMeta<'_>,
        declarations: &[ModuleDeclaration],
        writer: &mut W,
    ) -> io::Result<()>;

    /// Write a header, if the format has one.
    fn begin_usage<W: Write>(&self, _writer: &mut W) -> io::Result<()> {
        Ok(())
    }

    /// Write attributed usage rows.
    fn export_usage<W: Write>(&self, rows: &[UsageRow], writer: &mut W) -> io::Result<()>;
}

/// Warehouse value of the `source` column for a declaration.
///
/// Registry modules have no location; the column records `forge` for them.
pub fn declaration_source(declaration: &ModuleDeclaration) -> Option<&str> {
    match &declaration.location {
        Some(location) => Some(location.as_str()),
        None if declaration.is_forge() => Some("forge"),
        None => None,
    }
}

/// Export declarations of a single document, header included.
pub fn export_declarations<W: Write>(
    format: ExportFormat,
    document: &DocumentMeta<'_>,
    declarations: &[ModuleDeclaration],
    writer: &mut W,
) -> io::Result<()> {
    match format {
        ExportFormat::Json => {
            let exporter = json::JsonExporter;
            exporter.begin_declarations(writer)?;
            exporter.export_declarations(document, declarations, writer)
        }
        ExportFormat::Csv => {
            let exporter = csv::CsvExporter;
            exporter.begin_declarations(writer)?;
            exporter.export_declarations(document, declarations, writer)
        }
    }
}

/// Export usage rows, header included.
pub fn export_usage<W: Write>(
    format: ExportFormat,
    rows: &[UsageRow],
    writer: &mut W,
) -> io::Result<()> {
    match format {
        ExportFormat::Json => {
            let exporter = json::JsonExporter;
            exporter.begin_usage(writer)?;
            exporter.export_usage(rows, writer)
        }
        ExportFormat::Csv => {
            let exporter = csv::CsvExporter;
            exporter.begin_usage(writer)?;
            exporter.export_usage(rows, writer)
        }
    }
}

/// Export usage rows to a string.
pub fn usage_to_string(format: ExportFormat, rows: &[UsageRow]) -> io::Result<String> {
    let mut buffer = Vec::new();
    export_usage(format, rows, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
