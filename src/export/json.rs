//! JSON export implementation.
//!
//! Writes newline-delimited JSON: one object per line, no enclosing array,
//! which is what the warehouse loader expects.

use super::{declaration_source, DocumentMeta, Exporter};
use crate::analysis::UsageRow;
use crate::parser::ModuleDeclaration;
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Serializable declaration for JSON output.
#[derive(Serialize)]
struct JsonDeclaration<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_name: Option<&'a str>,
    module: &'a str,
    #[serde(rename = "type")]
    source_type: &'static str,
    source: Option<&'a str>,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    md5: Option<&'a str>,
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer)
}

impl Exporter for JsonExporter {
    fn export_declarations<W: Write>(
        &self,
        document: &DocumentMeta<'_>,
        declarations: &[ModuleDeclaration],
        writer: &mut W,
    ) -> io::Result<()> {
        for decl in declarations {
            let row = JsonDeclaration {
                repo_name: document.repo_name,
                module: &decl.name,
                source_type: decl.source_kind.label(),
                source: declaration_source(decl),
                version: decl.version_spec.to_string(),
                md5: document.md5,
            };
            write_line(writer, &row)?;
        }
        Ok(())
    }

    fn export_usage<W: Write>(&self, rows: &[UsageRow], writer: &mut W) -> io::Result<()> {
        for row in rows {
            write_line(writer, row)?;
        }
        Ok(())
    }
}
