//! CSV export implementation.
//!
//! Exports declarations and usage rows in CSV format for spreadsheet use.

use super::{declaration_source, DocumentMeta, Exporter};
use crate::analysis::UsageRow;
use crate::parser::ModuleDeclaration;
use std::io::{self, Write};

/// CSV exporter implementation.
pub struct CsvExporter;

impl CsvExporter {
    /// Escape a field value for CSV format.
    ///
    /// Wraps the value in quotes if it contains commas, quotes, or newlines.
    fn escape_field(value: &str) -> String {
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

impl Exporter for CsvExporter {
    fn begin_declarations<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "repo_name,module,type,source,version,md5")
    }

    fn export_declarations<W: Write>(
        &self,
        document: &DocumentMeta<'_>,
        declarations: &[ModuleDeclaration],
        writer: &mut W,
    ) -> io::Result<()> {
        for decl in declarations {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                Self::escape_field(document.repo_name.unwrap_or("")),
                Self::escape_field(&decl.name),
                decl.source_kind.label(),
                Self::escape_field(declaration_source(decl).unwrap_or("")),
                Self::escape_field(&decl.version_spec.to_string()),
                document.md5.unwrap_or("")
            )?;
        }
        Ok(())
    }

    fn begin_usage<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "module,version,source,kind,element,count")
    }

    fn export_usage<W: Write>(&self, rows: &[UsageRow], writer: &mut W) -> io::Result<()> {
        for row in rows {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                Self::escape_field(&row.module),
                Self::escape_field(&row.version),
                Self::escape_field(row.source.as_deref().unwrap_or("")),
                Self::escape_field(&row.kind),
                Self::escape_field(&row.element),
                row.count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{resolve, UsageObservation};
    use crate::export::{export_declarations, ExportFormat};
    use crate::parser::DeclarationParser;

    #[test]
    fn test_csv_usage_rows() {
        let rows = resolve(
            "acme-widget",
            "1.0.0",
            &["acme-mysql"],
            &[
                UsageObservation::new("functions", "mysql_password", 2),
                UsageObservation::new("types", "file", 7),
            ],
        );
        let mut output = Vec::new();

        CsvExporter.begin_usage(&mut output).unwrap();
        CsvExporter.export_usage(&rows, &mut output).unwrap();

        let csv_str = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = csv_str.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "module,version,source,kind,element,count");
        assert_eq!(lines[1], "acme-widget,1.0.0,acme-mysql,function,mysql_password,2");
        assert_eq!(lines[2], "acme-widget,1.0.0,,type,file,7");
    }

    #[test]
    fn test_csv_declarations() {
        let outcome = DeclarationParser::new().parse(
            "mod 'puppetlabs-stdlib', '9.4.1'\nmod 'acme-x', :svn => 'svn://example.com/x', :rev => '7'\n",
        );
        let mut output = Vec::new();

        export_declarations(
            ExportFormat::Csv,
            &DocumentMeta {
                repo_name: Some("acme/control"),
                md5: Some("abc123"),
            },
            &outcome.declarations,
            &mut output,
        )
        .unwrap();

        let csv_str = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = csv_str.lines().collect();

        assert_eq!(lines[0], "repo_name,module,type,source,version,md5");
        assert_eq!(lines[1], "acme/control,puppetlabs-stdlib,forge,forge,9.4.1,abc123");
        assert_eq!(lines[2], "acme/control,acme-x,svn,svn://example.com/x,7,abc123");
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(CsvExporter::escape_field("simple"), "simple");
        assert_eq!(CsvExporter::escape_field("with,comma"), "\"with,comma\"");
        assert_eq!(CsvExporter::escape_field("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(CsvExporter::escape_field("with\nnewline"), "\"with\nnewline\"");
    }
}
