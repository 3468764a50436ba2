//! Reading Puppetfiles from disk.
//!
//! The parser itself works on text; these helpers give the command line a
//! way to feed it local files and checked-out control repositories.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::puppetfile::DeclarationParser;
use super::types::ParseOutcome;

/// The conventional file name of a declaration document.
pub const PUPPETFILE: &str = "Puppetfile";

/// Errors that can occur while loading documents.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read the file from disk.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The document is not valid UTF-8 text.
    #[error("Puppetfile is not valid UTF-8: {path}")]
    NotText { path: String },
}

/// Result type alias for loading operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A Puppetfile read from disk, with what the parser made of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
    /// Hex MD5 of the file content. Identical files share it across repositories.
    pub md5: String,
    pub outcome: ParseOutcome,
}

/// Hex MD5 digest of a document.
pub fn content_md5(content: &str) -> String {
    format!("{:x}", md5::compute(content))
}

/// Parses a Puppetfile from a file path.
pub fn parse_file(parser: &mut DeclarationParser, path: &Path) -> ParseResult<ParsedFile> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|_| ParseError::NotText {
        path: path.display().to_string(),
    })?;

    Ok(ParsedFile {
        md5: content_md5(&content),
        outcome: parser.parse(&content),
    })
}

/// Finds every Puppetfile below `root`, in a stable order.
///
/// A path that is itself a file is returned as-is, whatever its name.
pub fn find_puppetfiles(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == PUPPETFILE)
        .map(|e| e.into_path())
        .collect();

    found.sort();
    found
}

/// Check if a directory should be ignored during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(name.as_ref(), ".git" | "vendor" | "modules" | "target")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PUPPETFILE);
        fs::write(&path, "mod 'puppetlabs-stdlib', '9.4.1'\n").unwrap();

        let mut parser = DeclarationParser::new();
        let parsed = parse_file(&mut parser, &path).unwrap();

        assert_eq!(parsed.outcome.declarations.len(), 1);
        assert_eq!(parsed.md5, content_md5("mod 'puppetlabs-stdlib', '9.4.1'\n"));
    }

    #[test]
    fn test_content_md5() {
        assert_eq!(content_md5(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(content_md5("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_parse_file_missing() {
        let mut parser = DeclarationParser::new();
        let result = parse_file(&mut parser, Path::new("/nonexistent/Puppetfile"));

        assert!(matches!(result.unwrap_err(), ParseError::IoError(_)));
    }

    #[test]
    fn test_parse_file_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PUPPETFILE);
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let mut parser = DeclarationParser::new();
        let result = parse_file(&mut parser, &path);

        assert!(matches!(result.unwrap_err(), ParseError::NotText { .. }));
    }

    #[test]
    fn test_find_puppetfiles_skips_ignored_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("site/b")).unwrap();
        fs::create_dir_all(root.join("modules/vendored")).unwrap();
        fs::write(root.join(PUPPETFILE), "").unwrap();
        fs::write(root.join("site/b").join(PUPPETFILE), "").unwrap();
        fs::write(root.join("modules/vendored").join(PUPPETFILE), "").unwrap();
        fs::write(root.join("site/README.md"), "").unwrap();

        let found = find_puppetfiles(root);

        assert_eq!(
            found,
            vec![root.join(PUPPETFILE), root.join("site/b").join(PUPPETFILE)]
        );
    }

    #[test]
    fn test_find_puppetfiles_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Puppetfile.r10k");
        fs::write(&path, "").unwrap();

        assert_eq!(find_puppetfiles(&path), vec![path.clone()]);
    }
}
