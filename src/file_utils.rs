use serde::{Deserialize, Serialize};

use crate::schema::ToolError;

/// Document types the toolbox recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Docx,
    Xlsx,
    Unknown,
}

/// Which screen a selected file is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileRoute {
    /// Viewer, info, optimise and decrypt screens.
    PdfView,
    /// The simpler review screen for office documents.
    DocReview,
}

const OLE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Detects the file type from filename extension or magic bytes.
///
/// # Detection Strategy
///
/// 1. Filename extension check (case-insensitive)
/// 2. `%PDF` header
/// 3. ZIP (`PK`) packages are inspected for a `word/` or `xl/` part name
/// 4. OLE compound files are reported as `Docx`: password-protected OOXML
///    documents are wrapped in one, and the review screen reports them as
///    encrypted
pub fn detect_type(filename: Option<&str>, bytes: &[u8]) -> FileKind {
    if let Some(name) = filename {
        let lower = name.to_lowercase();
        if lower.ends_with(".pdf") {
            return FileKind::Pdf;
        }
        if lower.ends_with(".docx") {
            return FileKind::Docx;
        }
        if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") {
            return FileKind::Xlsx;
        }
    }
    // fallback: magic
    if bytes.len() >= 4 && &bytes[0..4] == b"%PDF" {
        return FileKind::Pdf;
    }
    if bytes.len() >= 4 && &bytes[0..2] == b"PK" {
        // part names are stored uncompressed in local file headers
        if contains(bytes, b"word/") {
            return FileKind::Docx;
        }
        if contains(bytes, b"xl/") {
            return FileKind::Xlsx;
        }
    }
    if bytes.len() >= 4 && bytes[0..4] == OLE_MAGIC {
        return FileKind::Docx;
    }
    FileKind::Unknown
}

/// True when `bytes` starts like an OLE compound file.
pub fn is_ole_container(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == OLE_MAGIC
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Picks the screen for a detected kind.
pub fn route_for(kind: FileKind) -> Result<FileRoute, ToolError> {
    match kind {
        FileKind::Pdf => Ok(FileRoute::PdfView),
        FileKind::Docx | FileKind::Xlsx => Ok(FileRoute::DocReview),
        FileKind::Unknown => Err(ToolError::UnsupportedFormat("unknown".into())),
    }
}

/// The drop surface accepts exactly one file per selection.
pub fn ensure_single_selection(count: usize) -> Result<(), ToolError> {
    if count == 1 {
        Ok(())
    } else {
        Err(ToolError::InvalidSelection(count))
    }
}

/// Splits `name` into stem and extension (with the dot). Names without an
/// extension return an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// `report.pdf` + `-edited` → `report-edited.pdf`.
pub fn derived_name(name: &str, suffix: &str) -> String {
    let (stem, ext) = split_extension(name);
    format!("{stem}{suffix}{ext}")
}

/// Virtual filesystem path for a file name: always absolute, no nested
/// directories.
pub fn vfs_path(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    format!("/{base}")
}

/// Human-readable size with 1024-based units and one decimal.
///
/// `1536` → `"1.5 KB"`, `512` → `"512 B"`.
pub fn human_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    value /= 1024.0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_type_by_extension() {
        assert_eq!(detect_type(Some("Report.PDF"), b""), FileKind::Pdf);
        assert_eq!(detect_type(Some("a.docx"), b""), FileKind::Docx);
        assert_eq!(detect_type(Some("b.xlsm"), b""), FileKind::Xlsx);
    }

    #[test]
    fn test_detect_type_by_magic() {
        assert_eq!(detect_type(None, b"%PDF-1.7\n"), FileKind::Pdf);
        assert_eq!(
            detect_type(Some("noext"), b"PK\x03\x04....word/document.xml"),
            FileKind::Docx
        );
        assert_eq!(detect_type(None, b"PK\x03\x04....xl/workbook.xml"), FileKind::Xlsx);
        assert_eq!(detect_type(None, &[0xD0, 0xCF, 0x11, 0xE0, 0xA1]), FileKind::Docx);
        assert_eq!(detect_type(Some("notes.txt"), b"hello"), FileKind::Unknown);
    }

    #[test]
    fn test_route_for() {
        assert_eq!(route_for(FileKind::Pdf), Ok(FileRoute::PdfView));
        assert_eq!(route_for(FileKind::Xlsx), Ok(FileRoute::DocReview));
        assert!(route_for(FileKind::Unknown).is_err());
    }

    #[test]
    fn test_single_selection() {
        assert!(ensure_single_selection(1).is_ok());
        assert_eq!(ensure_single_selection(0), Err(ToolError::InvalidSelection(0)));
        assert_eq!(ensure_single_selection(3), Err(ToolError::InvalidSelection(3)));
    }

    #[test]
    fn test_derived_name() {
        assert_eq!(derived_name("report.pdf", "-edited"), "report-edited.pdf");
        assert_eq!(derived_name("archive.tar.pdf", "-x"), "archive.tar-x.pdf");
        assert_eq!(derived_name("README", "-edited"), "README-edited");
        assert_eq!(derived_name(".hidden", "-x"), ".hidden-x");
    }

    #[test]
    fn test_vfs_path() {
        assert_eq!(vfs_path("a.pdf"), "/a.pdf");
        assert_eq!(vfs_path("dir/sub/a.pdf"), "/a.pdf");
        assert_eq!(vfs_path("C:\\docs\\a.pdf"), "/a.pdf");
    }

    #[test]
    fn test_human_file_size() {
        assert_eq!(human_file_size(0), "0 B");
        assert_eq!(human_file_size(1023), "1023 B");
        assert_eq!(human_file_size(1536), "1.5 KB");
        assert_eq!(human_file_size(5 * 1024 * 1024), "5.0 MB");
    }
}
