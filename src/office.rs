//! Review of Word and Excel documents.
//!
//! OOXML packages are ZIP archives of XML parts. Password encryption wraps
//! the whole package in an OLE compound file, which cannot be undone here;
//! edit protection is a handful of marker elements inside ordinary parts and
//! is removed by rewriting those parts without them.

use std::io::{Cursor, Read, Write};

use calamine::{Reader as _, Xlsx};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde::Serialize;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::file_utils::{FileKind, is_ole_container};
use crate::schema::{OutputFile, ToolError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfficeError {
    #[error("This document is password protected and cannot be opened")]
    Encrypted,
    #[error("Failed to read document package: {0}")]
    Package(String),
    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },
    #[error("Not a Word or Excel document")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocStatus {
    Loading,
    Encrypted,
    EditProtected,
    /// Protection removal in flight.
    EditProtectedLoading,
    Unprotected,
}

/// Result of looking inside a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub status: DocStatus,
    /// Parts carrying a protection element.
    pub protected_parts: Vec<String>,
    pub sheet_names: Vec<String>,
}

/// Protection element to strip from `part`, if the part can carry one.
fn protection_element(kind: FileKind, part: &str) -> Option<&'static [u8]> {
    match kind {
        FileKind::Docx if part == "word/settings.xml" => Some(b"documentProtection"),
        FileKind::Xlsx if part == "xl/workbook.xml" => Some(b"workbookProtection"),
        FileKind::Xlsx if part.starts_with("xl/worksheets/") && part.ends_with(".xml") => {
            Some(b"sheetProtection")
        }
        _ => None,
    }
}

fn open(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, OfficeError> {
    if is_ole_container(bytes) {
        return Err(OfficeError::Encrypted);
    }
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| OfficeError::Package(e.to_string()))
}

fn ensure_office(kind: FileKind) -> Result<(), OfficeError> {
    match kind {
        FileKind::Docx | FileKind::Xlsx => Ok(()),
        _ => Err(OfficeError::Unsupported),
    }
}

/// Classifies a document. Unreadable packages count as encrypted: that is
/// what a password-protected file looks like once its container is gone.
pub fn inspect(kind: FileKind, bytes: &[u8]) -> Result<Inspection, OfficeError> {
    ensure_office(kind)?;
    let mut archive = match open(bytes) {
        Ok(archive) => archive,
        Err(e) => {
            log::info!("office: treating document as encrypted ({e})");
            return Ok(Inspection {
                status: DocStatus::Encrypted,
                protected_parts: Vec::new(),
                sheet_names: Vec::new(),
            });
        }
    };

    let mut protected_parts = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| OfficeError::Package(e.to_string()))?;
        let name = file.name().to_owned();
        let Some(element) = protection_element(kind, &name) else {
            continue;
        };
        let mut xml = Vec::new();
        file.read_to_end(&mut xml)
            .map_err(|e| OfficeError::Package(e.to_string()))?;
        let (_, removed) = strip_element(&name, &xml, element)?;
        if removed > 0 {
            protected_parts.push(name);
        }
    }

    let status = if protected_parts.is_empty() {
        DocStatus::Unprotected
    } else {
        DocStatus::EditProtected
    };
    log::debug!("office: {status:?}, protected parts {protected_parts:?}");
    Ok(Inspection {
        status,
        protected_parts,
        sheet_names: sheet_names(kind, bytes),
    })
}

/// Sheet names of a workbook; empty for documents and unreadable workbooks.
pub fn sheet_names(kind: FileKind, bytes: &[u8]) -> Vec<String> {
    if kind != FileKind::Xlsx {
        return Vec::new();
    }
    match Xlsx::new(Cursor::new(bytes)) {
        Ok(workbook) => workbook.sheet_names(),
        Err(e) => {
            log::warn!("office: cannot read workbook sheets: {e}");
            Vec::new()
        }
    }
}

/// Rewrites the package without its edit protection elements. Every other
/// entry is copied unchanged and in order.
pub fn remove_edit_protection(kind: FileKind, bytes: &[u8]) -> Result<Vec<u8>, OfficeError> {
    ensure_office(kind)?;
    let mut archive = open(bytes)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let package_err = |e: &dyn std::fmt::Display| OfficeError::Package(e.to_string());

    let mut removed_total = 0;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| package_err(&e))?;
        let name = file.name().to_owned();
        let method = match file.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);

        if file.is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|e| package_err(&e))?;
            continue;
        }

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| package_err(&e))?;
        if let Some(element) = protection_element(kind, &name) {
            let (stripped, removed) = strip_element(&name, &contents, element)?;
            removed_total += removed;
            contents = stripped;
        }
        writer
            .start_file(name, options)
            .map_err(|e| package_err(&e))?;
        writer.write_all(&contents).map_err(|e| package_err(&e))?;
    }

    let out = writer.finish().map_err(|e| package_err(&e))?.into_inner();
    log::info!("office: removed {removed_total} protection element(s)");
    Ok(out)
}

/// Copies `xml` without any element whose local name is `local_name`,
/// including its subtree. Returns the new XML and how many were dropped.
fn strip_element(
    part: &str,
    xml: &[u8],
    local_name: &[u8],
) -> Result<(Vec<u8>, usize), OfficeError> {
    let xml_err = |e: &dyn std::fmt::Display| OfficeError::Xml {
        part: part.to_owned(),
        message: e.to_string(),
    };
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();
    let mut skipped = Vec::new();
    let mut removed = 0;

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| xml_err(&e))? {
            Event::Eof => break,
            Event::Empty(e) if e.local_name().as_ref() == local_name => removed += 1,
            Event::Start(e) if e.local_name().as_ref() == local_name => {
                removed += 1;
                let end = e.to_end().into_owned();
                reader
                    .read_to_end_into(end.name(), &mut skipped)
                    .map_err(|e| xml_err(&e))?;
                skipped.clear();
            }
            event => writer.write_event(event).map_err(|e| xml_err(&e))?,
        }
        buf.clear();
    }

    if removed == 0 {
        return Ok((xml.to_vec(), 0));
    }
    Ok((writer.into_inner().into_inner(), removed))
}

/// Office review screen state for the current file.
#[derive(Debug, Clone, PartialEq)]
pub struct OfficeReview {
    status: DocStatus,
    protected_parts: Vec<String>,
    sheet_names: Vec<String>,
    result: Option<OutputFile>,
    error: Option<ToolError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeView {
    pub status: DocStatus,
    pub protected_parts: Vec<String>,
    pub sheet_names: Vec<String>,
    pub result: Option<OutputFile>,
    pub error: Option<String>,
}

impl Default for OfficeReview {
    fn default() -> Self {
        Self {
            status: DocStatus::Loading,
            protected_parts: Vec::new(),
            sheet_names: Vec::new(),
            result: None,
            error: None,
        }
    }
}

impl OfficeReview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> DocStatus {
        self.status
    }

    pub fn result(&self) -> Option<&OutputFile> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn finish_inspection(&mut self, result: Result<Inspection, ToolError>) {
        match result {
            Ok(inspection) => {
                self.status = inspection.status;
                self.protected_parts = inspection.protected_parts;
                self.sheet_names = inspection.sheet_names;
            }
            Err(e) => {
                log::error!("office: inspection failed: {e}");
                self.status = DocStatus::Encrypted;
                self.error = Some(e);
            }
        }
    }

    pub fn begin_unlock(&mut self) -> Result<(), ToolError> {
        if self.status != DocStatus::EditProtected {
            return Err(ToolError::InvalidState("removing edit protection"));
        }
        self.status = DocStatus::EditProtectedLoading;
        self.error = None;
        Ok(())
    }

    pub fn finish_unlock(&mut self, result: Result<OutputFile, ToolError>) {
        if self.status != DocStatus::EditProtectedLoading {
            return;
        }
        match result {
            Ok(output) => {
                self.status = DocStatus::Unprotected;
                self.protected_parts.clear();
                self.result = Some(output);
            }
            Err(e) => {
                log::error!("office: removing protection failed: {e}");
                self.status = DocStatus::EditProtected;
                self.error = Some(e);
            }
        }
    }

    pub fn view(&self) -> OfficeView {
        OfficeView {
            status: self.status,
            protected_parts: self.protected_parts.clone(),
            sheet_names: self.sheet_names.clone(),
            result: self.result.clone(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}
