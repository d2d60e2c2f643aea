//! Data structures shared across the toolbox.
//!
//! This module defines the error taxonomy, the PDF metadata model, the output
//! produced by file operations and the JSON-configurable options.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::size_utils::paper_pt;

/// Failures reported by a [`crate::engine::PdfEngine`].
///
/// The kind is explicit so callers can match exhaustively instead of probing
/// error types at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The document needs a user password; nothing can be done with it.
    #[error("This PDF is encrypted and cannot be opened without a password")]
    Encrypted,
    /// The document opens but carries permission restrictions.
    #[error("This PDF has restrictions")]
    Restricted,
    /// The bytes are not a readable PDF.
    #[error("{0}")]
    Invalid(String),
    /// Anything the engine did not classify.
    #[error("engine failure: {0}")]
    Other(String),
}

/// Errors surfaced by toolbox operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("no file is currently selected")]
    NoFile,
    #[error("expected exactly one file, got {0}")]
    InvalidSelection(usize),
    #[error("Unsupported or unrecognized format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid page count: {0}")]
    InvalidPageCount(f64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("file not found in virtual filesystem: {0}")]
    FileNotFound(String),
    #[error("PDF engine failed to initialize: {0}")]
    EngineUnavailable(String),
    #[error("operation not allowed while {0}")]
    InvalidState(&'static str),
    #[error("{0}")]
    InvalidRequest(&'static str),
    #[error("the file was replaced before the operation finished")]
    Superseded,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Office(#[from] crate::office::OfficeError),
}

/// Serializable discriminant of [`ToolError`], handed to the browser layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Encrypted,
    Restricted,
    Invalid,
    Engine,
    Unavailable,
    Selection,
    Unsupported,
    State,
    Office,
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::Engine(EngineError::Encrypted) => ErrorKind::Encrypted,
            ToolError::Engine(EngineError::Restricted) => ErrorKind::Restricted,
            ToolError::Engine(EngineError::Invalid(_)) => ErrorKind::Invalid,
            ToolError::Engine(EngineError::Other(_)) | ToolError::FileNotFound(_) => {
                ErrorKind::Engine
            }
            ToolError::EngineUnavailable(_) => ErrorKind::Unavailable,
            ToolError::NoFile | ToolError::InvalidSelection(_) => ErrorKind::Selection,
            ToolError::UnsupportedFormat(_) => ErrorKind::Unsupported,
            ToolError::InvalidPageCount(_)
            | ToolError::PageOutOfRange { .. }
            | ToolError::InvalidState(_)
            | ToolError::InvalidRequest(_)
            | ToolError::Superseded => ErrorKind::State,
            ToolError::Office(_) => ErrorKind::Office,
        }
    }
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size as laid out after a clockwise rotation in degrees.
    pub fn rotated(self, degrees: u16) -> Self {
        if degrees % 180 == 90 {
            Self {
                width: self.height,
                height: self.width,
            }
        } else {
            self
        }
    }
}

/// Editable document properties (the PDF `/Info` dictionary).
///
/// Also used as the pending-edits overlay: a `None` field means "not edited".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// One editable field of [`Properties`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyField {
    Title,
    Author,
    Subject,
    Keywords,
    Creator,
    Producer,
}

impl PropertyField {
    pub const ALL: [PropertyField; 6] = [
        PropertyField::Title,
        PropertyField::Author,
        PropertyField::Subject,
        PropertyField::Keywords,
        PropertyField::Creator,
        PropertyField::Producer,
    ];

    /// Key of the field in a PDF `/Info` dictionary.
    pub fn info_key(self) -> &'static str {
        match self {
            PropertyField::Title => "Title",
            PropertyField::Author => "Author",
            PropertyField::Subject => "Subject",
            PropertyField::Keywords => "Keywords",
            PropertyField::Creator => "Creator",
            PropertyField::Producer => "Producer",
        }
    }
}

impl Properties {
    pub fn get(&self, field: PropertyField) -> Option<&str> {
        match field {
            PropertyField::Title => self.title.as_deref(),
            PropertyField::Author => self.author.as_deref(),
            PropertyField::Subject => self.subject.as_deref(),
            PropertyField::Keywords => self.keywords.as_deref(),
            PropertyField::Creator => self.creator.as_deref(),
            PropertyField::Producer => self.producer.as_deref(),
        }
    }

    pub fn set(&mut self, field: PropertyField, value: Option<String>) {
        let slot = match field {
            PropertyField::Title => &mut self.title,
            PropertyField::Author => &mut self.author,
            PropertyField::Subject => &mut self.subject,
            PropertyField::Keywords => &mut self.keywords,
            PropertyField::Creator => &mut self.creator,
            PropertyField::Producer => &mut self.producer,
        };
        *slot = value;
    }

    pub fn is_empty(&self) -> bool {
        PropertyField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Applies `patch` on top of `self`: fields present in the patch win,
    /// everything else keeps its current value.
    pub fn overlay(&self, patch: &Properties) -> Properties {
        let mut merged = self.clone();
        for field in PropertyField::ALL {
            if let Some(value) = patch.get(field) {
                merged.set(field, Some(value.to_owned()));
            }
        }
        merged
    }
}

/// Metadata of a PDF as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileInfo {
    pub page_count: Option<u32>,
    pub version: Option<String>,
    /// Size of the first page.
    pub page_size: Option<PageSize>,
    pub encrypted: Option<bool>,
    pub restricted: Option<bool>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl FileInfo {
    /// Snapshot with pending edits applied.
    pub fn with_overlay(&self, overlay: &Properties) -> FileInfo {
        FileInfo {
            properties: self.properties.overlay(overlay),
            ..self.clone()
        }
    }
}

/// A downloadable product of a file operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub file_name: String,
    pub size: usize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl OutputFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            size: bytes.len(),
            bytes,
        }
    }

    /// How much smaller this output is than `original_size`, in percent.
    /// `None` when it is not smaller.
    pub fn savings_percent(&self, original_size: usize) -> Option<f64> {
        if original_size == 0 || self.size >= original_size {
            return None;
        }
        Some((original_size - self.size) as f64 / original_size as f64 * 100.0)
    }
}

/// Configuration options for the toolbox.
///
/// Every field is optional in JSON; missing fields take their defaults.
///
/// ```json
/// { "default_paper": "Letter", "zoom_step": 0.1, "overscan": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxOptions {
    /// Paper assumed for pages whose size is not known yet: "A4" or "Letter".
    pub default_paper: Option<String>,
    /// Custom paper size in millimeters; takes precedence over `default_paper`.
    pub custom_paper_mm: Option<(f64, f64)>,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub zoom_step: f64,
    /// Pages mounted beyond each edge of the viewport.
    pub overscan: usize,
    /// Horizontal space (px) the page column loses to padding and scrollbar.
    pub horizontal_padding: f64,
    pub thumbnail_scale: f64,
    /// Appended to the stem of a document saved with edited metadata.
    pub edited_suffix: String,
    /// `log` level filter name ("debug", "info", ...).
    pub log_level: Option<String>,
}

impl Default for ToolboxOptions {
    fn default() -> Self {
        Self {
            default_paper: Some("A4".into()),
            custom_paper_mm: None,
            zoom_min: 0.5,
            zoom_max: 3.0,
            zoom_step: 0.25,
            overscan: 1,
            horizontal_padding: 32.0,
            thumbnail_scale: 0.2,
            edited_suffix: "-edited".into(),
            log_level: None,
        }
    }
}

impl ToolboxOptions {
    /// Parses options from JSON, falling back to defaults on bad input.
    pub fn from_json(json: Option<&str>) -> Self {
        match json {
            Some(s) => serde_json::from_str(s).unwrap_or_else(|e| {
                log::warn!("ignoring invalid options ({e}); using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Size used for pages that have not been probed or measured.
    pub fn default_page_size(&self) -> PageSize {
        let (w, h) = paper_pt(self.default_paper.as_deref(), self.custom_paper_mm);
        PageSize::new(w, h)
    }
}
