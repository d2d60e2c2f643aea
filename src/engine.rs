//! The PDF processing engine.
//!
//! [`PdfEngine`] is the command surface the screens drive: read metadata,
//! write metadata, optimise and decrypt. Every command addresses a document by
//! its path in a [`VirtualFs`]; outputs are written back into the same
//! filesystem. [`LopdfEngine`] implements it in pure Rust on top of `lopdf`.

use lopdf::encryption::DecryptionError;
use lopdf::{Document, Object, ObjectId, StringFormat, dictionary};

use crate::file_utils::derived_name;
use crate::probe::{PdfProbe, has_pdf_header};
use crate::schema::{EngineError, FileInfo, PageSize, Properties, PropertyField};
use crate::size_utils::letter_pt;
use crate::vfs::VirtualFs;

/// Parent links followed when resolving inherited page attributes.
const MAX_TREE_DEPTH: usize = 32;

pub trait PdfEngine {
    /// Reads document metadata.
    ///
    /// Fails with [`EngineError::Encrypted`] when the document needs a
    /// password and [`EngineError::Restricted`] when it opens but carries
    /// permission restrictions.
    fn get_info(&self, fs: &VirtualFs, path: &str) -> Result<FileInfo, EngineError>;

    /// Writes the present fields of `properties` into the document at `path`,
    /// in place. Absent fields are left untouched.
    fn set_properties(
        &self,
        fs: &mut VirtualFs,
        path: &str,
        properties: &Properties,
    ) -> Result<(), EngineError>;

    /// Writes an optimised copy and returns its path.
    fn optimise(&self, fs: &mut VirtualFs, path: &str) -> Result<String, EngineError>;

    /// Writes a copy without encryption or permission restrictions and
    /// returns its path.
    fn decrypt(&self, fs: &mut VirtualFs, path: &str) -> Result<String, EngineError>;
}

/// How a document could be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Open,
    /// Opened with the empty user password; the owner password still
    /// restricts what may be done with it.
    Restricted,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfEngine;

impl LopdfEngine {
    pub fn new() -> Self {
        Self
    }

    fn read<'a>(fs: &'a VirtualFs, path: &str) -> Result<&'a [u8], EngineError> {
        fs.read_file(path)
            .map_err(|_| EngineError::Other(format!("no such file: {path}")))
    }

    fn open(bytes: &[u8]) -> Result<(Document, Access), EngineError> {
        if !has_pdf_header(bytes) {
            return Err(EngineError::Invalid("The file is not a PDF document".into()));
        }
        let mut doc = Document::load_mem(bytes).map_err(|e| {
            if PdfProbe::scan(bytes).has_encrypt_marker {
                EngineError::Encrypted
            } else {
                EngineError::Invalid(format!("The PDF could not be read: {e}"))
            }
        })?;
        let access = unlock(&mut doc)?;
        Ok((doc, access))
    }

    fn save(doc: &mut Document) -> Result<Vec<u8>, EngineError> {
        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| EngineError::Other(format!("failed to write PDF: {e}")))?;
        Ok(out)
    }
}

/// Tries the empty user password on encrypted documents.
///
/// Only a rejected password means the document is locked. Security handlers
/// `lopdf` cannot decrypt (AES, revision 4 and later) are reported as
/// [`EngineError::Other`].
fn unlock(doc: &mut Document) -> Result<Access, EngineError> {
    if !doc.trailer.has(b"Encrypt") {
        return Ok(Access::Open);
    }
    match doc.decrypt("") {
        Ok(()) => {
            doc.trailer.remove(b"Encrypt");
            Ok(Access::Restricted)
        }
        Err(lopdf::Error::Decryption(DecryptionError::IncorrectPassword)) => {
            log::debug!("empty user password rejected");
            Err(EngineError::Encrypted)
        }
        Err(e) => {
            log::warn!("cannot decrypt document: {e}");
            Err(EngineError::Other(format!("unsupported encryption: {e}")))
        }
    }
}

impl PdfEngine for LopdfEngine {
    fn get_info(&self, fs: &VirtualFs, path: &str) -> Result<FileInfo, EngineError> {
        let (doc, access) = Self::open(Self::read(fs, path)?)?;
        if access == Access::Restricted {
            return Err(EngineError::Restricted);
        }

        let pages = doc.get_pages();
        let page_size = pages
            .values()
            .next()
            .and_then(|id| media_box(&doc, *id))
            .or_else(|| {
                let (w, h) = letter_pt();
                (!pages.is_empty()).then(|| PageSize::new(w, h))
            });

        let mut info = FileInfo {
            page_count: Some(pages.len() as u32),
            version: Some(doc.version.clone()),
            page_size,
            encrypted: Some(false),
            restricted: Some(false),
            ..Default::default()
        };

        if let Some(dict) = info_dictionary(&doc) {
            for field in PropertyField::ALL {
                let value = dict
                    .get(field.info_key().as_bytes())
                    .ok()
                    .and_then(|o| text_string(&doc, o));
                info.properties.set(field, value);
            }
            info.creation_date = dict
                .get(b"CreationDate")
                .ok()
                .and_then(|o| text_string(&doc, o))
                .map(strip_date_prefix);
            info.modification_date = dict
                .get(b"ModDate")
                .ok()
                .and_then(|o| text_string(&doc, o))
                .map(strip_date_prefix);
        }

        Ok(info)
    }

    fn set_properties(
        &self,
        fs: &mut VirtualFs,
        path: &str,
        properties: &Properties,
    ) -> Result<(), EngineError> {
        let (mut doc, access) = Self::open(Self::read(fs, path)?)?;
        if access == Access::Restricted {
            return Err(EngineError::Restricted);
        }

        let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
            Ok(id) => id,
            Err(_) => {
                // inline or missing /Info: move it into an indirect object
                let existing = doc
                    .trailer
                    .get(b"Info")
                    .and_then(Object::as_dict)
                    .cloned()
                    .unwrap_or_else(|_| dictionary! {});
                let id = doc.add_object(Object::Dictionary(existing));
                doc.trailer.set("Info", id);
                id
            }
        };

        {
            let dict = doc
                .get_object_mut(info_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| EngineError::Invalid(format!("broken /Info dictionary: {e}")))?;
            for field in PropertyField::ALL {
                if let Some(value) = properties.get(field) {
                    dict.set(field.info_key(), encode_text_string(value));
                }
            }
        }

        let out = Self::save(&mut doc)?;
        fs.write_file(path, out);
        Ok(())
    }

    fn optimise(&self, fs: &mut VirtualFs, path: &str) -> Result<String, EngineError> {
        let (mut doc, access) = Self::open(Self::read(fs, path)?)?;
        if access == Access::Restricted {
            return Err(EngineError::Restricted);
        }

        let pruned = doc.prune_objects();
        let empty = doc.delete_zero_length_streams();
        doc.renumber_objects();
        doc.compress();
        log::debug!(
            "optimise {path}: pruned {} objects, dropped {} empty streams",
            pruned.len(),
            empty.len()
        );

        let out_path = derived_name(path, "-optimised");
        let out = Self::save(&mut doc)?;
        fs.write_file(&out_path, out);
        Ok(out_path)
    }

    fn decrypt(&self, fs: &mut VirtualFs, path: &str) -> Result<String, EngineError> {
        let (mut doc, access) = Self::open(Self::read(fs, path)?)?;
        if access == Access::Open {
            return Err(EngineError::Other("this file is not encrypted".into()));
        }

        // the encryption dictionary is unreachable once the trailer entry is gone
        doc.prune_objects();

        let out_path = derived_name(path, "-decrypted");
        let out = Self::save(&mut doc)?;
        fs.write_file(&out_path, out);
        Ok(out_path)
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn info_dictionary(doc: &Document) -> Option<&lopdf::Dictionary> {
    let obj = doc.trailer.get(b"Info").ok()?;
    resolve(doc, obj)?.as_dict().ok()
}

/// `/MediaBox` of a page, following `/Parent` links for inherited boxes.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Some(array) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
        {
            if array.len() != 4 {
                return None;
            }
            let n: Vec<f64> = array.iter().map(obj_to_f64).collect();
            let width = (n[2] - n[0]).abs();
            let height = (n[3] - n[1]).abs();
            return (width > 0.0 && height > 0.0).then(|| PageSize::new(width, height));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Converts a numeric lopdf object to `f64`; anything else is `0.0`.
pub fn obj_to_f64(obj: &Object) -> f64 {
    match obj {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => *r as f64,
        _ => 0.0,
    }
}

fn text_string(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE or UTF-8 with a byte order mark,
/// otherwise one byte per character.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|b| *b as char).collect()
}

/// ASCII stays a literal string; anything else becomes UTF-16BE with a BOM.
pub fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn strip_date_prefix(date: String) -> String {
    match date.strip_prefix("D:") {
        Some(rest) => rest.to_owned(),
        None => date,
    }
}
