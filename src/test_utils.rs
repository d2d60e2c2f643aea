//! Fixtures shared by the unit tests: documents built in memory and a
//! scriptable engine.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{Cursor, Write};

use lopdf::{Document, Object, Stream, dictionary};
use zip::write::SimpleFileOptions;

use crate::engine::PdfEngine;
use crate::schema::{EngineError, FileInfo, Properties};
use crate::vfs::VirtualFs;

/// A PDF with `page_count` A4 pages (size inherited from the page tree) and,
/// when `title` is given, an `/Info` with that title and author "Ada".
pub fn sample_pdf(page_count: usize, title: Option<&str>) -> Vec<u8> {
    save(sample_document(page_count, title))
}

/// [`sample_pdf`] behind a standard security handler of version `v` and
/// revision `r`. Without `user_hash` there is no `/U` entry, so the empty
/// user password is accepted; any other 32 bytes make it wrong.
pub fn encrypted_pdf(page_count: usize, v: i64, r: i64, user_hash: Option<&[u8]>) -> Vec<u8> {
    let mut doc = sample_document(page_count, None);
    let mut encrypt = dictionary! {
        "Filter" => "Standard",
        "V" => v,
        "R" => r,
        "Length" => 128,
        "O" => Object::string_literal(vec![0x2a; 32]),
        "P" => -44,
    };
    if let Some(hash) = user_hash {
        encrypt.set("U", Object::string_literal(hash.to_vec()));
    }
    let encrypt_id = doc.add_object(encrypt);
    doc.trailer.set("Encrypt", encrypt_id);
    let id = Object::string_literal(b"0123456789abcdef".to_vec());
    doc.trailer.set("ID", vec![id.clone(), id]);
    save(doc)
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture PDF should serialize");
    out
}

fn sample_document(page_count: usize, title: Option<&str>) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..page_count {
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Author" => Object::string_literal("Ada"),
        });
        doc.trailer.set("Info", info_id);
    }
    doc
}

/// A ZIP package holding `parts` (name, contents), deflated.
pub fn zip_package(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, contents) in parts {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(contents.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Engine that replays scripted answers and records what it was asked.
///
/// Each command pops its next scripted result; an empty script answers with
/// a generic failure.
#[derive(Default)]
pub struct FakeEngine {
    pub info: RefCell<VecDeque<Result<FileInfo, EngineError>>>,
    pub set_results: RefCell<VecDeque<Result<(), EngineError>>>,
    pub optimise_results: RefCell<VecDeque<Result<Vec<u8>, EngineError>>>,
    pub decrypt_results: RefCell<VecDeque<Result<Vec<u8>, EngineError>>>,
    pub set_calls: RefCell<Vec<Properties>>,
    pub info_calls: Cell<usize>,
}

impl FakeEngine {
    pub fn with_info(self, result: Result<FileInfo, EngineError>) -> Self {
        self.info.borrow_mut().push_back(result);
        self
    }

    pub fn with_set(self, result: Result<(), EngineError>) -> Self {
        self.set_results.borrow_mut().push_back(result);
        self
    }

    pub fn with_optimise(self, result: Result<Vec<u8>, EngineError>) -> Self {
        self.optimise_results.borrow_mut().push_back(result);
        self
    }

    pub fn with_decrypt(self, result: Result<Vec<u8>, EngineError>) -> Self {
        self.decrypt_results.borrow_mut().push_back(result);
        self
    }

    fn unscripted<T>() -> Result<T, EngineError> {
        Err(EngineError::Other("unscripted call".into()))
    }
}

impl PdfEngine for FakeEngine {
    fn get_info(&self, fs: &VirtualFs, path: &str) -> Result<FileInfo, EngineError> {
        assert!(fs.exists(path), "input not materialized at {path}");
        self.info_calls.set(self.info_calls.get() + 1);
        self.info
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(Self::unscripted)
    }

    fn set_properties(
        &self,
        fs: &mut VirtualFs,
        path: &str,
        properties: &Properties,
    ) -> Result<(), EngineError> {
        assert!(fs.exists(path), "input not materialized at {path}");
        self.set_calls.borrow_mut().push(properties.clone());
        let result = self
            .set_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(Self::unscripted);
        if result.is_ok() {
            fs.write_file(path, b"%PDF-edited".to_vec());
        }
        result
    }

    fn optimise(&self, fs: &mut VirtualFs, path: &str) -> Result<String, EngineError> {
        assert!(fs.exists(path), "input not materialized at {path}");
        let bytes = self
            .optimise_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(Self::unscripted)?;
        let out = crate::file_utils::derived_name(path, "-optimised");
        fs.write_file(&out, bytes);
        Ok(out)
    }

    fn decrypt(&self, fs: &mut VirtualFs, path: &str) -> Result<String, EngineError> {
        assert!(fs.exists(path), "input not materialized at {path}");
        let bytes = self
            .decrypt_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(Self::unscripted)?;
        let out = crate::file_utils::derived_name(path, "-decrypted");
        fs.write_file(&out, bytes);
        Ok(out)
    }
}
