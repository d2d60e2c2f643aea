//! # Assembly Module
//!
//! The `wasm-bindgen` surface of the toolbox. [`PdfToolbox`] wraps one
//! [`Workspace`] backed by the bundled lopdf engine and forwards browser
//! events to it.
//!
//! Every method answers with a JSON string, as the rest of the exported API
//! does: the requested value on success, `{"error": ..., "kind": ...}` on
//! failure. Engine-backed operations return a `Promise` of such a string.
//!
//! ```javascript
//! const toolbox = new PdfToolbox(JSON.stringify({ overscan: 2 }), null);
//! const file = JSON.parse(toolbox.selectFile("report.pdf", bytes));
//! if (file.route === "pdf-view") {
//!     const info = JSON.parse(await toolbox.loadInfo());
//! }
//! ```

use base64::Engine;
use js_sys::{Array, Promise, Reflect, Uint8Array};
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{Blob, BlobPropertyBag, Url};

use crate::engine::LopdfEngine;
use crate::file_utils::{FileKind, detect_type, human_file_size};
use crate::logger;
use crate::schema::{OutputFile, PropertyField, ToolError, ToolboxOptions};
use crate::viewer::Viewer;
use crate::workspace::Workspace;

fn to_js<T: Serialize>(value: &T) -> JsValue {
    match serde_json::to_string(value) {
        Ok(s) => JsValue::from_str(&s),
        Err(_) => JsValue::from_str(&json!({"error": "serialization failed"}).to_string()),
    }
}

fn error_js(err: &ToolError) -> JsValue {
    JsValue::from_str(&json!({"error": err.to_string(), "kind": err.kind()}).to_string())
}

fn respond<T: Serialize>(result: Result<T, ToolError>) -> JsValue {
    match result {
        Ok(value) => to_js(&value),
        Err(err) => error_js(&err),
    }
}

/// Best-effort text of a rejected JS value.
fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            Reflect::get(value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

fn mime_type(name: &str) -> &'static str {
    match detect_type(Some(name), &[]) {
        FileKind::Pdf => "application/pdf",
        FileKind::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        FileKind::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        FileKind::Unknown => "application/octet-stream",
    }
}

/// Object URL for an output, to be used as a download link. The caller
/// revokes it with `URL.revokeObjectURL`.
fn object_url(output: &OutputFile) -> Result<String, JsValue> {
    let parts = Array::new();
    parts.push(&Uint8Array::from(output.bytes.as_slice()));
    let options = BlobPropertyBag::new();
    options.set_type(mime_type(&output.file_name));
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    Url::create_object_url_with_blob(&blob)
}

fn download_js(output: Option<OutputFile>) -> JsValue {
    let Some(output) = output else {
        return error_js(&ToolError::InvalidRequest("nothing to download"));
    };
    match object_url(&output) {
        Ok(url) => JsValue::from_str(
            &json!({"fileName": output.file_name, "size": output.size, "url": url}).to_string(),
        ),
        Err(e) => {
            JsValue::from_str(&json!({"error": js_message(&e), "kind": "engine"}).to_string())
        }
    }
}

/// Browser handle on the toolbox.
#[wasm_bindgen]
pub struct PdfToolbox {
    workspace: Workspace<LopdfEngine>,
}

#[wasm_bindgen]
impl PdfToolbox {
    /// `options_json` deserializes to [`ToolboxOptions`]; invalid JSON means
    /// defaults. `engine_ready`, when given, must settle before the first
    /// engine command runs; a rejection makes every command fail.
    #[wasm_bindgen(constructor)]
    pub fn new(options_json: Option<String>, engine_ready: Option<Promise>) -> PdfToolbox {
        let options = ToolboxOptions::from_json(options_json.as_deref());
        logger::init(options.log_level.as_deref());
        let engine = LopdfEngine::new();
        let workspace = match engine_ready {
            Some(promise) => Workspace::new(
                engine,
                async move {
                    JsFuture::from(promise)
                        .await
                        .map(|_| ())
                        .map_err(|e| js_message(&e))
                },
                options,
            ),
            None => Workspace::ready_now(engine, options),
        };
        PdfToolbox { workspace }
    }

    #[wasm_bindgen(js_name = engineReady)]
    pub fn engine_ready(&self) -> bool {
        self.workspace.engine_ready()
    }

    #[wasm_bindgen(js_name = selectFile)]
    pub fn select_file(&self, name: String, bytes: Vec<u8>) -> JsValue {
        respond(self.workspace.select_file(name, bytes))
    }

    /// Convenience wrapper for callers holding base64 rather than a typed
    /// array.
    #[wasm_bindgen(js_name = selectFileBase64)]
    pub fn select_file_base64(&self, name: String, base64_bytes: &str) -> JsValue {
        match base64::engine::general_purpose::STANDARD.decode(base64_bytes) {
            Ok(bytes) => self.select_file(name, bytes),
            Err(e) => JsValue::from_str(
                &json!({"error": format!("base64 decode failed: {:?}", e), "kind": "selection"})
                    .to_string(),
            ),
        }
    }

    /// Takes the dropped files as `[{ name, bytes }]`; exactly one is accepted.
    #[wasm_bindgen(js_name = selectFiles)]
    pub fn select_files(&self, files: Array) -> JsValue {
        let files = files
            .iter()
            .map(|item| {
                let name = Reflect::get(&item, &JsValue::from_str("name"))
                    .ok()
                    .and_then(|n| n.as_string())
                    .unwrap_or_default();
                let bytes = Reflect::get(&item, &JsValue::from_str("bytes"))
                    .map(|b| Uint8Array::new(&b).to_vec())
                    .unwrap_or_default();
                (name, bytes)
            })
            .collect();
        respond(self.workspace.select_files(files))
    }

    pub fn clear(&self) {
        self.workspace.clear();
    }

    #[wasm_bindgen(js_name = saveFile)]
    pub fn save_file(&self) -> JsValue {
        match self.workspace.save_file() {
            Ok(output) => download_js(Some(output)),
            Err(err) => error_js(&err),
        }
    }

    #[wasm_bindgen(js_name = loadInfo)]
    pub fn load_info(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move { Ok(respond(workspace.load_info().await)) })
    }

    #[wasm_bindgen(js_name = reloadInfo)]
    pub fn reload_info(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move { Ok(respond(workspace.reload_info().await)) })
    }

    pub fn info(&self) -> JsValue {
        to_js(&self.workspace.info())
    }

    /// `field` is one of `title`, `author`, `subject`, `keywords`, `creator`,
    /// `producer`.
    #[wasm_bindgen(js_name = setProperty)]
    pub fn set_property(&self, field: &str, value: String) -> JsValue {
        match serde_json::from_value::<PropertyField>(json!(field)) {
            Ok(field) => respond(self.workspace.set_property(field, value)),
            Err(_) => error_js(&ToolError::InvalidRequest("unknown property field")),
        }
    }

    #[wasm_bindgen(js_name = clearEdits)]
    pub fn clear_edits(&self) -> JsValue {
        respond(self.workspace.clear_edits())
    }

    #[wasm_bindgen(js_name = saveInfo)]
    pub fn save_info(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            Ok(match workspace.save_info().await {
                Ok(output) => download_js(Some(output)),
                Err(err) => error_js(&err),
            })
        })
    }

    #[wasm_bindgen(js_name = editedFile)]
    pub fn edited_file(&self) -> JsValue {
        download_js(self.workspace.edited_file())
    }

    pub fn optimise(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            let outcome = workspace.optimise().await;
            Ok(respond(outcome.map(|outcome| {
                json!({"outcome": outcome, "operation": workspace.operation("optimise")})
            })))
        })
    }

    #[wasm_bindgen(js_name = removeRestrictions)]
    pub fn remove_restrictions(&self) -> Promise {
        let workspace = self.workspace.clone();
        future_to_promise(async move {
            let outcome = workspace.remove_restrictions().await;
            Ok(respond(outcome.map(|outcome| {
                json!({
                    "outcome": outcome,
                    "operation": workspace.operation("decrypt"),
                    "info": workspace.info(),
                })
            })))
        })
    }

    /// State of `optimise` or `decrypt`.
    pub fn operation(&self, name: &str) -> JsValue {
        match self.workspace.operation(name) {
            Some(view) => to_js(&view),
            None => error_js(&ToolError::InvalidRequest("unknown operation")),
        }
    }

    #[wasm_bindgen(js_name = operationDownload)]
    pub fn operation_download(&self, name: &str) -> JsValue {
        download_js(self.workspace.operation(name).and_then(|view| view.result))
    }

    pub fn office(&self) -> JsValue {
        to_js(&self.workspace.office())
    }

    #[wasm_bindgen(js_name = removeEditProtection)]
    pub fn remove_edit_protection(&self) -> JsValue {
        match self.workspace.remove_edit_protection() {
            Ok(output) => download_js(Some(output)),
            Err(err) => error_js(&err),
        }
    }

    #[wasm_bindgen(js_name = onDocumentLoad)]
    pub fn on_document_load(&self, num_pages: f64) -> JsValue {
        respond(self.workspace.on_document_load(num_pages))
    }

    pub fn viewer(&self) -> JsValue {
        to_js(&self.workspace.viewer())
    }

    pub fn thumbnails(&self) -> JsValue {
        to_js(&self.workspace.thumbnails())
    }

    #[wasm_bindgen(js_name = gotoPage)]
    pub fn goto_page(&self, page: u32) -> JsValue {
        self.view_with(|v| {
            v.goto_page(page);
        })
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&self) -> JsValue {
        self.view_with(|v| {
            v.next_page();
        })
    }

    #[wasm_bindgen(js_name = previousPage)]
    pub fn previous_page(&self) -> JsValue {
        self.view_with(|v| {
            v.previous_page();
        })
    }

    #[wasm_bindgen(js_name = onScroll)]
    pub fn on_scroll(&self, offset: f64) -> JsValue {
        self.view_with(|v| v.on_scroll(offset))
    }

    #[wasm_bindgen(js_name = rotatePage)]
    pub fn rotate_page(&self, page: u32) -> JsValue {
        self.view_try(|v| v.rotate_page(page).map(|_| ()))
    }

    /// Size reported by the renderer for `page`, in points at scale 1.
    #[wasm_bindgen(js_name = setPageSize)]
    pub fn set_page_size(&self, page: u32, width: f64, height: f64) -> JsValue {
        self.view_try(|v| v.set_page_size(page, width, height))
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&self) -> JsValue {
        self.view_with(|v| {
            v.zoom_in();
        })
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&self) -> JsValue {
        self.view_with(|v| {
            v.zoom_out();
        })
    }

    #[wasm_bindgen(js_name = resetZoom)]
    pub fn reset_zoom(&self) -> JsValue {
        self.view_with(|v| {
            v.reset_zoom();
        })
    }

    pub fn resize(&self, width: f64, height: f64) -> JsValue {
        self.view_with(|v| v.resize(width, height))
    }

    fn view_with(&self, f: impl FnOnce(&mut Viewer)) -> JsValue {
        let ((), state) = self.workspace.with_viewer(f);
        to_js(&state)
    }

    fn view_try(&self, f: impl FnOnce(&mut Viewer) -> Result<(), ToolError>) -> JsValue {
        match self.workspace.with_viewer(f) {
            (Ok(()), state) => to_js(&state),
            (Err(err), _) => error_js(&err),
        }
    }
}

/// `1536` → `"1.5 KB"`.
#[wasm_bindgen(js_name = humanFileSize)]
pub fn human_file_size_js(bytes: f64) -> String {
    human_file_size(bytes.max(0.0) as u64)
}
