//! Client-side PDF toolbox compiled to WebAssembly.
//!
//! Holds the state and logic behind a browser PDF tool: the current-file
//! session, the viewer layout (zoom, container fit, page geometry, a
//! virtualized page list, rotations and thumbnails), file operations
//! (optimise, remove restrictions, edit metadata) run against a PDF engine
//! through an in-memory filesystem, and a review screen for Word and Excel
//! documents. The browser renders what the crate reports and forwards events
//! to it through [`assembly::PdfToolbox`].

use wasm_bindgen::prelude::*;

pub mod assembly;
pub mod bridge;
pub mod engine;
pub mod file_utils;
pub mod geometry;
pub mod logger;
pub mod metadata;
pub mod office;
pub mod operations;
pub mod probe;
pub mod resize;
pub mod schema;
pub mod session;
pub mod size_utils;
pub mod viewer;
pub mod vfs;
pub mod virtual_list;
pub mod workspace;
pub mod zoom;

#[cfg(test)]
mod test_utils;

pub use assembly::PdfToolbox;
pub use bridge::Bridge;
pub use engine::{LopdfEngine, PdfEngine};
pub use schema::{
    EngineError, ErrorKind, FileInfo, OutputFile, Properties, ToolError, ToolboxOptions,
};
pub use workspace::{Outcome, Workspace};

/// Runs when the module is instantiated.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logger::init(None);
}
