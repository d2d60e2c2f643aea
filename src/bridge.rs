//! Gate between the screens and the engine.
//!
//! The engine may need asynchronous setup before its first command (for a
//! host-provided module, downloading and instantiating it). [`Bridge`] owns
//! that setup as an explicit future: every command awaits it, so nothing
//! polls a readiness flag. Commands materialize the caller's bytes in the
//! virtual filesystem, run, read the output back and remove their temporary
//! files.

use std::cell::RefCell;
use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::engine::PdfEngine;
use crate::file_utils::vfs_path;
use crate::schema::{FileInfo, OutputFile, Properties, ToolError};
use crate::vfs::VirtualFs;

type ReadyFuture = Shared<LocalBoxFuture<'static, Result<(), String>>>;

pub struct Bridge<E> {
    engine: E,
    fs: RefCell<VirtualFs>,
    ready: ReadyFuture,
}

impl<E: PdfEngine> Bridge<E> {
    /// `init` resolves once the engine can take commands; an `Err` makes
    /// every command fail with [`ToolError::EngineUnavailable`].
    pub fn new<F>(engine: E, init: F) -> Self
    where
        F: Future<Output = Result<(), String>> + 'static,
    {
        Self {
            engine,
            fs: RefCell::new(VirtualFs::new()),
            ready: init.boxed_local().shared(),
        }
    }

    /// A bridge whose engine needs no setup.
    pub fn ready_now(engine: E) -> Self {
        Self::new(engine, futures::future::ready(Ok(())))
    }

    pub async fn ready(&self) -> Result<(), ToolError> {
        self.ready.clone().await.map_err(ToolError::EngineUnavailable)
    }

    /// True once initialization has completed successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.ready.peek(), Some(Ok(())))
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn get_info(&self, name: &str, bytes: &[u8]) -> Result<FileInfo, ToolError> {
        self.ready().await?;
        let path = vfs_path(name);
        let mut fs = self.fs.borrow_mut();
        fs.write_file(&path, bytes.to_vec());
        let result = self.engine.get_info(&*fs, &path);
        fs.remove_file(&path);
        Ok(result?)
    }

    /// Returns the edited document under its original name.
    pub async fn set_properties(
        &self,
        name: &str,
        bytes: &[u8],
        properties: &Properties,
    ) -> Result<OutputFile, ToolError> {
        self.ready().await?;
        let path = vfs_path(name);
        let mut fs = self.fs.borrow_mut();
        fs.write_file(&path, bytes.to_vec());
        let result = self.engine.set_properties(&mut *fs, &path, properties);
        let out = match result {
            Ok(()) => fs.take_file(&path),
            Err(e) => {
                fs.remove_file(&path);
                return Err(e.into());
            }
        }?;
        Ok(OutputFile::new(&path[1..], out))
    }

    pub async fn optimise(&self, name: &str, bytes: &[u8]) -> Result<OutputFile, ToolError> {
        self.ready().await?;
        self.transform(name, bytes, |engine, fs, path| engine.optimise(fs, path))
    }

    pub async fn decrypt(&self, name: &str, bytes: &[u8]) -> Result<OutputFile, ToolError> {
        self.ready().await?;
        self.transform(name, bytes, |engine, fs, path| engine.decrypt(fs, path))
    }

    /// Runs a command that writes a new file and returns its path; the
    /// output is named after that path.
    fn transform<F>(&self, name: &str, bytes: &[u8], command: F) -> Result<OutputFile, ToolError>
    where
        F: FnOnce(&E, &mut VirtualFs, &str) -> Result<String, crate::schema::EngineError>,
    {
        let path = vfs_path(name);
        let mut fs = self.fs.borrow_mut();
        fs.write_file(&path, bytes.to_vec());
        let result = command(&self.engine, &mut *fs, &path);
        fs.remove_file(&path);
        let out_path = result?;
        let out = fs.take_file(&out_path)?;
        let file_name = out_path.trim_start_matches('/').to_owned();
        Ok(OutputFile::new(file_name, out))
    }
}
