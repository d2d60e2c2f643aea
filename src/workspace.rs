//! The screens behind the browser UI, composed over one current file.
//!
//! [`Workspace`] is a cheap handle (`Rc`) so that every async entry point can
//! own a clone while the browser keeps calling others. State lives in a
//! `RefCell` that is never borrowed across an `.await`: each operation takes
//! what it needs and a [`Ticket`], awaits the bridge, then re-borrows and
//! applies its result only if the ticket is still current.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use serde::Serialize;

use crate::bridge::Bridge;
use crate::engine::PdfEngine;
use crate::file_utils::{FileKind, FileRoute, derived_name, ensure_single_selection, route_for};
use crate::metadata::{InfoFlow, InfoView};
use crate::office::{self, OfficeReview, OfficeView};
use crate::operations::{Completion, OperationSlot, Trigger};
use crate::probe::PdfProbe;
use crate::schema::{OutputFile, PropertyField, ToolError, ToolboxOptions};
use crate::session::{Replacement, Session, StoredFile, Ticket};
use crate::viewer::{Thumbnail, Viewer, ViewerState};
use crate::virtual_list::PageCount;

/// What happened to a requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Applied,
    /// Already running; nothing was started.
    Ignored,
    /// Finished after the file was replaced; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationView {
    pub busy: bool,
    pub result: Option<OutputFile>,
    pub error: Option<String>,
    /// For optimised output: how much smaller than the current file.
    pub savings_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub name: String,
    pub kind: FileKind,
    pub route: FileRoute,
    pub size: usize,
    pub generation: u64,
}

struct State {
    session: Session,
    probe: PdfProbe,
    info: InfoFlow,
    viewer: Viewer,
    optimise: OperationSlot,
    decrypt: OperationSlot,
    office: OfficeReview,
    edited: Option<OutputFile>,
}

impl State {
    fn new(options: &ToolboxOptions) -> Self {
        Self {
            session: Session::new(),
            probe: PdfProbe::default(),
            info: InfoFlow::new(),
            viewer: Viewer::new(options),
            optimise: OperationSlot::new("optimise"),
            decrypt: OperationSlot::new("decrypt"),
            office: OfficeReview::new(),
            edited: None,
        }
    }

    /// Clears everything derived from the previous file.
    fn reset_derived(&mut self) {
        self.probe = PdfProbe::default();
        self.info.reload();
        self.viewer.clear();
        self.optimise.reset();
        self.decrypt.reset();
        self.office = OfficeReview::new();
        self.edited = None;
    }

    /// Replaces the stored bytes with a rewritten version of the same
    /// document. Results computed from the old bytes are dropped.
    fn commit_edit(&mut self, name: &str, bytes: Vec<u8>) {
        let file = StoredFile::new(name, bytes);
        if file.kind == FileKind::Pdf {
            self.probe = PdfProbe::scan(&file.bytes);
        }
        self.session.replace(file, Replacement::Edit);
        self.optimise.reset();
    }

    fn current_file(&self) -> Result<StoredFile, ToolError> {
        self.session.file().cloned().ok_or(ToolError::NoFile)
    }

    fn current_pdf(&self) -> Result<StoredFile, ToolError> {
        let file = self.current_file()?;
        match file.kind {
            FileKind::Pdf => Ok(file),
            other => Err(ToolError::UnsupportedFormat(format!("{other:?} is not a PDF"))),
        }
    }

    fn slot(&mut self, which: Slot) -> &mut OperationSlot {
        match which {
            Slot::Optimise => &mut self.optimise,
            Slot::Decrypt => &mut self.decrypt,
        }
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Optimise,
    Decrypt,
}

struct Inner<E> {
    bridge: Bridge<E>,
    options: ToolboxOptions,
    state: RefCell<State>,
}

pub struct Workspace<E> {
    inner: Rc<Inner<E>>,
}

impl<E> Clone for Workspace<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: PdfEngine + 'static> Workspace<E> {
    pub fn new<F>(engine: E, init: F, options: ToolboxOptions) -> Self
    where
        F: Future<Output = Result<(), String>> + 'static,
    {
        Self::with_bridge(Bridge::new(engine, init), options)
    }

    pub fn ready_now(engine: E, options: ToolboxOptions) -> Self {
        Self::with_bridge(Bridge::ready_now(engine), options)
    }

    fn with_bridge(bridge: Bridge<E>, options: ToolboxOptions) -> Self {
        let state = State::new(&options);
        Self {
            inner: Rc::new(Inner {
                bridge,
                options,
                state: RefCell::new(state),
            }),
        }
    }

    pub fn options(&self) -> &ToolboxOptions {
        &self.inner.options
    }

    pub fn engine_ready(&self) -> bool {
        self.inner.bridge.is_ready()
    }

    /// The drop surface: exactly one file.
    pub fn select_files(
        &self,
        mut files: Vec<(String, Vec<u8>)>,
    ) -> Result<FileSummary, ToolError> {
        ensure_single_selection(files.len())?;
        let (name, bytes) = files.remove(0);
        self.select_file(name, bytes)
    }

    /// Makes `name` the current file. Unsupported files are rejected and the
    /// current file is kept.
    pub fn select_file(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<FileSummary, ToolError> {
        let file = StoredFile::new(name, bytes);
        let route = route_for(file.kind).map_err(|e| {
            log::warn!("rejected {}: {e}", file.name);
            ToolError::UnsupportedFormat(file.name.clone())
        })?;

        let mut state = self.inner.state.borrow_mut();
        state.reset_derived();
        match route {
            FileRoute::PdfView => state.probe = PdfProbe::scan(&file.bytes),
            FileRoute::DocReview => {
                let inspection = office::inspect(file.kind, &file.bytes).map_err(ToolError::from);
                state.office.finish_inspection(inspection);
            }
        }
        let summary = FileSummary {
            name: file.name.clone(),
            kind: file.kind,
            route,
            size: file.size(),
            generation: 0,
        };
        let generation = state.session.replace(file, Replacement::NewFile);
        Ok(FileSummary {
            generation: generation.value(),
            ..summary
        })
    }

    pub fn clear(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.reset_derived();
        state.session.clear();
    }

    pub fn current_file(&self) -> Option<StoredFile> {
        self.inner.state.borrow().session.file().cloned()
    }

    /// Current bytes as a download.
    pub fn save_file(&self) -> Result<OutputFile, ToolError> {
        let file = self.inner.state.borrow().current_file()?;
        Ok(OutputFile::new(file.name, file.bytes.to_vec()))
    }

    pub fn probe(&self) -> PdfProbe {
        self.inner.state.borrow().probe.clone()
    }

    /// Loads document info for the current PDF unless it is loaded (or
    /// loading) already.
    pub async fn load_info(&self) -> Result<InfoView, ToolError> {
        let (ticket, file) = {
            let mut state = self.inner.state.borrow_mut();
            let file = state.current_pdf()?;
            if !state.info.begin_load() {
                return Ok(state.info.view());
            }
            (state.session.ticket(), file)
        };

        let result = self.inner.bridge.get_info(&file.name, &file.bytes).await;

        let mut state = self.inner.state.borrow_mut();
        if state.session.is_current(ticket) {
            state.info.finish_load(result);
        } else {
            log::debug!("info: discarding result for a superseded file");
        }
        Ok(state.info.view())
    }

    /// Drops the loaded info and loads it again.
    pub async fn reload_info(&self) -> Result<InfoView, ToolError> {
        self.inner.state.borrow_mut().info.reload();
        self.load_info().await
    }

    pub fn info(&self) -> InfoView {
        self.inner.state.borrow().info.view()
    }

    pub fn set_property(
        &self,
        field: PropertyField,
        value: impl Into<String>,
    ) -> Result<InfoView, ToolError> {
        let mut state = self.inner.state.borrow_mut();
        state.info.set_property(field, value)?;
        Ok(state.info.view())
    }

    pub fn clear_edits(&self) -> Result<InfoView, ToolError> {
        let mut state = self.inner.state.borrow_mut();
        state.info.clear_edits()?;
        Ok(state.info.view())
    }

    /// Writes the pending edits. On success the stored file becomes the
    /// edited document and a `<stem>-edited.pdf` download is produced.
    pub async fn save_info(&self) -> Result<OutputFile, ToolError> {
        let (ticket, file, properties) = {
            let mut state = self.inner.state.borrow_mut();
            let file = state.current_pdf()?;
            let properties = state.info.begin_save()?;
            (state.session.ticket(), file, properties)
        };

        let result = self
            .inner
            .bridge
            .set_properties(&file.name, &file.bytes, &properties)
            .await;

        let mut state = self.inner.state.borrow_mut();
        if !state.session.is_current(ticket) {
            log::debug!("info: discarding save for a superseded file");
            return Err(ToolError::Superseded);
        }
        match result {
            Ok(output) => {
                let download = OutputFile::new(
                    derived_name(&file.name, &self.inner.options.edited_suffix),
                    output.bytes,
                );
                state.info.finish_save(Ok(()));
                state.commit_edit(&file.name, download.bytes.clone());
                state.edited = Some(download.clone());
                Ok(download)
            }
            Err(e) => {
                state.info.finish_save(Err(e.clone()));
                Err(e)
            }
        }
    }

    /// Last document produced by [`Workspace::save_info`].
    pub fn edited_file(&self) -> Option<OutputFile> {
        self.inner.state.borrow().edited.clone()
    }

    pub async fn optimise(&self) -> Result<Outcome, ToolError> {
        let (ticket, file) = match self.begin(Slot::Optimise)? {
            Some(started) => started,
            None => return Ok(Outcome::Ignored),
        };
        let result = self.inner.bridge.optimise(&file.name, &file.bytes).await;
        self.finish(Slot::Optimise, ticket, result).map(|(outcome, _)| outcome)
    }

    /// Removes restrictions (decrypts with the empty user password). On
    /// success the stored file is replaced and info is read again.
    pub async fn remove_restrictions(&self) -> Result<Outcome, ToolError> {
        let (ticket, file) = match self.begin(Slot::Decrypt)? {
            Some(started) => started,
            None => return Ok(Outcome::Ignored),
        };
        let result = self.inner.bridge.decrypt(&file.name, &file.bytes).await;
        let (outcome, output) = self.finish(Slot::Decrypt, ticket, result)?;
        if let Some(output) = output {
            {
                let mut state = self.inner.state.borrow_mut();
                state.commit_edit(&file.name, output.bytes);
                state.info.reload();
            }
            self.load_info().await?;
        }
        Ok(outcome)
    }

    pub fn operation(&self, name: &str) -> Option<OperationView> {
        let state = self.inner.state.borrow();
        let (slot, original) = match name {
            "optimise" | "optimize" => {
                (&state.optimise, state.session.file().map(StoredFile::size))
            }
            "decrypt" | "remove-restrictions" => (&state.decrypt, None),
            _ => return None,
        };
        Some(OperationView {
            busy: slot.is_busy(),
            result: slot.result().cloned(),
            error: slot.last_error().map(ToString::to_string),
            savings_percent: slot
                .result()
                .zip(original)
                .and_then(|(out, size)| out.savings_percent(size)),
        })
    }

    fn begin(&self, which: Slot) -> Result<Option<(Ticket, StoredFile)>, ToolError> {
        let mut state = self.inner.state.borrow_mut();
        let file = state.current_pdf()?;
        let ticket = state.session.ticket();
        Ok(match state.slot(which).trigger(ticket) {
            Trigger::Started(ticket) => Some((ticket, file)),
            Trigger::Ignored => None,
        })
    }

    /// Hands a result to its slot. Returns the output when it was applied.
    fn finish(
        &self,
        which: Slot,
        ticket: Ticket,
        result: Result<OutputFile, ToolError>,
    ) -> Result<(Outcome, Option<OutputFile>), ToolError> {
        let mut state = self.inner.state.borrow_mut();
        let generation = state.session.generation();
        let applied = result.clone();
        match state.slot(which).complete(ticket, generation, result) {
            Completion::Stale => Ok((Outcome::Stale, None)),
            Completion::Applied => applied.map(|output| (Outcome::Applied, Some(output))),
        }
    }

    pub fn office(&self) -> OfficeView {
        self.inner.state.borrow().office.view()
    }

    /// Strips edit protection from the current office document. The stored
    /// file becomes the unlocked package and a `<stem>-unlocked.<ext>`
    /// download is produced.
    pub fn remove_edit_protection(&self) -> Result<OutputFile, ToolError> {
        let mut state = self.inner.state.borrow_mut();
        let file = state.current_file()?;
        state.office.begin_unlock()?;

        let result = office::remove_edit_protection(file.kind, &file.bytes)
            .map(|bytes| OutputFile::new(derived_name(&file.name, "-unlocked"), bytes))
            .map_err(ToolError::from);
        if let Ok(output) = &result {
            state.session.replace(
                StoredFile::new(file.name.clone(), output.bytes.clone()),
                Replacement::Edit,
            );
        }
        state.office.finish_unlock(result.clone());
        result
    }

    /// The renderer loaded the current document with `raw_count` pages.
    pub fn on_document_load(&self, raw_count: f64) -> Result<ViewerState, ToolError> {
        let mut state = self.inner.state.borrow_mut();
        let fallback = self.inner.options.default_page_size();
        let estimates = match PageCount::new(raw_count) {
            Ok(count) => state.probe.estimated_sizes(count.get(), fallback),
            Err(_) => Vec::new(),
        };
        state.viewer.on_document_load(raw_count, &estimates)?;
        Ok(state.viewer.state())
    }

    /// Runs `f` against the viewer and returns its new state.
    pub fn with_viewer<R>(&self, f: impl FnOnce(&mut Viewer) -> R) -> (R, ViewerState) {
        let mut state = self.inner.state.borrow_mut();
        let value = f(&mut state.viewer);
        (value, state.viewer.state())
    }

    pub fn viewer(&self) -> ViewerState {
        self.inner.state.borrow().viewer.state()
    }

    pub fn thumbnails(&self) -> Vec<Thumbnail> {
        self.inner.state.borrow().viewer.thumbnails()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LopdfEngine;
    use crate::metadata::{GENERIC_FAILURE, InfoState};
    use crate::office::DocStatus;
    use crate::schema::{EngineError, FileInfo, Properties};
    use crate::test_utils::{FakeEngine, sample_pdf, zip_package};
    use futures::channel::oneshot;
    use futures::executor::{LocalPool, block_on};
    use futures::task::LocalSpawnExt;
    use std::cell::Cell;

    fn pdf() -> Vec<u8> {
        b"%PDF-1.7\n1 0 obj << /Type /Pages /Count 2 >> endobj".to_vec()
    }

    fn titled(title: &str) -> FileInfo {
        FileInfo {
            page_count: Some(2),
            properties: Properties {
                title: Some(title.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn workspace(engine: FakeEngine) -> Workspace<FakeEngine> {
        Workspace::ready_now(engine, ToolboxOptions::default())
    }

    /// A workspace whose engine stays uninitialized until the sender fires.
    fn gated(engine: FakeEngine) -> (Workspace<FakeEngine>, oneshot::Sender<Result<(), String>>) {
        let (tx, rx) = oneshot::channel::<Result<(), String>>();
        let ws = Workspace::new(
            engine,
            async move { rx.await.unwrap_or_else(|_| Err("init dropped".into())) },
            ToolboxOptions::default(),
        );
        (ws, tx)
    }

    #[test]
    fn selection_routes_by_type() {
        let ws = workspace(FakeEngine::default());
        let summary = ws.select_file("a.pdf", pdf()).unwrap();
        assert_eq!(summary.route, FileRoute::PdfView);
        assert_eq!(summary.generation, 1);
        assert_eq!(ws.probe().page_count_hint, Some(2));

        let docx = zip_package(&[("word/document.xml", "<w:document/>")]);
        let summary = ws.select_file("notes.docx", docx).unwrap();
        assert_eq!(summary.route, FileRoute::DocReview);
        assert_eq!(ws.office().status, DocStatus::Unprotected);

        assert_eq!(
            ws.select_file("notes.txt", b"hello".to_vec()).map(|s| s.route),
            Err(ToolError::UnsupportedFormat("notes.txt".into()))
        );
        assert_eq!(ws.current_file().unwrap().name, "notes.docx");

        assert_eq!(ws.select_files(vec![]), Err(ToolError::InvalidSelection(0)));
        let two = vec![("a.pdf".to_string(), pdf()), ("b.pdf".to_string(), pdf())];
        assert_eq!(ws.select_files(two), Err(ToolError::InvalidSelection(2)));
    }

    #[test]
    fn operations_need_a_pdf() {
        let ws = workspace(FakeEngine::default());
        assert_eq!(block_on(ws.optimise()), Err(ToolError::NoFile));
        assert_eq!(ws.save_file().unwrap_err(), ToolError::NoFile);
        ws.select_file("x.docx", zip_package(&[("word/document.xml", "")])).unwrap();
        assert!(matches!(
            block_on(ws.load_info()),
            Err(ToolError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn info_loads_once_per_file() {
        let engine = FakeEngine::default()
            .with_info(Ok(titled("Report")))
            .with_info(Err(EngineError::Other("trap".into())));
        let ws = workspace(engine);
        ws.select_file("a.pdf", pdf()).unwrap();

        let view = block_on(ws.load_info()).unwrap();
        assert_eq!(view.state, InfoState::Loaded);
        assert_eq!(view.info.unwrap().properties.title.as_deref(), Some("Report"));
        block_on(ws.load_info()).unwrap();
        assert_eq!(ws.inner.bridge.engine().info_calls.get(), 1);

        ws.select_file("b.pdf", pdf()).unwrap();
        assert_eq!(ws.info().state, InfoState::Unloaded);
        let view = block_on(ws.load_info()).unwrap();
        assert_eq!(view.state, InfoState::Failed(GENERIC_FAILURE.into()));
    }

    #[test]
    fn save_replaces_stored_file_and_names_download() {
        let engine = FakeEngine::default()
            .with_info(Ok(titled("Report")))
            .with_set(Ok(()));
        let ws = workspace(engine);
        ws.select_file("report.pdf", pdf()).unwrap();
        block_on(ws.load_info()).unwrap();
        ws.set_property(PropertyField::Author, "Grace").unwrap();

        let download = block_on(ws.save_info()).unwrap();

        assert_eq!(download.file_name, "report-edited.pdf");
        assert_eq!(download.bytes, b"%PDF-edited");
        let stored = ws.current_file().unwrap();
        assert_eq!(stored.name, "report.pdf");
        assert_eq!(&*stored.bytes, b"%PDF-edited");
        let info = ws.info();
        assert_eq!(info.state, InfoState::Loaded);
        assert!(!info.edited);
        assert_eq!(info.info.unwrap().properties.author.as_deref(), Some("Grace"));
        assert_eq!(ws.edited_file(), Some(download));

        let sent = ws.inner.bridge.engine().set_calls.borrow()[0].clone();
        assert_eq!(sent.title.as_deref(), Some("Report"));
        assert_eq!(sent.author.as_deref(), Some("Grace"));
    }

    #[test]
    fn failed_save_keeps_edits() {
        let engine = FakeEngine::default()
            .with_info(Ok(titled("Report")))
            .with_set(Err(EngineError::Other("disk".into())));
        let ws = workspace(engine);
        ws.select_file("report.pdf", pdf()).unwrap();
        block_on(ws.load_info()).unwrap();
        ws.set_property(PropertyField::Title, "Final").unwrap();

        assert!(block_on(ws.save_info()).is_err());

        let info = ws.info();
        assert_eq!(info.state, InfoState::Loaded);
        assert!(info.edited);
        assert!(info.error.is_some());
        assert_eq!(&*ws.current_file().unwrap().bytes, pdf().as_slice());
    }

    #[test]
    fn optimise_failure_keeps_previous_result() {
        let engine = FakeEngine::default()
            .with_optimise(Ok(vec![b'%'; 10]))
            .with_optimise(Err(EngineError::Other("oom".into())));
        let ws = workspace(engine);
        ws.select_file("a.pdf", pdf()).unwrap();

        assert_eq!(block_on(ws.optimise()), Ok(Outcome::Applied));
        let view = ws.operation("optimise").unwrap();
        assert_eq!(view.result.as_ref().map(|o| o.file_name.as_str()), Some("a-optimised.pdf"));
        assert!(view.savings_percent.is_some());

        assert!(block_on(ws.optimise()).is_err());
        let view = ws.operation("optimise").unwrap();
        assert!(!view.busy);
        assert_eq!(view.result.map(|o| o.size), Some(10));
        assert_eq!(view.error.as_deref(), Some("engine failure: oom"));
    }

    #[test]
    fn reentrant_trigger_is_ignored() {
        let engine = FakeEngine::default().with_optimise(Ok(vec![1]));
        let (ws, tx) = gated(engine);
        ws.select_file("a.pdf", pdf()).unwrap();

        let mut pool = LocalPool::new();
        let first = Rc::new(Cell::new(None));
        let slot = Rc::clone(&first);
        let handle = ws.clone();
        pool.spawner()
            .spawn_local(async move { slot.set(Some(handle.optimise().await)) })
            .unwrap();
        pool.run_until_stalled();
        assert!(ws.operation("optimise").unwrap().busy);

        assert_eq!(block_on(ws.optimise()), Ok(Outcome::Ignored));

        tx.send(Ok(())).unwrap();
        pool.run();
        assert_eq!(first.take(), Some(Ok(Outcome::Applied)));
        assert!(!ws.operation("optimise").unwrap().busy);
    }

    #[test]
    fn stale_completion_leaves_new_file_alone() {
        let engine = FakeEngine::default()
            .with_optimise(Ok(vec![1, 2, 3]))
            .with_info(Ok(titled("Old")));
        let (ws, tx) = gated(engine);
        ws.select_file("old.pdf", pdf()).unwrap();

        let mut pool = LocalPool::new();
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        for op in 0..2 {
            let handle = ws.clone();
            let outcomes = Rc::clone(&outcomes);
            pool.spawner()
                .spawn_local(async move {
                    let outcome = if op == 0 {
                        handle.optimise().await.map(|o| format!("{o:?}"))
                    } else {
                        handle.load_info().await.map(|v| format!("{:?}", v.state))
                    };
                    outcomes.borrow_mut().push(outcome);
                })
                .unwrap();
        }
        pool.run_until_stalled();

        ws.select_file("new.pdf", pdf()).unwrap();
        tx.send(Ok(())).unwrap();
        pool.run();

        assert!(outcomes.borrow().contains(&Ok("Stale".to_string())));
        let view = ws.operation("optimise").unwrap();
        assert!(!view.busy);
        assert_eq!(view.result, None);
        assert_eq!(ws.info().state, InfoState::Unloaded);
        assert_eq!(ws.current_file().unwrap().name, "new.pdf");
    }

    #[test]
    fn selecting_a_new_file_clears_everything_derived() {
        let engine = FakeEngine::default()
            .with_info(Err(EngineError::Other("boom".into())))
            .with_optimise(Ok(vec![1, 2, 3]))
            .with_decrypt(Err(EngineError::Encrypted));
        let ws = workspace(engine);
        ws.select_file("a.pdf", pdf()).unwrap();

        let view = block_on(ws.load_info()).unwrap();
        assert_eq!(view.state, InfoState::Failed(GENERIC_FAILURE.into()));
        assert_eq!(block_on(ws.optimise()).unwrap(), Outcome::Applied);
        assert!(block_on(ws.remove_restrictions()).is_err());
        ws.on_document_load(3.0).unwrap();
        ws.with_viewer(|v| v.rotate_page(2)).0.unwrap();
        ws.with_viewer(|v| v.set_page_size(1, 400.0, 600.0)).0.unwrap();
        assert!(ws.operation("optimise").unwrap().result.is_some());
        assert!(ws.operation("decrypt").unwrap().error.is_some());
        assert_eq!(ws.viewer().measured_pages, 1);

        ws.select_file("b.pdf", pdf()).unwrap();

        let optimise = ws.operation("optimise").unwrap();
        assert_eq!((optimise.result, optimise.error), (None, None));
        assert_eq!(ws.operation("decrypt").unwrap().error, None);
        let info = ws.info();
        assert_eq!(info.state, InfoState::Unloaded);
        assert_eq!(info.error, None);
        assert!(ws.thumbnails().is_empty());
        assert_eq!(ws.viewer().page_count, 0);

        let state = ws.on_document_load(3.0).unwrap();
        assert_eq!(state.measured_pages, 0);
        assert!(ws.thumbnails().iter().all(|t| t.rotation == 0));
    }

    #[test]
    fn engine_init_failure_surfaces_as_unavailable() {
        let ws = Workspace::new(
            FakeEngine::default(),
            async { Err("wasm fetch failed".to_string()) },
            ToolboxOptions::default(),
        );
        ws.select_file("a.pdf", pdf()).unwrap();
        let err = block_on(ws.optimise()).unwrap_err();
        assert_eq!(err, ToolError::EngineUnavailable("wasm fetch failed".into()));
        assert!(!ws.engine_ready());
    }

    #[test]
    fn remove_restrictions_reloads_info_from_new_bytes() {
        let engine = FakeEngine::default()
            .with_info(Err(EngineError::Restricted))
            .with_decrypt(Ok(b"%PDF-open".to_vec()))
            .with_info(Ok(titled("Unlocked")));
        let ws = workspace(engine);
        ws.select_file("locked.pdf", pdf()).unwrap();
        assert_eq!(block_on(ws.load_info()).unwrap().state, InfoState::Restricted);

        assert_eq!(block_on(ws.remove_restrictions()), Ok(Outcome::Applied));

        assert_eq!(&*ws.current_file().unwrap().bytes, b"%PDF-open");
        assert_eq!(ws.info().state, InfoState::Loaded);
        let view = ws.operation("decrypt").unwrap();
        assert_eq!(view.result.map(|o| o.file_name), Some("locked-decrypted.pdf".to_string()));
    }

    #[test]
    fn viewer_uses_probe_estimates() {
        let ws = workspace(FakeEngine::default());
        ws.select_file("a.pdf", sample_pdf(3, None)).unwrap();
        assert!(ws.on_document_load(-2.0).is_err());
        let state = ws.on_document_load(3.0).unwrap();
        assert_eq!(state.page_count, 3);
        assert_eq!(state.page_label, "1 / 3");

        let (page, state) = ws.with_viewer(|v| v.goto_page(2));
        assert_eq!(page, 2);
        assert_eq!(state.current_page, 2);
        assert_eq!(ws.thumbnails().len(), 3);
    }

    #[test]
    fn office_protection_removal_replaces_stored_file() {
        let docx = zip_package(&[
            ("word/document.xml", "<w:document/>"),
            (
                "word/settings.xml",
                r#"<w:settings xmlns:w="w"><w:documentProtection w:edit="readOnly"/></w:settings>"#,
            ),
        ]);
        let ws = workspace(FakeEngine::default());
        ws.select_file("memo.docx", docx.clone()).unwrap();
        assert_eq!(ws.office().status, DocStatus::EditProtected);

        let out = ws.remove_edit_protection().unwrap();

        assert_eq!(out.file_name, "memo-unlocked.docx");
        assert_eq!(ws.office().status, DocStatus::Unprotected);
        let saved = ws.save_file().unwrap();
        assert_eq!(saved.file_name, "memo.docx");
        assert_eq!(saved.bytes, out.bytes);
        assert_ne!(saved.bytes, docx);
        assert!(ws.remove_edit_protection().is_err());
    }

    #[test]
    fn end_to_end_with_lopdf() {
        let ws = Workspace::ready_now(LopdfEngine::new(), ToolboxOptions::default());
        ws.select_file("report.pdf", sample_pdf(3, Some("Report"))).unwrap();

        let view = block_on(ws.load_info()).unwrap();
        let info = view.info.unwrap();
        assert_eq!(info.page_count, Some(3));
        assert_eq!(info.properties.title.as_deref(), Some("Report"));

        ws.set_property(PropertyField::Author, "Grace").unwrap();
        let download = block_on(ws.save_info()).unwrap();
        assert_eq!(download.file_name, "report-edited.pdf");

        let reloaded = block_on(ws.reload_info()).unwrap().info.unwrap();
        assert_eq!(reloaded.properties.author.as_deref(), Some("Grace"));
        assert_eq!(reloaded.properties.title.as_deref(), Some("Report"));

        assert_eq!(block_on(ws.optimise()), Ok(Outcome::Applied));
        let optimised = ws.operation("optimise").unwrap().result.unwrap();
        assert_eq!(optimised.file_name, "report-optimised.pdf");
        assert!(optimised.bytes.starts_with(b"%PDF"));
    }
}
