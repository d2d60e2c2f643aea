//! Document info screen state: loading the engine's report, pending property
//! edits and saving them back.

use serde::Serialize;

use crate::schema::{EngineError, FileInfo, Properties, PropertyField, ToolError};

/// Shown when the engine fails in a way it did not classify.
pub const GENERIC_FAILURE: &str = "Something went wrong when processing your file";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "kebab-case")]
pub enum InfoState {
    Unloaded,
    Loading,
    Loaded,
    /// Needs a password; nothing more can be done with the file.
    Encrypted,
    /// Viewable, and restrictions can be removed.
    Restricted,
    /// Not a readable PDF.
    Invalid(String),
    Failed(String),
    Saving,
}

/// What the info panel renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoView {
    #[serde(flatten)]
    pub state: InfoState,
    pub info: Option<FileInfo>,
    pub edited: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoFlow {
    state: InfoState,
    snapshot: Option<FileInfo>,
    overlay: Properties,
    error: Option<ToolError>,
}

impl Default for InfoFlow {
    fn default() -> Self {
        Self {
            state: InfoState::Unloaded,
            snapshot: None,
            overlay: Properties::default(),
            error: None,
        }
    }
}

impl InfoFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InfoState {
        &self.state
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    pub fn snapshot(&self) -> Option<&FileInfo> {
        self.snapshot.as_ref()
    }

    pub fn has_edits(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// Loaded info with pending edits applied.
    pub fn merged(&self) -> Option<FileInfo> {
        self.snapshot.as_ref().map(|info| info.with_overlay(&self.overlay))
    }

    /// Returns false when there is nothing to load: a load is running or
    /// already finished for this file.
    pub fn begin_load(&mut self) -> bool {
        if self.state != InfoState::Unloaded {
            return false;
        }
        self.state = InfoState::Loading;
        true
    }

    pub fn finish_load(&mut self, result: Result<FileInfo, ToolError>) {
        if self.state != InfoState::Loading {
            log::debug!("info: load finished in state {:?}, ignoring", self.state);
            return;
        }
        self.state = match result {
            Ok(info) => {
                self.snapshot = Some(info);
                InfoState::Loaded
            }
            Err(ToolError::Engine(EngineError::Encrypted)) => {
                self.snapshot = Some(FileInfo {
                    encrypted: Some(true),
                    ..Default::default()
                });
                InfoState::Encrypted
            }
            Err(ToolError::Engine(EngineError::Restricted)) => {
                self.snapshot = Some(FileInfo {
                    restricted: Some(true),
                    ..Default::default()
                });
                InfoState::Restricted
            }
            Err(ToolError::Engine(EngineError::Invalid(message))) => {
                log::warn!("info: invalid document: {message}");
                InfoState::Invalid(message)
            }
            Err(e) => {
                log::error!("info: {e}");
                self.error = Some(e);
                InfoState::Failed(GENERIC_FAILURE.into())
            }
        };
    }

    /// Records an edit. Setting a field back to its loaded value drops the
    /// edit.
    pub fn set_property(
        &mut self,
        field: PropertyField,
        value: impl Into<String>,
    ) -> Result<(), ToolError> {
        let loaded = self.require_loaded("editing")?;
        let value = value.into();
        let pending = (loaded.properties.get(field) != Some(value.as_str())).then_some(value);
        self.overlay.set(field, pending);
        Ok(())
    }

    pub fn clear_edits(&mut self) -> Result<(), ToolError> {
        self.require_loaded("discarding edits")?;
        self.overlay = Properties::default();
        Ok(())
    }

    /// Moves to `Saving` and returns the full property set to write.
    pub fn begin_save(&mut self) -> Result<Properties, ToolError> {
        let properties = self.require_loaded("saving")?.properties.overlay(&self.overlay);
        self.state = InfoState::Saving;
        self.error = None;
        Ok(properties)
    }

    pub fn finish_save(&mut self, result: Result<(), ToolError>) {
        if self.state != InfoState::Saving {
            log::debug!("info: save finished in state {:?}, ignoring", self.state);
            return;
        }
        match result {
            Ok(()) => {
                self.snapshot = self.merged();
                self.overlay = Properties::default();
            }
            Err(e) => {
                log::error!("info: save failed: {e}");
                self.error = Some(e);
            }
        }
        self.state = InfoState::Loaded;
    }

    /// Forgets everything so the next load starts from scratch.
    pub fn reload(&mut self) {
        *self = Self::default();
    }

    pub fn view(&self) -> InfoView {
        InfoView {
            state: self.state.clone(),
            info: self.merged(),
            edited: self.has_edits(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    fn require_loaded(&self, action: &'static str) -> Result<&FileInfo, ToolError> {
        match (&self.state, &self.snapshot) {
            (InfoState::Loaded, Some(info)) => Ok(info),
            _ => Err(ToolError::InvalidState(action)),
        }
    }
}
