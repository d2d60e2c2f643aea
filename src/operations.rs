//! Busy flag, one-shot result and last error of a single file operation.

use crate::schema::{OutputFile, ToolError};
use crate::session::{Generation, Ticket};

/// Outcome of asking an operation to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Started(Ticket),
    /// The operation is already running; the request was dropped.
    Ignored,
}

/// Outcome of handing a finished operation's result back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The file changed while the operation ran; nothing was touched.
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationSlot {
    name: &'static str,
    running: Option<Ticket>,
    result: Option<OutputFile>,
    last_error: Option<ToolError>,
}

impl OperationSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }

    pub fn result(&self) -> Option<&OutputFile> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&ToolError> {
        self.last_error.as_ref()
    }

    pub fn trigger(&mut self, ticket: Ticket) -> Trigger {
        if self.running.is_some() {
            log::debug!("{}: already running, ignoring trigger", self.name);
            return Trigger::Ignored;
        }
        self.running = Some(ticket);
        self.last_error = None;
        Trigger::Started(ticket)
    }

    /// Applies `outcome` if `ticket` still matches the `current` generation.
    /// A failure keeps the previous result. A stale completion of this slot's
    /// own run only releases the busy flag.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        current: Generation,
        outcome: Result<OutputFile, ToolError>,
    ) -> Completion {
        if self.running == Some(ticket) {
            self.running = None;
        }
        if ticket.generation() != current {
            log::debug!("{}: discarding result for a superseded file", self.name);
            return Completion::Stale;
        }
        self.running = None;
        match outcome {
            Ok(output) => {
                log::info!("{}: produced {} ({} bytes)", self.name, output.file_name, output.size);
                self.result = Some(output);
            }
            Err(e) => {
                log::error!("{}: {e}", self.name);
                self.last_error = Some(e);
            }
        }
        Completion::Applied
    }

    /// Forgets everything; used when the file is replaced.
    pub fn reset(&mut self) {
        *self = Self::new(self.name);
    }
}
