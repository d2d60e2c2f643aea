//! The current-file slot.
//!
//! One file is checked out at a time. Every replacement bumps a generation
//! counter; asynchronous work captures a [`Ticket`] when it starts and checks
//! it before applying its result, so a slow operation on a superseded file
//! can never overwrite state that belongs to a newer one.

use std::rc::Rc;

use crate::file_utils::{FileKind, detect_type};

/// Monotonic version of the session's file slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Proof of which file an operation started against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: Generation,
}

impl Ticket {
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// An uploaded file. Bytes are shared so operations can hold them across
/// awaits without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub name: String,
    pub kind: FileKind,
    pub bytes: Rc<[u8]>,
}

impl StoredFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = detect_type(Some(&name), &bytes);
        Self {
            name,
            kind,
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Why the slot was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// A different file was selected; everything derived from the old one
    /// is stale.
    NewFile,
    /// The same document was rewritten by an edit (metadata save, restriction
    /// removal); the view of it stays, results computed from the old bytes
    /// do not.
    Edit,
}

#[derive(Debug, Default)]
pub struct Session {
    file: Option<StoredFile>,
    generation: Generation,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&StoredFile> {
        self.file.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
        }
    }

    /// True while no replacement has happened since `ticket` was taken.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.generation == self.generation
    }

    pub fn replace(&mut self, file: StoredFile, why: Replacement) -> Generation {
        self.generation.0 += 1;
        log::info!(
            "session: {} {} ({} bytes), generation {}",
            match why {
                Replacement::NewFile => "selected",
                Replacement::Edit => "rewrote",
            },
            file.name,
            file.size(),
            self.generation.0
        );
        self.file = Some(file);
        self.generation
    }

    pub fn clear(&mut self) {
        self.generation.0 += 1;
        self.file = None;
    }
}
