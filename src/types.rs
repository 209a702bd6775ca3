use crate::error::BoxError;
use serde::{Deserialize, Serialize};

/// What the walker should do after the callback has seen an entry.
#[derive(Debug)]
pub enum Visit {
    /// Keep going. Directories are queued for descent.
    Continue,
    /// Do not descend into this directory. Not an error; ignored for non-directories.
    SkipSubtree,
    /// Stop processing the remaining entries of the current directory and record the cause.
    ///
    /// Other subtrees already in flight are not affected.
    Abort(BoxError),
}

impl Visit {
    /// Shorthand for [`Visit::Abort`] from anything convertible into a boxed error.
    pub fn abort(cause: impl Into<BoxError>) -> Self {
        Visit::Abort(cause.into())
    }
}

/// Counters for the last completed walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    /// Directory jobs submitted, root included.
    pub directories: u64,
    /// Jobs handed to the worker pool through the queue.
    pub queued: u64,
    /// Jobs run on the submitting thread because the queue was full.
    pub inline: u64,
    /// Failures in the aggregate error.
    pub errors: u64,
}
