use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error type a callback may abort a subtree with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Walk aborted at {path}: {source}")]
    Aborted { path: PathBuf, source: BoxError },
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },
    #[error("Failed to spawn walker thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("{0}")]
    Multiple(ErrorList),
}

impl WalkError {
    pub(crate) fn read_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WalkError::ReadDir {
            path: path.into(),
            source,
        }
    }
    pub(crate) fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WalkError::Stat {
            path: path.into(),
            source,
        }
    }
    pub(crate) fn aborted(path: impl Into<PathBuf>, source: BoxError) -> Self {
        WalkError::Aborted {
            path: path.into(),
            source,
        }
    }

    /// Returns the aggregated per-path failures, if this is an aggregate.
    pub fn errors(&self) -> Option<&ErrorList> {
        match self {
            WalkError::Multiple(list) => Some(list),
            _ => None,
        }
    }
}

/// A failure recorded while processing one directory.
///
/// `path` is the directory whose processing stopped; the underlying error names the
/// entry that actually failed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PathError {
    pub path: PathBuf,
    #[source]
    pub error: WalkError,
}

/// Every [`PathError`] collected during one walk, in order of arrival.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<PathError>,
}

impl ErrorList {
    pub(crate) fn push(&mut self, error: PathError) {
        self.errors.push(error);
    }
    pub fn errors(&self) -> &[PathError] {
        &self.errors
    }
    pub fn len(&self) -> usize {
        self.errors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
    pub fn into_inner(self) -> Vec<PathError> {
        self.errors
    }
    pub fn iter(&self) -> std::slice::Iter<'_, PathError> {
        self.errors.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl IntoIterator for ErrorList {
    type Item = PathError;
    type IntoIter = std::vec::IntoIter<PathError>;
    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a PathError;
    type IntoIter = std::slice::Iter<'a, PathError>;
    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
