//! Error types for loading animations into a view.

use std::fmt;

/// Why an animation file could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// Neither the raw resource store nor the filesystem has the file.
    NotFound,
    /// The source was found but reading it failed.
    Unreadable,
    /// The bytes are not a valid animation.
    Parse,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadErrorKind::NotFound => "Unable to load",
            LoadErrorKind::Unreadable => "Unable to read",
            LoadErrorKind::Parse => "Unable to parse",
        })
    }
}

/// Loading an animation file into a view failed.
///
/// The view is left without an animation when this is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} Lottie animation file \"{file_name}\".")]
pub struct LoadError {
    pub file_name: String,
    pub kind: LoadErrorKind,
}

impl LoadError {
    pub fn new(file_name: impl Into<String>, kind: LoadErrorKind) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
        }
    }

    pub fn not_found(file_name: impl Into<String>) -> Self {
        Self::new(file_name, LoadErrorKind::NotFound)
    }

    pub fn parse(file_name: impl Into<String>) -> Self {
        Self::new(file_name, LoadErrorKind::Parse)
    }
}

/// Failures of the low-level resource resolution step.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// Resolution was asked to open an empty or whitespace-only name.
    #[error("file name must not be blank")]
    BlankFileName,
    #[error("failed to open \"{file_name}\": {source}")]
    Io {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
}
