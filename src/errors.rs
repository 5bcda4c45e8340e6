use std::{io, path::PathBuf};

/// Shared error type for the virtual filesystem engine and its commands.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// File system I/O failure on the real disk.
    #[error("I/O error while accessing {0}")]
    Io(PathBuf, #[source] io::Error),

    /// A file, directory, user or trash entry does not exist.
    #[error("{0}: not found")]
    NotFound(String),

    /// A sibling with the same (case-insensitive) name already exists.
    #[error("a file or directory named {0} already exists")]
    AlreadyExists(String),

    /// A directory reached its sibling limit.
    #[error("{what} limit reached in {dir} (max {limit})")]
    CapacityExceeded {
        dir: String,
        what: &'static str,
        limit: usize,
    },

    /// A name cannot be used for a file or directory.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// An operation was rejected due to argument issues.
    #[error("invalid command input: {0}")]
    InvalidInput(String),

    /// The privilege gate refused the operation.
    #[error("access denied: {0}")]
    PermissionDenied(String),

    /// The operation could not be completed because a pre-condition failed.
    #[error("pre-condition failed: {0}")]
    PreconditionFailed(String),

    /// A snapshot record could not be parsed.
    #[error("snapshot line {line}: {reason}")]
    Snapshot { line: usize, reason: String },

    /// An external tool could not be started.
    #[error("failed to start {program}")]
    External {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists(name.into())
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    /// Renders the error and its source chain as one line for the shell output.
    pub fn to_user_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
