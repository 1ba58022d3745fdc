//! Typed errors shared by every gokp component.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by the command runner to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad integer, missing flag, empty password.
    UserInputInvalid,
    /// Wrong credentials or an unusable keystore.
    AuthFailure,
    /// Something the user asked for does not exist.
    NotFound,
    /// The request would break a meta-vault invariant.
    IntegrityViolation,
    /// File read/write/create errors.
    IoFailure,
    /// The OS clipboard refused a read or write.
    ClipboardFailure,
}

impl ErrorKind {
    /// Whether the process should exit with a failure status.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::UserInputInvalid | ErrorKind::AuthFailure | ErrorKind::IoFailure
        )
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("database file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("key file not found: {}", .0.display())]
    KeyFileNotFound(PathBuf),

    #[error("unable to open database {}: {reason}. The password is likely incorrect", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("failed to save database {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no gokp database found at {}. Run `gokp setup init` first", .0.display())]
    MetaVaultMissing(PathBuf),

    #[error("group '{0}' not found")]
    GroupMissing(String),

    #[error("database entry by the name '{0}' already exists")]
    DuplicateDatabase(String),

    #[error("entry '{0}' already exists in favorites")]
    AlreadyFavorited(String),

    #[error("favorite '{title}' has a non-numeric index '{value}'")]
    CorruptIndex { title: String, value: String },

    #[error("entry '{0}' has no password set, cannot add to favorites")]
    MissingPassword(String),

    #[error("no secret stored for {service}/{user}")]
    SecretNotFound { service: String, user: String },

    #[error("keystore error: {0}")]
    Keystore(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("failed to copy to clipboard: {0}")]
    ClipboardWriteFailed(String),

    #[error("invalid config file {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("could not determine the home directory")]
    HomeDirUnavailable,
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::UserInputInvalid,
            Error::Decode { .. } | Error::Keystore(_) => ErrorKind::AuthFailure,
            Error::MetaVaultMissing(_)
            | Error::SecretNotFound { .. } => ErrorKind::NotFound,
            Error::GroupMissing(_)
            | Error::DuplicateDatabase(_)
            | Error::AlreadyFavorited(_)
            | Error::CorruptIndex { .. }
            | Error::MissingPassword(_) => ErrorKind::IntegrityViolation,
            Error::Clipboard(_) | Error::ClipboardWriteFailed(_) => ErrorKind::ClipboardFailure,
            Error::FileNotFound(_)
            | Error::KeyFileNotFound(_)
            | Error::Save { .. }
            | Error::Io { .. }
            | Error::Config { .. }
            | Error::HomeDirUnavailable => ErrorKind::IoFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_fatal_kinds_exit_cleanly() {
        assert!(!Error::DuplicateDatabase("work".into()).kind().is_fatal());
        assert!(!Error::MetaVaultMissing(PathBuf::from("/x")).kind().is_fatal());
        assert!(!Error::ClipboardWriteFailed("no display".into()).kind().is_fatal());
    }

    #[test]
    fn wrong_password_is_fatal() {
        let err = Error::Decode {
            path: PathBuf::from("/tmp/a.kdbx"),
            reason: "HMAC mismatch".into(),
        };
        assert_eq!(err.kind(), ErrorKind::AuthFailure);
        assert!(err.kind().is_fatal());
        assert!(err.to_string().contains("password is likely incorrect"));
    }
}
