//! Error types for the story backend client.
//!
//! # Design
//! Every failure an operation can produce collapses into one `StoryError`
//! value. The message-carrying variants display as the bare message so the
//! text a caller sees is exactly what the backend or the underlying layer
//! reported. `kind()` groups variants into the four classes callers branch
//! on: precondition, transport, decode and domain.

use thiserror::Error;

/// Errors delivered as the failure side of an [`Outcome`](crate::Outcome).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoryError {
    /// An authenticated operation was attempted without a session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The media file handed to an upload does not exist locally.
    #[error("File not found")]
    FileNotFound,

    /// Connection, timeout or IO failure while talking to the backend.
    #[error("{0}")]
    Transport(String),

    /// The body was not valid JSON or lacked a field required on the success path.
    #[error("{0}")]
    Decode(String),

    /// The backend answered `success: false`.
    #[error("{0}")]
    Domain(String),

    /// The durable token store rejected a read or write.
    #[error("secure storage failed: {0}")]
    Storage(String),

    /// A request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A caller-supplied argument cannot be put on the wire.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Client configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Coarse classification of a [`StoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    Transport,
    Decode,
    Domain,
    Local,
}

impl StoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoryError::NotAuthenticated | StoryError::FileNotFound => ErrorKind::Precondition,
            StoryError::Transport(_) => ErrorKind::Transport,
            StoryError::Decode(_) => ErrorKind::Decode,
            StoryError::Domain(_) => ErrorKind::Domain,
            StoryError::Storage(_)
            | StoryError::Serialization(_)
            | StoryError::InvalidArgument(_)
            | StoryError::Config(_) => ErrorKind::Local,
        }
    }
}

impl From<serde_json::Error> for StoryError {
    fn from(e: serde_json::Error) -> Self {
        StoryError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_variants_display_bare_message() {
        assert_eq!(StoryError::Domain("not owner".into()).to_string(), "not owner");
        assert_eq!(
            StoryError::Transport("connection refused".into()).to_string(),
            "connection refused"
        );
        assert_eq!(StoryError::NotAuthenticated.to_string(), "Not authenticated");
        assert_eq!(StoryError::FileNotFound.to_string(), "File not found");
    }

    #[test]
    fn kind_groups_variants() {
        assert_eq!(StoryError::NotAuthenticated.kind(), ErrorKind::Precondition);
        assert_eq!(StoryError::Decode(String::new()).kind(), ErrorKind::Decode);
        assert_eq!(StoryError::Config(String::new()).kind(), ErrorKind::Local);
    }
}
