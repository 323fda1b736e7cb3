use thiserror::Error;

/// Errors surfaced by the store and its repositories.
///
/// Read failures never show up here: a collection that cannot be read or
/// decoded is treated as empty. Write failures always do.
#[derive(Debug, Error)]
pub enum Error {
    #[error("changes not saved to {collection}: {reason}")]
    Storage { collection: String, reason: String },

    #[error("failed to encode {collection}: {source}")]
    Serialize {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: &str) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// True when the failure means data was not persisted.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Error::Storage { .. } | Error::Serialize { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
