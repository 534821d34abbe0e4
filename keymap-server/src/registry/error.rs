//! Registry errors.

use thiserror::Error;

/// Errors surfaced by [`Registry`](super::Registry) operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required identifier was missing or empty.
    #[error("missing required field: {0}")]
    BadRequest(&'static str),

    /// No binding exists for the lookup key.
    #[error("no flow binding with the key")]
    NotFound,

    /// The store is unreachable or rejected a read or write.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Every generated lookup key collided with an existing one.
    #[error("could not allocate a unique lookup key after {0} attempts")]
    KeyExhausted(usize),
}
