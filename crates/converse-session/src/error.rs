use converse_core::{ApiError, CodecError};
use thiserror::Error;

/// Everything that can end one voice exchange early. Each variant maps to
/// one user-visible message and a reset to idle.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
