use thiserror::Error;

/// Error taxonomy for the sync/cache engine.
///
/// A lock conflict is deliberately NOT an error: an overlapping sync is an
/// expected outcome and surfaces as `SyncOutcome::Skipped` instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Provider credential/token failure (non-2xx from the token endpoint,
    /// or a token response without an `access_token` field).
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// Non-2xx or malformed page/lookup response from an external API.
    #[error("provider request failed: {status} {message}")]
    Provider { status: u16, message: String },

    /// Transport-level failure before any HTTP status was available.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Identifier absent from both the local cache and the fallback registry.
    #[error("vehicle not found in stock or external registry")]
    NotFound,

    /// Cache store read/write failure.
    #[error("store error: {0}")]
    Persistence(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
