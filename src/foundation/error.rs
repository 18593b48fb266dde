/// Convenience result type used across the display core.
pub type DisplayResult<T> = Result<T, DisplayError>;

/// Error taxonomy for the frame composition pipeline.
///
/// Every variant is recovered at the operation boundary: a failing operation is dropped and the
/// frame it belongs to proceeds with its remaining operations.
#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    /// Malformed or unsupported compressed payload.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid target dimensions or codec refusal while configuring a video session.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Command the pipeline does not recognize (wrong kind for a path, stale frame id, short
    /// pixel buffer).
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid options or script data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DisplayError {
    /// Build a [`DisplayError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`DisplayError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`DisplayError::ProtocolViolation`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// Build a [`DisplayError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
