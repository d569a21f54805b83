use crate::core::FrameIndex;

/// Convenience result type used across emberfx.
pub type EmberResult<T> = Result<T, EmberError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// A failed validation run is deliberately *not* represented here: callers
/// branch on [`crate::validate::ValidationVerdict::pass`] instead. Errors are
/// reserved for invalid input, broken invariants and collaborator failures.
#[derive(thiserror::Error, Debug)]
pub enum EmberError {
    /// An effect specification violates one of its invariants.
    ///
    /// The whole batch compile fails on the first invalid spec; specs are
    /// never silently dropped or clamped.
    #[error("invalid effect spec '{spec_id}': {reason}")]
    Spec {
        /// Id of the offending spec.
        spec_id: String,
        /// The violated invariant.
        reason: String,
    },

    /// The simultaneous-instance budget was exceeded at `frame`.
    #[error("instance budget exceeded at frame {}: {count} active instances", frame.0)]
    Budget {
        /// First frame at which the budget is exceeded.
        frame: FrameIndex,
        /// Number of active instances at that frame.
        count: usize,
    },

    /// A host-engine render failure for a single frame.
    ///
    /// Recovered locally by the render job runner: the frame is recorded as
    /// failed and sampling continues.
    #[error("render error: {0}")]
    Render(String),

    /// Invalid configuration, input document or schema violation.
    #[error("config error: {0}")]
    Config(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EmberError {
    /// Build an [`EmberError::Spec`] value.
    pub fn spec(spec_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Spec {
            spec_id: spec_id.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`EmberError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build an [`EmberError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build an [`EmberError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
