//! Unified error type.

use crate::stage::Stage;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by strata's fallible operations.
///
/// Application-level failures (404, 422, etc.) are expressed as
/// [`Response`](crate::Response) values produced by the core or a ware. This
/// type surfaces pipeline misconfiguration and ware failures. None of these
/// are caught inside the dispatcher: an error aborts the in-flight request and
/// the caller decides whether it becomes a `500` or propagates further.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The ware implements none of the five capabilities, or more than one.
    #[error("unrecognized ware kind: {0}")]
    UnrecognizedWareKind(&'static str),

    /// A frontware returned a result the pipeline cannot apply.
    #[error("unrecognized ware result: {0}")]
    UnrecognizedWareResult(&'static str),

    /// Pipeline state was read before it was ever set.
    #[error("undefined state access: `{0}` was never set")]
    UndefinedStateAccess(&'static str),

    /// A middleware called `Next::run` after the pipeline left the middle stage.
    #[error("next handler re-entered at stage {stage}")]
    InvalidReentry { stage: Stage },

    /// A ware failed on its own terms.
    #[error("ware failed: {0}")]
    Ware(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Binding the listener failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an arbitrary ware failure.
    pub fn ware(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Ware(err.into())
    }
}
