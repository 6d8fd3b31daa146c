use crate::trace::SpanId;
use std::sync::PoisonError;
use thiserror::Error;

/// A specialized `Result` type for trace operations.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors raised by the trace lifecycle and codec.
///
/// None of these abort request processing. Malformed identifiers are
/// recovered at the extraction boundary by substituting a fresh id, close
/// ordering defects degrade to a logged no-op, and reporter failures are
/// swallowed by the [`Tracer`](crate::trace::Tracer).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// An identifier crossing a trust boundary was not fixed-width hex.
    #[error("malformed {field} {value:?}")]
    MalformedId {
        /// Logical name of the offending field.
        field: &'static str,
        /// The raw value as received.
        value: String,
    },

    /// `close` or `detach` was called on a span that is not current in this
    /// flow. A programming or ordering defect in the caller.
    #[error("span {0} is not the current span")]
    NotCurrentSpan(SpanId),

    /// A reporter sink rejected a finished span.
    #[error("span reporter failed: {0}")]
    ReporterFailure(String),

    /// Other errors not covered above.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl TraceError {
    pub(crate) fn malformed_id(field: &'static str, value: &str) -> Self {
        TraceError::MalformedId {
            field,
            value: value.to_owned(),
        }
    }
}

impl From<String> for TraceError {
    fn from(err_msg: String) -> Self {
        TraceError::Other(err_msg.into())
    }
}

impl From<&'static str> for TraceError {
    fn from(err_msg: &'static str) -> Self {
        TraceError::Other(err_msg.into())
    }
}

impl<T> From<PoisonError<T>> for TraceError {
    fn from(err: PoisonError<T>) -> Self {
        TraceError::Other(err.to_string().into())
    }
}
