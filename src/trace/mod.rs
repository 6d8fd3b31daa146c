//! Span lifecycle management.
//!
//! The `trace` module holds the identifier codec, the sampling policy, the
//! flow-local current-span stack and the [`Tracer`] state machine that ties
//! them together. See the crate docs for an overview of how the pieces fit.

mod context;
mod error;
mod id_generator;
mod sampler;
mod span;
mod span_context;
mod tracer;

pub use context::{current_span, has_current_span};
pub use error::{TraceError, TraceResult};
pub use id_generator::{IdGenerator, IncrementIdGenerator, RandomIdGenerator};
pub use sampler::{Sampler, ShouldSample};
pub use span::{Log, Span, ERROR_TAG, MAX_NAME_LENGTH};
pub use span_context::{SpanContext, SpanId, TraceFlags, TraceId};
pub use tracer::{Tracer, TracerBuilder};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock time in microseconds since the unix epoch.
///
/// Span timestamps use the value `0` to mean "not yet set", so a clock set
/// before 1970 degrades to that sentinel rather than failing.
pub(crate) fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
