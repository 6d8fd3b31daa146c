//! Span reporting sinks.
//!
//! A [`SpanReporter`] receives finished spans from the
//! [`Tracer`](crate::trace::Tracer). Delivery is fire-and-forget: `report`
//! must return promptly and may hand the span to an asynchronous or batched
//! backend, but it is never on the critical path of request latency. A
//! reporter failure is logged and swallowed by the tracer; it never reaches
//! the traced caller and never blocks delivery to other reporters.

use crate::trace::{Log, SpanContext, SpanId, TraceError, TraceResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Describe the result of reporting a span.
pub type ExportResult = TraceResult<()>;

/// An immutable finished span, as delivered to reporters.
///
/// Built exactly once per span, when the tracer closes it; `end` is always
/// stamped before a `SpanData` exists, so no reporter can observe an open
/// span.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Identity: trace id, span id and flags.
    pub span_context: SpanContext,
    /// Ancestor span ids; empty for a root span.
    pub parent_ids: Vec<SpanId>,
    /// Operation name, truncated at creation.
    pub name: String,
    /// Start time, microseconds since the unix epoch.
    pub begin: u64,
    /// End time, microseconds since the unix epoch; never zero.
    pub end: u64,
    /// Recorded tags.
    pub tags: HashMap<String, String>,
    /// Recorded log events, in append order.
    pub logs: Vec<Log>,
    /// Baggage carried by the span.
    pub baggage: HashMap<String, String>,
}

/// Sink interface that receives finished spans.
pub trait SpanReporter: Send + Sync + fmt::Debug {
    /// Accept a finished span. Implementations should return quickly and
    /// push slow work to a background channel.
    fn report(&self, span: SpanData) -> ExportResult;
}

/// An in-memory span reporter that stores finished spans in a vector.
///
/// Useful for testing and debugging. Spans are kept in the order they were
/// reported and can be retrieved with
/// [`finished_spans`](InMemorySpanReporter::finished_spans).
#[derive(Clone, Debug)]
pub struct InMemorySpanReporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl Default for InMemorySpanReporter {
    fn default() -> Self {
        InMemorySpanReporterBuilder::new().build()
    }
}

/// Builder for [`InMemorySpanReporter`].
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanReporterBuilder {}

impl InMemorySpanReporterBuilder {
    /// Creates a new instance of the builder.
    pub fn new() -> Self {
        Self {}
    }

    /// Creates a new instance of the [`InMemorySpanReporter`].
    pub fn build(&self) -> InMemorySpanReporter {
        InMemorySpanReporter {
            spans: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl InMemorySpanReporter {
    /// Returns the accumulated finished spans, in reporting order.
    ///
    /// # Errors
    ///
    /// Returns a `TraceError` if the internal lock cannot be acquired.
    pub fn finished_spans(&self) -> TraceResult<Vec<SpanData>> {
        self.spans
            .lock()
            .map(|guard| guard.clone())
            .map_err(TraceError::from)
    }

    /// Clears the internal storage of finished spans.
    pub fn reset(&self) {
        let _ = self.spans.lock().map(|mut guard| guard.clear());
    }
}

impl SpanReporter for InMemorySpanReporter {
    fn report(&self, span: SpanData) -> ExportResult {
        self.spans
            .lock()
            .map(|mut guard| guard.push(span))
            .map_err(TraceError::from)
    }
}
