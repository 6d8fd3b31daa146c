//! # Span
//!
//! A `Span` is a single timed unit of work within a trace. Spans nest to
//! form a trace tree: a root span describes the end-to-end handling of a
//! request and child spans its sub-operations.
//!
//! A `Span` is a cheap-clone shared handle; clones observe the same tags,
//! logs and baggage. The identity (trace id, span id, flags) is immutable
//! and stays readable after the span has been closed, while the recorded
//! state is taken out exactly once when the
//! [`Tracer`](crate::trace::Tracer) closes the span.
use crate::export::SpanData;
use crate::trace::{now_micros, SpanContext, SpanId, TraceId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Maximum length of a span name; longer names are silently shortened at
/// creation, never rejected.
pub const MAX_NAME_LENGTH: usize = 50;

/// Tag key used to record a failure observed while the span was current.
pub const ERROR_TAG: &str = "error";

/// A timestamped event recorded during a span's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// Microseconds since the unix epoch.
    pub timestamp: u64,
    /// The name of the event.
    pub event: String,
}

/// Mutable state of an open span. Taken out when the span is closed.
#[derive(Clone, Debug)]
pub(crate) struct SpanState {
    pub(crate) parent_ids: Vec<SpanId>,
    pub(crate) name: String,
    pub(crate) begin: u64,
    pub(crate) tags: HashMap<String, String>,
    pub(crate) logs: Vec<Log>,
    pub(crate) baggage: HashMap<String, String>,
}

/// Single operation within a trace.
#[derive(Clone, Debug)]
pub struct Span {
    span_context: SpanContext,
    state: Arc<Mutex<Option<SpanState>>>,
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.span_context == other.span_context
    }
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        parent_ids: Vec<SpanId>,
        baggage: HashMap<String, String>,
        name: &str,
    ) -> Self {
        Span {
            span_context,
            state: Arc::new(Mutex::new(Some(SpanState {
                parent_ids,
                name: truncate_name(name),
                begin: now_micros(),
                tags: HashMap::new(),
                logs: Vec::new(),
                baggage,
            }))),
        }
    }

    /// Reconstruct a parent span from extracted carrier headers.
    ///
    /// Remote spans carry identity and baggage only; they are placeholders
    /// for the caller's span and are never closed or reported here.
    pub(crate) fn from_remote(
        span_context: SpanContext,
        parent_ids: Vec<SpanId>,
        baggage: HashMap<String, String>,
    ) -> Self {
        Span::new(span_context, parent_ids, baggage, "")
    }

    /// The immutable identity of this span.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// The trace this span belongs to.
    pub fn trace_id(&self) -> TraceId {
        self.span_context.trace_id()
    }

    /// This span's identifier.
    pub fn span_id(&self) -> SpanId {
        self.span_context.span_id()
    }

    /// Ancestor span ids; empty for a root span.
    pub fn parent_ids(&self) -> Vec<SpanId> {
        self.with_state(|state| state.parent_ids.clone())
            .unwrap_or_default()
    }

    /// The operation name, or `None` once the span has been closed.
    pub fn name(&self) -> Option<String> {
        self.with_state(|state| state.name.clone())
    }

    /// Returns `true` while the span is open and still records mutations.
    pub fn is_recording(&self) -> bool {
        self.state
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Whether this span is delivered to reporters on close.
    pub fn is_exportable(&self) -> bool {
        self.span_context.is_exportable()
    }

    /// Set a tag on this span. Keys are unique; the last write wins.
    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.with_state(|state| {
            state.tags.insert(key, value);
        });
    }

    /// Append a timestamped log event.
    pub fn log(&self, event: impl Into<String>) {
        let event = event.into();
        self.with_state(|state| {
            state.logs.push(Log {
                timestamp: now_micros(),
                event,
            });
        });
    }

    /// Set a baggage item. Keys are case-insensitive and the item is
    /// propagated unchanged to every descendant span.
    pub fn set_baggage_item(&self, key: &str, value: impl Into<String>) {
        let key = key.to_ascii_lowercase();
        let value = value.into();
        self.with_state(|state| {
            state.baggage.insert(key, value);
        });
    }

    /// Look up a baggage item regardless of the case used to read it.
    pub fn baggage_item(&self, key: &str) -> Option<String> {
        let key = key.to_ascii_lowercase();
        self.with_state(|state| state.baggage.get(&key).cloned())
            .flatten()
    }

    /// A copy of all baggage items carried by this span.
    pub fn baggage(&self) -> HashMap<String, String> {
        self.with_state(|state| state.baggage.clone())
            .unwrap_or_default()
    }

    /// Operate on the mutable state, if the span is still open.
    fn with_state<T, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&mut SpanState) -> T,
    {
        self.state
            .lock()
            .ok()
            .and_then(|mut guard| guard.as_mut().map(f))
    }

    /// Take the recorded state out, stamping the end timestamp.
    ///
    /// Returns `None` if the span was already finished; the state is handed
    /// out at most once, so a span can never reach a reporter twice or with
    /// an unset end time.
    pub(crate) fn finish(&self) -> Option<SpanData> {
        let state = self.state.lock().ok().and_then(|mut guard| guard.take())?;
        Some(SpanData {
            span_context: self.span_context,
            parent_ids: state.parent_ids,
            name: state.name,
            begin: state.begin,
            end: now_micros(),
            tags: state.tags,
            logs: state.logs,
            baggage: state.baggage,
        })
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > MAX_NAME_LENGTH {
        name.chars().take(MAX_NAME_LENGTH).collect()
    } else {
        name.to_owned()
    }
}
