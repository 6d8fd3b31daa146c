//! # Tracer
//!
//! The `Tracer` is the span lifecycle state machine. It owns the sampling
//! policy, the id generator and the reporter sinks, and it is the only
//! component that manipulates the flow-local current-span stack: every
//! create or continue pushes exactly one frame, every close or detach pops
//! exactly one.
//!
//! Callers must pair each acquisition with a `close` or `detach` on every
//! exit path, success or failure. [`Tracer::in_span`] packages that
//! discipline; code that panics inside it still gets its span closed,
//! tagged with the failure and reported, and the panic continues to the
//! caller unchanged.
use crate::export::{SpanData, SpanReporter};
use crate::trace::context;
use crate::trace::id_generator::{IdGenerator, RandomIdGenerator};
use crate::trace::sampler::{Sampler, ShouldSample};
use crate::trace::span::{Span, ERROR_TAG};
use crate::trace::{SpanContext, TraceFlags};
use std::any::Any;
use std::collections::HashMap;
use std::panic;
use std::sync::Arc;
use tracing::warn;

/// `Tracer` implementation to create and manage spans.
///
/// Cheap to clone; clones share the same configuration and reporters.
#[derive(Clone, Debug)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

#[derive(Debug)]
struct TracerInner {
    sampler: Box<dyn ShouldSample>,
    id_generator: Box<dyn IdGenerator>,
    reporters: Vec<Box<dyn SpanReporter>>,
}

impl Tracer {
    /// Create a builder with the default configuration: always-on sampling,
    /// random ids and no reporters.
    pub fn builder() -> TracerBuilder {
        TracerBuilder::default()
    }

    /// Create a new span and push it as this flow's current span.
    ///
    /// The current span, if any, becomes the parent; otherwise a root span
    /// with a fresh trace id is started and the configured sampling policy
    /// decides whether the new trace is exportable.
    pub fn create_span(&self, name: &str) -> Span {
        let parent = context::current_span();
        self.create_span_with_parent(name, parent.as_ref())
    }

    /// Create a new span beneath an explicit parent and push it as current.
    ///
    /// A child inherits its parent's trace id, sampling decision and
    /// baggage unconditionally; the policy is never re-evaluated for it.
    pub fn create_span_with_parent(&self, name: &str, parent: Option<&Span>) -> Span {
        let span = match parent {
            Some(parent) => self.build_child(name, parent),
            None => self.build_root(name),
        };
        context::push_span(span.clone());
        span
    }

    /// Continue a trace reconstructed from an inbound carrier.
    ///
    /// With a remote parent this creates exactly one child span to stand
    /// for this process's handling: same trace id, parent id set to the
    /// extracted span id, fresh span id. The caller's span id is never
    /// reused, so ids cannot collide across processes. Without extracted
    /// context this starts a fresh root. Either way the new span is pushed
    /// as current.
    pub fn continue_span(&self, name: &str, extracted: Option<Span>) -> Span {
        self.create_span_with_parent(name, extracted.as_ref())
    }

    /// Close the current span: stamp its end time, restore the prior
    /// frame and hand the finished span to every reporter if the trace is
    /// exportable.
    ///
    /// Closing a span that is not current is an ordering defect in the
    /// caller; it is logged and the operation is a no-op, leaving the
    /// stack untouched. Reporter failures are logged and swallowed.
    pub fn close(&self, span: Span) {
        if !context::pop_if_current(&span) {
            let err = crate::trace::TraceError::NotCurrentSpan(span.span_id());
            warn!(%err, "close ignored");
            return;
        }
        let Some(data) = span.finish() else {
            return;
        };
        if span.is_exportable() {
            self.report(data);
        }
    }

    /// Remove the current span from this flow without closing or reporting
    /// it.
    ///
    /// Used when a span's lifetime is bound to something outside this flow
    /// (a retry, an async continuation): the span value is carried across
    /// and later re-established via [`Tracer::attach`] by the flow that
    /// will close it. Detaching a non-current span is logged and ignored.
    pub fn detach(&self, span: Span) {
        if !context::pop_if_current(&span) {
            let err = crate::trace::TraceError::NotCurrentSpan(span.span_id());
            warn!(%err, "detach ignored");
        }
    }

    /// Re-establish an existing span as this flow's current span.
    ///
    /// The inverse of [`Tracer::detach`]: nothing is created and nothing is
    /// reported, the span is only pushed as the current frame.
    pub fn attach(&self, span: &Span) {
        context::push_span(span.clone());
    }

    /// Run `f` inside a new span, closing it on every exit path.
    ///
    /// If `f` panics the panic message is attached to the span as the
    /// `error` tag, the span is closed and reported as usual, and the
    /// panic resumes unchanged.
    pub fn in_span<T, F>(&self, name: &str, f: F) -> T
    where
        F: FnOnce(&Span) -> T,
    {
        let span = self.create_span(name);
        match panic::catch_unwind(panic::AssertUnwindSafe(|| f(&span))) {
            Ok(value) => {
                self.close(span);
                value
            }
            Err(payload) => {
                span.set_tag(ERROR_TAG, panic_message(payload.as_ref()));
                self.close(span);
                panic::resume_unwind(payload);
            }
        }
    }

    fn build_root(&self, name: &str) -> Span {
        let trace_id = self.inner.id_generator.new_trace_id();
        let span_id = self.inner.id_generator.new_span_id();
        let sampled = self.inner.sampler.should_sample(trace_id, name);
        let span_context = SpanContext::new(
            trace_id,
            span_id,
            TraceFlags::default().with_sampled(sampled),
            false,
        );
        Span::new(span_context, Vec::new(), HashMap::new(), name)
    }

    fn build_child(&self, name: &str, parent: &Span) -> Span {
        let parent_context = parent.span_context();
        let span_context = SpanContext::new(
            parent_context.trace_id(),
            self.inner.id_generator.new_span_id(),
            parent_context.trace_flags(),
            false,
        );
        Span::new(
            span_context,
            vec![parent_context.span_id()],
            parent.baggage(),
            name,
        )
    }

    /// Broadcast a finished span to every reporter, isolating failures so
    /// one sink cannot block delivery to the others.
    fn report(&self, data: SpanData) {
        for reporter in &self.inner.reporters {
            if let Err(err) = reporter.report(data.clone()) {
                warn!(%err, "span reporter failed; span dropped by this sink");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Builder for [`Tracer`].
#[derive(Debug)]
pub struct TracerBuilder {
    sampler: Box<dyn ShouldSample>,
    id_generator: Box<dyn IdGenerator>,
    reporters: Vec<Box<dyn SpanReporter>>,
}

impl Default for TracerBuilder {
    fn default() -> Self {
        TracerBuilder {
            sampler: Box::new(Sampler::AlwaysOn),
            id_generator: Box::new(RandomIdGenerator::default()),
            reporters: Vec::new(),
        }
    }
}

impl TracerBuilder {
    /// The sampling policy applied to new root traces.
    pub fn with_sampler<S: ShouldSample + 'static>(mut self, sampler: S) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    /// The id generator for new trace and span ids.
    pub fn with_id_generator<G: IdGenerator + 'static>(mut self, id_generator: G) -> Self {
        self.id_generator = Box::new(id_generator);
        self
    }

    /// Add a reporter sink. Finished exportable spans are broadcast to
    /// every configured reporter.
    pub fn with_reporter<R: SpanReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    /// Build the configured [`Tracer`].
    pub fn build(self) -> Tracer {
        Tracer {
            inner: Arc::new(TracerInner {
                sampler: self.sampler,
                id_generator: self.id_generator,
                reporters: self.reporters,
            }),
        }
    }
}
