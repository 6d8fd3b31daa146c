//! Distributed trace context propagation and span lifecycle management.
//!
//! This crate tracks the progression of a single request as it crosses
//! process and thread boundaries. A trace is a tree of [`Span`]s sharing a
//! trace id; each span is one timed unit of work carrying tags, timestamped
//! log events and propagated baggage. The crate covers three concerns:
//!
//! * **Wire codec**: encoding and decoding B3-style trace headers via the
//!   narrow [`Extractor`]/[`Injector`] carrier traits, so the same logic
//!   serves HTTP headers, messaging headers and RPC metadata alike.
//! * **Span lifecycle**: the [`Tracer`] state machine with create, continue,
//!   close and detach operations over a flow-local current-span stack.
//! * **Reporting**: handing finished spans to pluggable [`SpanReporter`]
//!   sinks, with each sink isolated from the caller and from its peers.
//!
//! Malformed or partial headers from untrusted peers never fail a request:
//! extraction degrades to starting a fresh trace and records the problem
//! through [`tracing`] diagnostics.
//!
//! # Getting started
//!
//! ```
//! use traceflow::export::InMemorySpanReporter;
//! use traceflow::trace::{Sampler, Tracer};
//!
//! let reporter = InMemorySpanReporter::default();
//! let tracer = Tracer::builder()
//!     .with_sampler(Sampler::AlwaysOn)
//!     .with_reporter(reporter.clone())
//!     .build();
//!
//! let span = tracer.create_span("handle request");
//! span.set_tag("http.method", "GET");
//! tracer.close(span);
//!
//! assert_eq!(reporter.finished_spans().unwrap().len(), 1);
//! ```
//!
//! [`Span`]: crate::trace::Span
//! [`Tracer`]: crate::trace::Tracer
//! [`Extractor`]: crate::propagation::Extractor
//! [`Injector`]: crate::propagation::Injector
//! [`SpanReporter`]: crate::export::SpanReporter

pub mod export;
pub mod propagation;
pub mod trace;
