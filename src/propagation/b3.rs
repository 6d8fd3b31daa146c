//! # B3 propagator
//!
//! Encodes and decodes span identity using B3 multiple headers:
//!
//! ```text
//! X-B3-TraceId: {trace_id}
//! X-B3-SpanId: {span_id}
//! X-B3-ParentSpanId: {parent_span_id}
//! X-B3-Sampled: {sampling_state}
//! X-B3-Flags: {debug_flag}
//! baggage_{key}: {value}
//! ```
//!
//! Reads are case-insensitive, so the same constants serve HTTP
//! (`X-B3-$Name`) and messaging or gRPC carriers (`x-b3-$name`); lower case
//! is used on the wire here since the transport cannot be told apart.
//!
//! Extraction never fails. Garbage in a trusted-boundary-crossing header
//! degrades to a fresh id (and ultimately a new root trace), never to a
//! processing failure.
use crate::propagation::{Extractor, Injector};
use crate::trace::{
    IdGenerator, RandomIdGenerator, Span, SpanContext, SpanId, TraceFlags, TraceId,
};
use std::collections::HashMap;
use tracing::warn;

/// Trace identifier header, 16 or 32 hex characters.
pub const TRACE_ID_HEADER: &str = "x-b3-traceid";
/// Span identifier header, 16 hex characters.
pub const SPAN_ID_HEADER: &str = "x-b3-spanid";
/// Parent span identifier header, 16 hex characters.
pub const PARENT_SPAN_ID_HEADER: &str = "x-b3-parentspanid";
/// Sampled flag header, `"1"` sampled, `"0"` not sampled.
pub const SAMPLED_HEADER: &str = "x-b3-sampled";
/// Debug override header; exactly `"1"` forces sampling.
pub const DEBUG_FLAG_HEADER: &str = "x-b3-flags";
/// Case-insensitive prefix marking a header as a baggage item.
pub const BAGGAGE_PREFIX: &str = "baggage_";

const B3_FIELDS: [&str; 5] = [
    TRACE_ID_HEADER,
    SPAN_ID_HEADER,
    PARENT_SPAN_ID_HEADER,
    SAMPLED_HEADER,
    DEBUG_FLAG_HEADER,
];

/// Extracts and injects span identity using B3 headers.
///
/// The id generator supplies replacements for malformed inbound ids; it is
/// injectable so tests can make recovery deterministic.
#[derive(Debug)]
pub struct B3Propagator {
    id_generator: Box<dyn IdGenerator>,
}

impl Default for B3Propagator {
    fn default() -> Self {
        B3Propagator {
            id_generator: Box::new(RandomIdGenerator::default()),
        }
    }
}

impl B3Propagator {
    /// Create a propagator with the default random id generator.
    pub fn new() -> Self {
        B3Propagator::default()
    }

    /// Create a propagator with a custom id generator.
    pub fn with_id_generator<G: IdGenerator + 'static>(id_generator: G) -> Self {
        B3Propagator {
            id_generator: Box::new(id_generator),
        }
    }

    /// The non-baggage header names this propagator reads and writes.
    ///
    /// Messaging adapters use this to clear stale trace headers before
    /// injecting.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> {
        B3_FIELDS.iter().copied()
    }

    /// Reconstruct the caller's span from an inbound carrier.
    ///
    /// Returns `None` when neither a trace id nor a span id header is
    /// present: the caller sent no context and a fresh root trace should be
    /// started. Otherwise a remote parent span is always produced:
    /// a malformed trace or span id is replaced with a freshly generated
    /// one (recorded for diagnostics), and a malformed parent id silently
    /// degrades to "no parent". Tags and logs are never populated here.
    pub fn extract(&self, extractor: &dyn Extractor) -> Option<Span> {
        let trace_header = extractor.get(TRACE_ID_HEADER);
        let span_header = extractor.get(SPAN_ID_HEADER);
        if trace_header.is_none() && span_header.is_none() {
            return None;
        }

        let trace_id = match trace_header.map(TraceId::from_hex) {
            Some(Ok(trace_id)) => trace_id,
            Some(Err(err)) => {
                warn!(%err, "recovered by generating a fresh trace id");
                self.id_generator.new_trace_id()
            }
            None => self.id_generator.new_trace_id(),
        };
        let span_id = match span_header.map(SpanId::from_hex) {
            Some(Ok(span_id)) => span_id,
            Some(Err(err)) => {
                warn!(%err, "recovered by generating a fresh span id");
                self.id_generator.new_span_id()
            }
            None => self.id_generator.new_span_id(),
        };
        let parent_ids = extractor
            .get(PARENT_SPAN_ID_HEADER)
            .and_then(|value| SpanId::from_hex(value).ok())
            .into_iter()
            .collect();

        // Exactly "1" forces sampling; every other flags value is ignored
        // and the sampled header stands. Downstream systems rely on this
        // leniency, so "0" and "absent" are deliberately not told apart.
        let debug = extractor.get(DEBUG_FLAG_HEADER) == Some("1");
        let sampled = debug || extractor.get(SAMPLED_HEADER) == Some("1");
        let trace_flags = TraceFlags::default()
            .with_sampled(sampled)
            .with_debug(debug);

        let span_context = SpanContext::new(trace_id, span_id, trace_flags, true);
        Some(Span::from_remote(
            span_context,
            parent_ids,
            extract_baggage(extractor),
        ))
    }

    /// Write a span's identity and baggage into an outbound carrier.
    pub fn inject(&self, span: &Span, injector: &mut dyn Injector) {
        let span_context = span.span_context();
        injector.set(TRACE_ID_HEADER, span_context.trace_id().to_string());
        injector.set(SPAN_ID_HEADER, span_context.span_id().to_string());
        if let Some(parent_id) = span.parent_ids().first() {
            injector.set(PARENT_SPAN_ID_HEADER, parent_id.to_string());
        }
        if span_context.is_debug() {
            injector.set(DEBUG_FLAG_HEADER, "1".to_owned());
        } else {
            let sampled = if span_context.is_sampled() { "1" } else { "0" };
            injector.set(SAMPLED_HEADER, sampled.to_owned());
        }
        for (key, value) in span.baggage() {
            injector.set(&format!("{BAGGAGE_PREFIX}{key}"), value);
        }
    }
}

/// Scan all carrier names for the baggage prefix, strip it
/// case-insensitively and key the item by the lower-cased remainder.
fn extract_baggage(extractor: &dyn Extractor) -> HashMap<String, String> {
    let mut baggage = HashMap::new();
    for name in extractor.keys() {
        let (Some(prefix), Some(key)) = (
            name.get(..BAGGAGE_PREFIX.len()),
            name.get(BAGGAGE_PREFIX.len()..),
        ) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(BAGGAGE_PREFIX) || key.is_empty() {
            continue;
        }
        if let Some(value) = extractor.get(name) {
            baggage.insert(key.to_ascii_lowercase(), value.to_owned());
        }
    }
    baggage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::IncrementIdGenerator;

    const TRACE_ID_STR: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
    const SPAN_ID_STR: &str = "00f067aa0ba902b7";
    const TRACE_ID_LOW: u64 = 0xa3ce_929d_0e0e_4736;
    const SPAN_ID_HEX: u64 = 0x00f0_67aa_0ba9_02b7;

    fn carrier(
        trace: Option<&str>,
        span: Option<&str>,
        sampled: Option<&str>,
        flags: Option<&str>,
        parent: Option<&str>,
    ) -> HashMap<String, String> {
        let mut carrier = HashMap::new();
        if let Some(trace_id) = trace {
            carrier.insert(TRACE_ID_HEADER.to_owned(), trace_id.to_owned());
        }
        if let Some(span_id) = span {
            carrier.insert(SPAN_ID_HEADER.to_owned(), span_id.to_owned());
        }
        if let Some(sampled) = sampled {
            carrier.insert(SAMPLED_HEADER.to_owned(), sampled.to_owned());
        }
        if let Some(flags) = flags {
            carrier.insert(DEBUG_FLAG_HEADER.to_owned(), flags.to_owned());
        }
        if let Some(parent) = parent {
            carrier.insert(PARENT_SPAN_ID_HEADER.to_owned(), parent.to_owned());
        }
        carrier
    }

    #[rustfmt::skip]
    #[allow(clippy::type_complexity)]
    fn extract_data() -> Vec<((Option<&'static str>, Option<&'static str>, Option<&'static str>, Option<&'static str>, Option<&'static str>), (u64, u64, bool, bool, Vec<u64>))> {
        // (trace, span, sampled, flags, parent) -> (trace_id, span_id, sampled, debug, parents)
        vec![
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), None, None, None), (TRACE_ID_LOW, SPAN_ID_HEX, false, false, vec![])),
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("1"), None, None), (TRACE_ID_LOW, SPAN_ID_HEX, true, false, vec![])),
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("0"), None, None), (TRACE_ID_LOW, SPAN_ID_HEX, false, false, vec![])),
            ((Some(&TRACE_ID_STR[16..]), Some(SPAN_ID_STR), Some("1"), None, None), (TRACE_ID_LOW, SPAN_ID_HEX, true, false, vec![])), // 64-bit trace id
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), None, Some("1"), None), (TRACE_ID_LOW, SPAN_ID_HEX, true, true, vec![])), // debug implies sampled
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("0"), Some("1"), None), (TRACE_ID_LOW, SPAN_ID_HEX, true, true, vec![])), // debug overrides sampled
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("1"), Some("2"), None), (TRACE_ID_LOW, SPAN_ID_HEX, true, false, vec![])), // other flags ignored
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("1"), Some("0"), None), (TRACE_ID_LOW, SPAN_ID_HEX, true, false, vec![])), // "0" same as absent
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("true"), None, None), (TRACE_ID_LOW, SPAN_ID_HEX, false, false, vec![])), // only exactly "1" samples
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("1"), None, Some("00000000000000cd")), (TRACE_ID_LOW, SPAN_ID_HEX, true, false, vec![0xcd])),
            ((Some(TRACE_ID_STR), Some(SPAN_ID_STR), Some("1"), None, Some("-")), (TRACE_ID_LOW, SPAN_ID_HEX, true, false, vec![])), // malformed parent is silently absent
        ]
    }

    #[test]
    fn extract_b3() {
        let propagator = B3Propagator::new();
        for ((trace, span, sampled, flags, parent), expected) in extract_data() {
            let extracted = propagator
                .extract(&carrier(trace, span, sampled, flags, parent))
                .unwrap();
            let (trace_id, span_id, is_sampled, is_debug, parents) = expected;
            let context = extracted.span_context();
            assert_eq!(context.trace_id(), TraceId::from_u64(trace_id));
            assert_eq!(context.span_id(), SpanId::from_u64(span_id));
            assert_eq!(context.is_sampled(), is_sampled);
            assert_eq!(context.is_debug(), is_debug);
            assert!(context.is_remote());
            assert_eq!(
                extracted.parent_ids(),
                parents.into_iter().map(SpanId::from_u64).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn absent_context_extracts_to_none() {
        let propagator = B3Propagator::new();
        assert!(propagator.extract(&HashMap::new()).is_none());

        // An unrelated header alone is still "no context".
        let mut unrelated = HashMap::new();
        unrelated.insert("content-type".to_owned(), "text/plain".to_owned());
        assert!(propagator.extract(&unrelated).is_none());

        // A sampled header alone carries no identity.
        assert!(propagator
            .extract(&carrier(None, None, Some("1"), None, None))
            .is_none());
    }

    #[test]
    fn malformed_trace_id_gets_a_fresh_one() {
        let propagator = B3Propagator::with_id_generator(IncrementIdGenerator::new());
        let extracted = propagator
            .extract(&carrier(Some("garbage"), Some(SPAN_ID_STR), Some("1"), None, None))
            .unwrap();
        assert_eq!(extracted.trace_id(), TraceId::from_u64(1));
        assert_eq!(extracted.span_id(), SpanId::from_u64(SPAN_ID_HEX));
        assert!(extracted.span_context().is_sampled());
    }

    #[test]
    fn malformed_span_id_gets_a_fresh_one() {
        let propagator = B3Propagator::with_id_generator(IncrementIdGenerator::new());
        let extracted = propagator
            .extract(&carrier(Some(TRACE_ID_STR), Some("xyz"), None, None, None))
            .unwrap();
        assert_eq!(extracted.trace_id(), TraceId::from_u64(TRACE_ID_LOW));
        assert_eq!(extracted.span_id(), SpanId::from_u64(1));
    }

    #[test]
    fn missing_span_id_still_yields_a_context() {
        let propagator = B3Propagator::with_id_generator(IncrementIdGenerator::new());
        let extracted = propagator
            .extract(&carrier(Some(TRACE_ID_STR), None, None, None, None))
            .unwrap();
        assert_eq!(extracted.trace_id(), TraceId::from_u64(TRACE_ID_LOW));
        assert_eq!(extracted.span_id(), SpanId::from_u64(1));
    }

    #[test]
    fn baggage_prefix_is_case_insensitive() {
        let propagator = B3Propagator::new();
        let mut headers = carrier(Some(TRACE_ID_STR), Some(SPAN_ID_STR), None, None, None);
        headers.insert("baggage_foo".to_owned(), "foofoo".to_owned());
        headers.insert("BAGGAGE_BAR".to_owned(), "barbar".to_owned());
        headers.insert("Baggage_MixedKey".to_owned(), "mixed".to_owned());
        headers.insert("baggage_".to_owned(), "empty key is skipped".to_owned());
        headers.insert("not_baggage_x".to_owned(), "skipped".to_owned());

        let extracted = propagator.extract(&headers).unwrap();
        assert_eq!(extracted.baggage_item("foo").as_deref(), Some("foofoo"));
        assert_eq!(extracted.baggage_item("BAR").as_deref(), Some("barbar"));
        assert_eq!(extracted.baggage_item("mixedkey").as_deref(), Some("mixed"));
        assert_eq!(extracted.baggage().len(), 3);
    }

    #[test]
    fn inject_b3() {
        let propagator = B3Propagator::new();
        let remote = propagator
            .extract(&carrier(
                Some(TRACE_ID_STR),
                Some(SPAN_ID_STR),
                Some("1"),
                None,
                Some("00000000000000cd"),
            ))
            .unwrap();
        remote.set_baggage_item("Tenant", "acme");

        let mut outbound: HashMap<String, String> = HashMap::new();
        propagator.inject(&remote, &mut outbound);

        assert_eq!(
            outbound.get(TRACE_ID_HEADER).map(String::as_str),
            Some(&TRACE_ID_STR[16..])
        );
        assert_eq!(
            outbound.get(SPAN_ID_HEADER).map(String::as_str),
            Some(SPAN_ID_STR)
        );
        assert_eq!(
            outbound.get(PARENT_SPAN_ID_HEADER).map(String::as_str),
            Some("00000000000000cd")
        );
        assert_eq!(outbound.get(SAMPLED_HEADER).map(String::as_str), Some("1"));
        assert_eq!(outbound.get(DEBUG_FLAG_HEADER), None);
        assert_eq!(
            outbound.get("baggage_tenant").map(String::as_str),
            Some("acme")
        );
    }

    #[test]
    fn inject_debug_span_writes_the_flags_header() {
        let propagator = B3Propagator::new();
        let remote = propagator
            .extract(&carrier(Some(TRACE_ID_STR), Some(SPAN_ID_STR), None, Some("1"), None))
            .unwrap();

        let mut outbound: HashMap<String, String> = HashMap::new();
        propagator.inject(&remote, &mut outbound);
        assert_eq!(outbound.get(DEBUG_FLAG_HEADER).map(String::as_str), Some("1"));
        assert_eq!(outbound.get(SAMPLED_HEADER), None);
    }

    #[test]
    fn inject_unsampled_span_writes_sampled_zero() {
        let propagator = B3Propagator::new();
        let remote = propagator
            .extract(&carrier(Some(TRACE_ID_STR), Some(SPAN_ID_STR), None, None, None))
            .unwrap();

        let mut outbound: HashMap<String, String> = HashMap::new();
        propagator.inject(&remote, &mut outbound);
        assert_eq!(outbound.get(SAMPLED_HEADER).map(String::as_str), Some("0"));
    }

    #[test]
    fn fields_lists_the_non_baggage_headers() {
        let propagator = B3Propagator::new();
        assert_eq!(
            propagator.fields().collect::<Vec<_>>(),
            vec![
                TRACE_ID_HEADER,
                SPAN_ID_HEADER,
                PARENT_SPAN_ID_HEADER,
                SAMPLED_HEADER,
                DEBUG_FLAG_HEADER,
            ]
        );
    }
}
