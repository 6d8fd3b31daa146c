//! Trace context propagation across carrier boundaries.
//!
//! A carrier is any header-like structure used to transmit trace context:
//! HTTP headers, messaging headers, RPC metadata. Rather than knowing every
//! carrier type, the codec is written once against the narrow [`Extractor`]
//! and [`Injector`] capability traits; each transport adapter implements
//! them over its own header map.
//!
//! Reads are case-insensitive, writes preserve the case given.

mod b3;

pub use b3::{
    B3Propagator, BAGGAGE_PREFIX, DEBUG_FLAG_HEADER, PARENT_SPAN_ID_HEADER, SAMPLED_HEADER,
    SPAN_ID_HEADER, TRACE_ID_HEADER,
};

use std::collections::HashMap;

/// Read-side carrier capability: look up a header by name and enumerate all
/// header names (needed for baggage discovery).
pub trait Extractor {
    /// Get a value for a key from the carrier. Lookups are
    /// case-insensitive.
    fn get(&self, key: &str) -> Option<&str>;

    /// Collect all the keys in the carrier.
    fn keys(&self) -> Vec<&str>;
}

/// Write-side carrier capability.
pub trait Injector {
    /// Set a key and value on the carrier.
    fn set(&mut self, key: &str, value: String);
}

impl Extractor for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        self.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    fn keys(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

impl Injector for HashMap<String, String> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_owned(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_map_reads_are_case_insensitive() {
        let mut carrier = HashMap::new();
        carrier.set("X-B3-TraceId", "00f067aa0ba902b7".to_owned());

        assert_eq!(
            Extractor::get(&carrier, "x-b3-traceid"),
            Some("00f067aa0ba902b7")
        );
        assert_eq!(
            Extractor::get(&carrier, "X-B3-TRACEID"),
            Some("00f067aa0ba902b7")
        );
        assert_eq!(Extractor::get(&carrier, "x-b3-spanid"), None);
    }

    #[test]
    fn hash_map_enumerates_names() {
        let mut carrier = HashMap::new();
        carrier.set("baggage_foo", "1".to_owned());
        carrier.set("BAGGAGE_BAR", "2".to_owned());

        let mut keys = Extractor::keys(&carrier);
        keys.sort_unstable();
        assert_eq!(keys, ["BAGGAGE_BAR", "baggage_foo"]);
    }
}
