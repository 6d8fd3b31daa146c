//! Immutable span identity: trace id, span id and trace flags.
use crate::trace::{TraceError, TraceResult};
use std::fmt;
use std::ops::{BitAnd, BitOr};

/// Length of a hex encoded 64-bit identifier.
const HEX_LEN_64: usize = 16;
/// Length of a hex encoded 128-bit identifier.
const HEX_LEN_128: usize = 32;

/// `from_str_radix` tolerates a leading `+`; identifiers do not.
fn is_hex(hex: &str) -> bool {
    hex.bytes().all(|b| b.is_ascii_hexdigit())
}

/// A 64-bit trace identifier, the root identity of a request flow.
///
/// Immutable once assigned to a span; every descendant of that span carries
/// the same trace id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceId(u64);

impl TraceId {
    /// Construct a trace id from its numeric value.
    pub const fn from_u64(value: u64) -> Self {
        TraceId(value)
    }

    /// Numeric value of this trace id.
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Parse a trace id from fixed-width hex.
    ///
    /// Accepts 16 hex characters (64-bit) or 32 hex characters (128-bit).
    /// A 128-bit value retains only its low-order 64 bits; peers emitting
    /// 128-bit ids stay joinable without the caller treating this as data
    /// loss. Any other length or a non-hex character is rejected.
    pub fn from_hex(hex: &str) -> TraceResult<Self> {
        if !is_hex(hex) {
            return Err(TraceError::malformed_id("trace id", hex));
        }
        match hex.len() {
            HEX_LEN_64 => u64::from_str_radix(hex, 16)
                .map(TraceId)
                .map_err(|_| TraceError::malformed_id("trace id", hex)),
            HEX_LEN_128 => u128::from_str_radix(hex, 16)
                .map(|id| TraceId(id as u64))
                .map_err(|_| TraceError::malformed_id("trace id", hex)),
            _ => Err(TraceError::malformed_id("trace id", hex)),
        }
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({:016x})", self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for TraceId {
    fn from(value: u64) -> Self {
        TraceId(value)
    }
}

/// A 64-bit span identifier, unique within a trace.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Construct a span id from its numeric value.
    pub const fn from_u64(value: u64) -> Self {
        SpanId(value)
    }

    /// Numeric value of this span id.
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    /// Parse a span id from exactly 16 hex characters.
    pub fn from_hex(hex: &str) -> TraceResult<Self> {
        if hex.len() != HEX_LEN_64 || !is_hex(hex) {
            return Err(TraceError::malformed_id("span id", hex));
        }
        u64::from_str_radix(hex, 16)
            .map(SpanId)
            .map_err(|_| TraceError::malformed_id("span id", hex))
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({:016x})", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId(value)
    }
}

/// Flags that can be set on a [`SpanContext`].
///
/// The sampling decision is made once, at span creation or continuation, and
/// is inherited by every descendant span unchanged. The debug bit records
/// that an inbound carrier forced sampling regardless of the configured
/// policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// Trace is sampled and spans are delivered to reporters.
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);
    /// Sampling was forced by the debug override header.
    pub const DEBUG: TraceFlags = TraceFlags(0x02);

    /// Construct flags from a bitmask.
    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    /// Returns `true` if the sampled bit is set.
    pub fn is_sampled(&self) -> bool {
        self.0 & Self::SAMPLED.0 == Self::SAMPLED.0
    }

    /// Returns a copy of these flags with the sampled bit set to `sampled`.
    pub fn with_sampled(&self, sampled: bool) -> Self {
        if sampled {
            TraceFlags(self.0 | Self::SAMPLED.0)
        } else {
            TraceFlags(self.0 & !Self::SAMPLED.0)
        }
    }

    /// Returns `true` if the debug bit is set.
    pub fn is_debug(&self) -> bool {
        self.0 & Self::DEBUG.0 == Self::DEBUG.0
    }

    /// Returns a copy of these flags with the debug bit set to `debug`.
    pub fn with_debug(&self, debug: bool) -> Self {
        if debug {
            TraceFlags(self.0 | Self::DEBUG.0)
        } else {
            TraceFlags(self.0 & !Self::DEBUG.0)
        }
    }

    /// Whether a span carrying these flags is handed to reporters.
    pub fn is_exportable(&self) -> bool {
        self.is_sampled() || self.is_debug()
    }
}

impl BitAnd for TraceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        TraceFlags(self.0 & rhs.0)
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        TraceFlags(self.0 | rhs.0)
    }
}

/// The immutable identity shared by a span and everything derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    is_remote: bool,
}

impl SpanContext {
    /// Construct a span context.
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        is_remote: bool,
    ) -> Self {
        SpanContext {
            trace_id,
            span_id,
            trace_flags,
            is_remote,
        }
    }

    /// The trace this span belongs to.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// This span's identifier.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Flags for this span.
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// Returns `true` if this context was reconstructed from a carrier
    /// rather than created in this process.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Returns `true` if the sampled flag is set.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }

    /// Returns `true` if the debug override flag is set.
    pub fn is_debug(&self) -> bool {
        self.trace_flags.is_debug()
    }

    /// Whether this span is delivered to reporters on close.
    pub fn is_exportable(&self) -> bool {
        self.trace_flags.is_exportable()
    }
}
