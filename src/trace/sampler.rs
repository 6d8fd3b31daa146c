//! Sampling policies.
use crate::trace::TraceId;
use std::fmt;

/// The [`ShouldSample`] interface allows implementations to decide whether a
/// trace is sampled, and therefore exported, at the moment its root span is
/// created.
///
/// The decision is made exactly once per trace: continued and child spans
/// inherit their parent's decision unchanged and never re-evaluate the
/// policy. The inbound debug override flag takes precedence over any
/// configured policy.
pub trait ShouldSample: CloneShouldSample + Send + Sync + fmt::Debug {
    /// Returns `true` if the trace rooted at a span with this trace id and
    /// name should be sampled.
    fn should_sample(&self, trace_id: TraceId, name: &str) -> bool;
}

/// This trait should not be used directly, instead users should use
/// [`ShouldSample`].
pub trait CloneShouldSample {
    fn box_clone(&self) -> Box<dyn ShouldSample>;
}

impl<T> CloneShouldSample for T
where
    T: ShouldSample + Clone + 'static,
{
    fn box_clone(&self) -> Box<dyn ShouldSample> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ShouldSample> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Built-in sampling policies.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Sampler {
    /// Always sample the trace.
    AlwaysOn,
    /// Never sample the trace.
    AlwaysOff,
}

impl ShouldSample for Sampler {
    fn should_sample(&self, _trace_id: TraceId, _name: &str) -> bool {
        match self {
            Sampler::AlwaysOn => true,
            Sampler::AlwaysOff => false,
        }
    }
}
