//! Flow-local tracking of the current span.
//!
//! Every logical flow (one request-handling thread, or one asynchronous
//! continuation pinned to a thread) owns its own stack of active spans.
//! Stacks are never shared or locked across flows: carrying a span to
//! another flow is the caller's job, via
//! [`Tracer::detach`](crate::trace::Tracer::detach) in the old flow and
//! [`Tracer::attach`](crate::trace::Tracer::attach) in the new one.
use crate::trace::span::Span;
use std::cell::RefCell;

thread_local! {
    /// The stack of active span frames for this flow.
    static SPAN_STACK: RefCell<Vec<Span>> = const { RefCell::new(Vec::new()) };
}

/// A handle to this flow's current span, if one is active.
pub fn current_span() -> Option<Span> {
    SPAN_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Returns `true` if this flow has a current span.
///
/// A flow that has finished its work and still reports `true` has leaked a
/// span; every create/continue must be paired with a close or detach.
pub fn has_current_span() -> bool {
    SPAN_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Push `span` as the new current frame, saving the prior one beneath it.
pub(crate) fn push_span(span: Span) {
    SPAN_STACK.with(|stack| stack.borrow_mut().push(span));
}

/// Pop the current frame if it is `span`, restoring the prior frame.
///
/// Returns `false` without touching the stack when `span` is not current,
/// so an out-of-order close cannot corrupt the frames beneath it.
pub(crate) fn pop_if_current(span: &Span) -> bool {
    SPAN_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        match stack.last() {
            Some(current) if current.span_id() == span.span_id() => {
                stack.pop();
                true
            }
            _ => false,
        }
    })
}
