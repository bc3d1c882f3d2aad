//! Per-instance verbosity on top of whatever subscriber the caller installed.

use tracing::{
    dispatcher::{self, Dispatch},
    level_filters::LevelFilter,
    span,
    subscriber::{Interest, Subscriber},
    Event, Metadata,
};

/// Forwards to the surrounding dispatcher, dropping everything above `level`.
struct LevelGate {
    level: LevelFilter,
    inner: Dispatch,
}

impl LevelGate {
    fn passes(&self, metadata: &Metadata<'_>) -> bool {
        self.level >= *metadata.level()
    }
}

impl Subscriber for LevelGate {
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if self.passes(metadata) {
            self.inner.register_callsite(metadata)
        } else {
            // Other instances may still want this callsite
            Interest::sometimes()
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.passes(metadata) && self.inner.enabled(metadata)
    }

    fn new_span(&self, span: &span::Attributes<'_>) -> span::Id {
        self.inner.new_span(span)
    }

    fn record(&self, span: &span::Id, values: &span::Record<'_>) {
        self.inner.record(span, values);
    }

    fn record_follows_from(&self, span: &span::Id, follows: &span::Id) {
        self.inner.record_follows_from(span, follows);
    }

    fn event(&self, event: &Event<'_>) {
        if self.passes(event.metadata()) {
            self.inner.event(event);
        }
    }

    fn enter(&self, span: &span::Id) {
        self.inner.enter(span);
    }

    fn exit(&self, span: &span::Id) {
        self.inner.exit(span);
    }

    fn clone_span(&self, id: &span::Id) -> span::Id {
        self.inner.clone_span(id)
    }

    fn try_close(&self, id: span::Id) -> bool {
        self.inner.try_close(id)
    }
}

/// Run `f` with events above `level` suppressed on the current thread.
///
/// Work that `f` hands to other threads is not covered, so callers wrap
/// each unit of parallel work separately.
pub fn with_level<T>(level: LevelFilter, f: impl FnOnce() -> T) -> T {
    let inner = dispatcher::get_default(Dispatch::clone);
    dispatcher::with_default(&Dispatch::new(LevelGate { level, inner }), f)
}
