use std::sync::atomic::{AtomicU64, Ordering};

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    BulkUpdate,
    Count,
    Delete,
    Derive,
    Flush,
    Insert,
    Load,
    Update,
}

impl ExecKind {
    const COUNT: usize = 8;

    const fn index(self) -> usize {
        match self {
            Self::BulkUpdate => 0,
            Self::Count => 1,
            Self::Delete => 2,
            Self::Derive => 3,
            Self::Flush => 4,
            Self::Insert => 5,
            Self::Load => 6,
            Self::Update => 7,
        }
    }
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MetricsEvent {
    pub kind: ExecKind,
    pub entity: &'static str,
}

///
/// MetricsSink
///
/// Sessions report one event per executed operation. Sinks are process
/// statics; recording must never fail or block.
///

pub trait MetricsSink: Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// NullSink
///

pub struct NullSink;

impl MetricsSink for NullSink {
    fn record(&self, _event: MetricsEvent) {}
}

///
/// CountingSink
/// Per-kind counters; the assertion surface for tests and diagnostics.
///

#[derive(Default)]
pub struct CountingSink {
    counts: [AtomicU64; ExecKind::COUNT],
}

impl CountingSink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counts: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    #[must_use]
    pub fn count(&self, kind: ExecKind) -> u64 {
        self.counts[kind.index()].load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        for counter in &self.counts {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl MetricsSink for CountingSink {
    fn record(&self, event: MetricsEvent) {
        self.counts[event.kind.index()].fetch_add(1, Ordering::Relaxed);
    }
}

///
/// TESTS
///
