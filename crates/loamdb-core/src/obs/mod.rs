//! Observability: execution telemetry and sink abstractions.
//!
//! This module does not access storage internals directly; sessions report
//! events at execution boundaries.

pub mod sink;

pub use sink::{CountingSink, ExecKind, MetricsEvent, MetricsSink, NullSink};
