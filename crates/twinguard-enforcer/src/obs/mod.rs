//! Lightweight in-process metrics.
//!
//! Decision, view, and rejection counters plus dispatch latency, stored as
//! atomics and rendered in Prometheus text format on demand.

pub mod metrics;

pub use metrics::EnforcerMetrics;
