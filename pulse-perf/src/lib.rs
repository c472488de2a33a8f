//! # StudyPulse Performance Monitor
//!
//! Records scalar metrics (API latency, render duration, Web-Vitals-style
//! scores) tagged by family, compares each against configured thresholds,
//! and raises bounded, severity-tagged alerts.
//!
//! Recording never fails and never blocks: a breach produces exactly one
//! alert observation, and the caller's value is stored verbatim — including
//! negative or NaN values, which simply never breach a positive threshold.

pub mod monitor;
pub mod types;

pub use monitor::{
    FamilySummary, PerformanceMonitor, PerformanceSummary, SlowOperation, WebVitalsSnapshot,
};
pub use types::{Alert, Metric, MetricFamily, MetricUnit};

pub use pulse_common::events::AlertType;
