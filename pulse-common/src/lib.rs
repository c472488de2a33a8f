//! # StudyPulse Common Library
//!
//! Shared code for the StudyPulse observability engine including:
//! - Bounded history log (fixed-capacity FIFO)
//! - Severity levels
//! - Event types (PulseEvent enum) and the EventBus
//! - Clock abstraction (system and manual clocks)
//! - Engine configuration loading
//! - Common error types

pub mod bounded_log;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod severity;

pub use bounded_log::BoundedLog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, PerfThresholds};
pub use error::{Error, Result};
pub use events::{EventBus, PulseEvent};
pub use severity::Severity;
