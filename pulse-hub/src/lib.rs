//! # StudyPulse Hub
//!
//! The engine's composition root. [`PulseHub`] builds the Rule Validator,
//! Flow & Journey Tracker, and Performance Monitor on one shared event bus
//! and clock, exposes their combined synchronous call surface, and drives
//! the periodic trend-analysis, retention-sweep, and detailed-monitoring
//! tasks through an explicit [`Scheduler`].
//!
//! ```no_run
//! use pulse_common::EngineConfig;
//! use pulse_hub::PulseHub;
//!
//! # #[tokio::main] async fn main() {
//! let mut hub = PulseHub::new(EngineConfig::load(None).unwrap_or_default());
//! hub.init();
//!
//! let flow_id = hub.track_study_creation("researcher-42", None);
//! hub.track_study_step(flow_id, "template_selection", None, true);
//!
//! hub.dispose();
//! # }
//! ```

pub mod hub;
pub mod scheduler;

pub use hub::PulseHub;
pub use scheduler::Scheduler;

pub use pulse_common::{EngineConfig, PerfThresholds, PulseEvent, Severity};
