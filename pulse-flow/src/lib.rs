//! # StudyPulse Flow & Journey Tracker
//!
//! Records ordered step sequences for two kinds of processes — a researcher's
//! study-creation flow and a participant's journey through an ordered block
//! sequence — computes completion ratios, infers drop-off points, and checks
//! conformance against declared critical paths.
//!
//! References to unknown flow/journey ids are silent no-ops: the tracker is
//! observational and must never crash the UI layer over a stale identifier.

pub mod critical_path;
pub mod tracker;
pub mod types;

pub use critical_path::CriticalPath;
pub use tracker::{DropOffCount, FlowAnalytics, FlowPerformance, FlowTracker};
pub use types::{
    DeviceInfo, FlowInstance, FlowStatus, FlowStep, JourneyInstance, JourneySignal, JourneyStep,
    SignalKind,
};

pub use pulse_common::events::FlowEfficiency;
