//! Metric, family, and alert types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_common::events::AlertType;
use pulse_common::{PerfThresholds, Severity};

/// Unit tag carried by a recorded metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Ms,
    Bytes,
    Score,
    Count,
    Percent,
}

/// A single recorded observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub timestamp: DateTime<Utc>,
    pub context: Option<serde_json::Value>,
}

/// Threshold family a metric name belongs to
///
/// Families carry the threshold lookup, the alert classification, and the
/// base severity for breaches. `Other` metrics are recorded but never
/// compared against any threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricFamily {
    ApiResponse,
    ComponentRender,
    StudyBuilderLoad,
    Memory,
    ErrorRate,
    Lcp,
    Fid,
    Cls,
    Other,
}

impl MetricFamily {
    /// Classify a metric name into its threshold family
    pub fn classify(name: &str) -> Self {
        match name {
            "api_response_time" => MetricFamily::ApiResponse,
            "component_render_time" => MetricFamily::ComponentRender,
            "study_builder_load_time" => MetricFamily::StudyBuilderLoad,
            "memory_usage" => MetricFamily::Memory,
            "error_rate" => MetricFamily::ErrorRate,
            "lcp" | "largest_contentful_paint" => MetricFamily::Lcp,
            "fid" | "first_input_delay" => MetricFamily::Fid,
            "cls" | "cumulative_layout_shift" => MetricFamily::Cls,
            _ => MetricFamily::Other,
        }
    }

    /// Threshold for this family, if it has one
    pub fn threshold(&self, thresholds: &PerfThresholds) -> Option<f64> {
        match self {
            MetricFamily::ApiResponse => Some(thresholds.api_response_ms),
            MetricFamily::ComponentRender => Some(thresholds.component_render_ms),
            MetricFamily::StudyBuilderLoad => Some(thresholds.study_builder_load_ms),
            MetricFamily::Memory => Some(thresholds.memory_mb),
            MetricFamily::ErrorRate => Some(thresholds.error_rate_percent),
            MetricFamily::Lcp => Some(thresholds.lcp_ms),
            MetricFamily::Fid => Some(thresholds.fid_ms),
            MetricFamily::Cls => Some(thresholds.cls_score),
            MetricFamily::Other => None,
        }
    }

    /// Alert classification for breaches of this family
    pub fn alert_type(&self) -> Option<AlertType> {
        match self {
            MetricFamily::ApiResponse
            | MetricFamily::ComponentRender
            | MetricFamily::StudyBuilderLoad => Some(AlertType::SlowResponse),
            MetricFamily::Memory => Some(AlertType::MemoryLeak),
            MetricFamily::ErrorRate => Some(AlertType::ErrorSpike),
            MetricFamily::Lcp | MetricFamily::Fid | MetricFamily::Cls => {
                Some(AlertType::Degradation)
            }
            MetricFamily::Other => None,
        }
    }

    /// Base severity for a breach (API latency escalates separately)
    pub fn base_severity(&self) -> Severity {
        match self {
            MetricFamily::ApiResponse => Severity::Medium,
            MetricFamily::ComponentRender => Severity::Low,
            MetricFamily::StudyBuilderLoad => Severity::Medium,
            MetricFamily::Memory => Severity::High,
            MetricFamily::ErrorRate => Severity::Critical,
            MetricFamily::Lcp | MetricFamily::Fid | MetricFamily::Cls => Severity::Medium,
            MetricFamily::Other => Severity::Low,
        }
    }

    /// Canned suggestions attached to a breach alert
    pub fn suggestions(&self) -> Vec<String> {
        let suggestions: &[&str] = match self {
            MetricFamily::ApiResponse => &[
                "add caching for hot endpoints",
                "inspect slow database queries",
            ],
            MetricFamily::ComponentRender => {
                &["memoize expensive components", "reduce re-render triggers"]
            }
            MetricFamily::StudyBuilderLoad => {
                &["lazy-load study builder blocks", "defer non-critical panels"]
            }
            MetricFamily::Memory => &["review component lifecycle and cleanup"],
            MetricFamily::ErrorRate => &["inspect recent deploys and error logs"],
            MetricFamily::Lcp => &["optimize the largest contentful paint element"],
            MetricFamily::Fid => &["break up long main-thread tasks"],
            MetricFamily::Cls => &["reserve space for late-loading content"],
            MetricFamily::Other => &[],
        };
        suggestions.iter().map(|s| s.to_string()).collect()
    }
}

impl std::fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MetricFamily::ApiResponse => "api_response",
            MetricFamily::ComponentRender => "component_render",
            MetricFamily::StudyBuilderLoad => "study_builder_load",
            MetricFamily::Memory => "memory",
            MetricFamily::ErrorRate => "error_rate",
            MetricFamily::Lcp => "lcp",
            MetricFamily::Fid => "fid",
            MetricFamily::Cls => "cls",
            MetricFamily::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A threshold breach observation
///
/// Created exactly once per breach; repeated breaches produce repeated
/// alerts (no deduplication), bounded only by the alert log capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub threshold: f64,
    pub actual_value: f64,
    pub timestamp: DateTime<Utc>,
    pub suggestions: Vec<String>,
}
