//! Engine configuration loading
//!
//! Resolution follows a fixed priority order:
//! 1. Explicit path passed by the host application (highest priority)
//! 2. `PULSE_CONFIG` environment variable pointing at a TOML file
//! 3. Compiled defaults (fallback)
//!
//! A config file may be partial: only the keys it names override the
//! defaults, everything else keeps its compiled value.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file path
pub const CONFIG_ENV_VAR: &str = "PULSE_CONFIG";

/// Performance thresholds per metric family
///
/// Values are compared against raw metric values; units are implied by the
/// field name (ms for latency families, MiB for memory, percent for error
/// rate, unitless score for CLS).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerfThresholds {
    /// API response time threshold (ms)
    pub api_response_ms: f64,
    /// Component render time threshold (ms)
    pub component_render_ms: f64,
    /// Study Builder load time threshold (ms)
    pub study_builder_load_ms: f64,
    /// Memory usage threshold (MiB)
    pub memory_mb: f64,
    /// Error rate threshold (percent)
    pub error_rate_percent: f64,
    /// Largest Contentful Paint threshold (ms)
    pub lcp_ms: f64,
    /// First Input Delay threshold (ms)
    pub fid_ms: f64,
    /// Cumulative Layout Shift threshold (score)
    pub cls_score: f64,
}

impl Default for PerfThresholds {
    fn default() -> Self {
        Self {
            api_response_ms: 2000.0,
            component_render_ms: 100.0,
            study_builder_load_ms: 3000.0,
            memory_mb: 100.0,
            error_rate_percent: 5.0,
            lcp_ms: 2500.0,
            fid_ms: 100.0,
            cls_score: 0.1,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Performance thresholds (overridable per family)
    pub thresholds: PerfThresholds,

    /// Validation history capacity (entries)
    pub validation_history_cap: usize,
    /// Per-metric sample history capacity (entries)
    pub metric_history_cap: usize,
    /// Global alert log capacity (entries)
    pub alert_cap: usize,

    /// Flow/journey retention window (hours)
    pub retention_hours: i64,

    /// Trend-analysis task cadence (seconds)
    pub trend_interval_secs: u64,
    /// Retention-sweep task cadence (seconds)
    pub sweep_interval_secs: u64,
    /// Detailed-monitoring task cadence (seconds)
    pub detailed_interval_secs: u64,
    /// Whether the detailed-monitoring task runs at all
    pub detailed_monitoring: bool,

    /// Event bus channel capacity
    pub event_bus_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: PerfThresholds::default(),
            validation_history_cap: 1000,
            metric_history_cap: 100,
            alert_cap: 50,
            retention_hours: 24,
            trend_interval_secs: 300,
            sweep_interval_secs: 3600,
            detailed_interval_secs: 30,
            detailed_monitoring: false,
            event_bus_capacity: 100,
        }
    }
}

/// Partial config file contents; absent keys keep their defaults
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    thresholds: Option<ThresholdOverlay>,
    validation_history_cap: Option<usize>,
    metric_history_cap: Option<usize>,
    alert_cap: Option<usize>,
    retention_hours: Option<i64>,
    trend_interval_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    detailed_interval_secs: Option<u64>,
    detailed_monitoring: Option<bool>,
    event_bus_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdOverlay {
    api_response_ms: Option<f64>,
    component_render_ms: Option<f64>,
    study_builder_load_ms: Option<f64>,
    memory_mb: Option<f64>,
    error_rate_percent: Option<f64>,
    lcp_ms: Option<f64>,
    fid_ms: Option<f64>,
    cls_score: Option<f64>,
}

impl EngineConfig {
    /// Resolve configuration following the priority order
    ///
    /// An explicit `path` wins over the `PULSE_CONFIG` environment variable;
    /// with neither present, compiled defaults are returned. A named file
    /// that does not exist or fails to parse is an error (misconfiguration
    /// should be loud at startup, unlike runtime ingestion).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&env_path));
        }

        Ok(Self::default())
    }

    /// Load configuration from a TOML file, overlaying onto defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse TOML contents, overlaying onto defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let overlay: ConfigOverlay = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("invalid config file: {}", e)))?;

        let mut config = Self::default();

        if let Some(t) = overlay.thresholds {
            let th = &mut config.thresholds;
            if let Some(v) = t.api_response_ms {
                th.api_response_ms = v;
            }
            if let Some(v) = t.component_render_ms {
                th.component_render_ms = v;
            }
            if let Some(v) = t.study_builder_load_ms {
                th.study_builder_load_ms = v;
            }
            if let Some(v) = t.memory_mb {
                th.memory_mb = v;
            }
            if let Some(v) = t.error_rate_percent {
                th.error_rate_percent = v;
            }
            if let Some(v) = t.lcp_ms {
                th.lcp_ms = v;
            }
            if let Some(v) = t.fid_ms {
                th.fid_ms = v;
            }
            if let Some(v) = t.cls_score {
                th.cls_score = v;
            }
        }

        if let Some(v) = overlay.validation_history_cap {
            config.validation_history_cap = v;
        }
        if let Some(v) = overlay.metric_history_cap {
            config.metric_history_cap = v;
        }
        if let Some(v) = overlay.alert_cap {
            config.alert_cap = v;
        }
        if let Some(v) = overlay.retention_hours {
            config.retention_hours = v;
        }
        if let Some(v) = overlay.trend_interval_secs {
            config.trend_interval_secs = v;
        }
        if let Some(v) = overlay.sweep_interval_secs {
            config.sweep_interval_secs = v;
        }
        if let Some(v) = overlay.detailed_interval_secs {
            config.detailed_interval_secs = v;
        }
        if let Some(v) = overlay.detailed_monitoring {
            config.detailed_monitoring = v;
        }
        if let Some(v) = overlay.event_bus_capacity {
            config.event_bus_capacity = v;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.thresholds.api_response_ms, 2000.0);
        assert_eq!(config.thresholds.component_render_ms, 100.0);
        assert_eq!(config.thresholds.study_builder_load_ms, 3000.0);
        assert_eq!(config.thresholds.memory_mb, 100.0);
        assert_eq!(config.thresholds.error_rate_percent, 5.0);
        assert_eq!(config.thresholds.lcp_ms, 2500.0);
        assert_eq!(config.thresholds.fid_ms, 100.0);
        assert_eq!(config.thresholds.cls_score, 0.1);
        assert_eq!(config.validation_history_cap, 1000);
        assert_eq!(config.metric_history_cap, 100);
        assert_eq!(config.alert_cap, 50);
        assert_eq!(config.retention_hours, 24);
    }

    #[test]
    fn test_partial_overlay_keeps_other_defaults() {
        let toml_contents = r#"
            alert_cap = 25

            [thresholds]
            api_response_ms = 1500.0
        "#;
        let config = EngineConfig::from_toml_str(toml_contents).unwrap();
        assert_eq!(config.alert_cap, 25);
        assert_eq!(config.thresholds.api_response_ms, 1500.0);
        // Untouched keys keep defaults
        assert_eq!(config.thresholds.lcp_ms, 2500.0);
        assert_eq!(config.validation_history_cap, 1000);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = EngineConfig::from_toml_str("alert_cap = \"not a number\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "detailed_monitoring = true").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert!(config.detailed_monitoring);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = EngineConfig::load(Some(Path::new("/nonexistent/pulse.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_without_sources_uses_defaults() {
        // Only valid if the env var is not set in the test environment
        if std::env::var(CONFIG_ENV_VAR).is_err() {
            let config = EngineConfig::load(None).unwrap();
            assert_eq!(config, EngineConfig::default());
        }
    }
}
