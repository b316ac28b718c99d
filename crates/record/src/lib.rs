//! Persisted benchmark run records.
//!
//! A `RunResultRecord` is the finalized, serializable summary of one run
//! on one platform. Once written it is immutable input to comparison;
//! loading validates the required fields and surfaces anything missing
//! as `RecordError::Malformed` rather than defaulting.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use metrics::RunMetrics;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to read record '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed record '{path}': {detail}")]
    Malformed { path: String, detail: String },
    #[error("failed to write record '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Mean resource utilization over the run. Every field is optional and
/// omitted from the JSON when the platform never reported it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_w: Option<f64>,
}

/// The persisted unit: one benchmark run on one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResultRecord {
    pub platform: String,
    /// e.g. "baseline" | "accelerated"
    pub phase: String,
    pub model: String,
    pub frame_count: u64,
    #[serde(default)]
    pub error_count: u64,
    pub elapsed_seconds: f64,
    pub fps: f64,
    pub avg_latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms_max: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub stages_ms: BTreeMap<String, f64>,
    #[serde(default)]
    pub resources: ResourceSummary,
    pub generated_at: DateTime<Utc>,
}

impl RunResultRecord {
    /// Build a record from finished run metrics.
    pub fn from_metrics(
        platform: &str,
        phase: &str,
        model: &str,
        metrics: &RunMetrics,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let stages_ms = metrics
            .stages_ms
            .iter()
            .map(|(name, acc)| (name.clone(), acc.mean()))
            .collect();

        let (latency_ms_min, latency_ms_max) = if metrics.latency_ms.count > 0 {
            (Some(metrics.latency_ms.min), Some(metrics.latency_ms.max))
        } else {
            (None, None)
        };

        let res = &metrics.resources;
        let resources = ResourceSummary {
            cpu_pct: res.cpu_pct.map(|a| a.mean()),
            mem_pct: res.mem_pct.map(|a| a.mean()),
            gpu_pct: res.gpu_pct.map(|a| a.mean()),
            gpu_temp_c: res.gpu_temp_c.map(|a| a.mean()),
            power_w: res.power_w.map(|a| a.mean()),
        };

        Self {
            platform: platform.to_string(),
            phase: phase.to_string(),
            model: model.to_string(),
            frame_count: metrics.frame_count,
            error_count: metrics.error_count,
            elapsed_seconds: metrics.elapsed_seconds,
            fps: metrics.fps(),
            avg_latency_ms: metrics.avg_latency_ms(),
            latency_ms_min,
            latency_ms_max,
            stages_ms,
            resources,
            generated_at,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let wrap = |source| RecordError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(wrap)?;
            }
        }
        let json = serde_json::to_string_pretty(self).expect("record serialization is infallible");
        fs::write(path, json).map_err(wrap)
    }

    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let content = fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| RecordError::Malformed {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use metrics::Aggregator;
    use telemetry::FrameTiming;

    fn timing(frame_idx: u64, stages: &[(&str, f64)], total_ms: f64) -> FrameTiming {
        FrameTiming {
            frame_idx,
            stages: stages
                .iter()
                .map(|(n, ms)| (n.to_string(), *ms))
                .collect(),
            total_ms,
            completed_ns: 0,
            error: None,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_from_metrics_round_trip() {
        let mut agg = Aggregator::new();
        agg.observe(timing(0, &[("compute", 25.0), ("sync", 1.0)], 27.0))
            .unwrap();
        agg.observe(timing(1, &[("compute", 35.0), ("sync", 1.0)], 37.0))
            .unwrap();
        let m = agg.finish();

        let record = RunResultRecord::from_metrics("jetson-nano", "accelerated", "yolov8n", &m, fixed_time());
        assert_eq!(record.frame_count, 2);
        assert_eq!(record.avg_latency_ms, 32.0);
        assert_eq!(record.stages_ms["compute"], 30.0);
        assert_eq!(record.latency_ms_min, Some(27.0));
        assert_eq!(record.latency_ms_max, Some(37.0));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("run.json");
        record.save(&path).unwrap();
        let loaded = RunResultRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_missing_fps_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{
                "platform": "windows-rtx2070",
                "phase": "accelerated",
                "model": "yolov8n",
                "frame_count": 10,
                "elapsed_seconds": 1.0,
                "avg_latency_ms": 35.0,
                "generated_at": "2024-05-14T12:00:00Z"
            }"#,
        )
        .unwrap();

        match RunResultRecord::load(&path) {
            Err(RecordError::Malformed { detail, .. }) => {
                assert!(detail.contains("fps"), "detail was: {detail}")
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            RunResultRecord::load(Path::new("/no/such/record.json")),
            Err(RecordError::Io { .. })
        ));
    }

    #[test]
    fn test_optional_sections_default_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.json");
        fs::write(
            &path,
            r#"{
                "platform": "x",
                "phase": "baseline",
                "model": "yolov8n",
                "frame_count": 0,
                "elapsed_seconds": 30.0,
                "fps": 0.0,
                "avg_latency_ms": 0.0,
                "generated_at": "2024-05-14T12:00:00Z"
            }"#,
        )
        .unwrap();

        let record = RunResultRecord::load(&path).unwrap();
        assert!(record.stages_ms.is_empty());
        assert_eq!(record.resources, ResourceSummary::default());
        assert_eq!(record.error_count, 0);
    }

    #[test]
    fn test_absent_resources_are_omitted_not_zero() {
        let m = Aggregator::new().finish();
        let record = RunResultRecord::from_metrics("x", "baseline", "m", &m, fixed_time());
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("power_w"));
        assert!(!json.contains("stages_ms"));
    }
}
