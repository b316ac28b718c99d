use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use record::{ResourceSummary, RunResultRecord};

pub fn fixed_generated_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 14, 12, 0, 0).unwrap()
}

fn stages(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs
        .iter()
        .map(|(name, ms)| (name.to_string(), *ms))
        .collect()
}

/// Discrete-GPU platform record with explicit transfer stages.
/// Numbers follow the illustrative fixtures of the original comparison
/// scripts; they are fixtures, not measurements.
pub fn record_accelerated_x() -> RunResultRecord {
    RunResultRecord {
        platform: "X".to_string(),
        phase: "accelerated".to_string(),
        model: "yolov8n".to_string(),
        frame_count: 855,
        error_count: 0,
        elapsed_seconds: 30.0,
        fps: 28.5,
        avg_latency_ms: 35.2,
        latency_ms_min: Some(31.0),
        latency_ms_max: Some(44.8),
        stages_ms: stages(&[
            ("h2d", 5.3),
            ("compute", 25.1),
            ("d2h", 3.2),
            ("sync", 1.6),
        ]),
        resources: ResourceSummary {
            cpu_pct: Some(31.0),
            mem_pct: Some(48.0),
            ..Default::default()
        },
        generated_at: fixed_generated_at(),
    }
}

/// Unified-memory platform record: no transfer stages at all.
pub fn record_accelerated_y() -> RunResultRecord {
    RunResultRecord {
        platform: "Y".to_string(),
        phase: "accelerated".to_string(),
        model: "yolov8n".to_string(),
        frame_count: 270,
        error_count: 0,
        elapsed_seconds: 30.0,
        fps: 9.0,
        avg_latency_ms: 45.1,
        latency_ms_min: Some(42.3),
        latency_ms_max: Some(51.9),
        stages_ms: stages(&[("compute", 44.8), ("sync", 0.3)]),
        resources: ResourceSummary {
            cpu_pct: Some(55.0),
            mem_pct: Some(71.0),
            gpu_pct: Some(97.0),
            gpu_temp_c: Some(48.5),
            power_w: Some(6.1),
        },
        generated_at: fixed_generated_at(),
    }
}

/// CPU-only baseline record, for phase-mismatch tests.
pub fn record_baseline() -> RunResultRecord {
    RunResultRecord {
        platform: "Y".to_string(),
        phase: "baseline".to_string(),
        model: "yolov8n".to_string(),
        frame_count: 42,
        error_count: 0,
        elapsed_seconds: 30.0,
        fps: 1.4,
        avg_latency_ms: 712.0,
        latency_ms_min: Some(690.2),
        latency_ms_max: Some(745.5),
        stages_ms: stages(&[("compute", 708.9), ("sync", 0.1)]),
        resources: ResourceSummary {
            cpu_pct: Some(98.0),
            mem_pct: Some(64.0),
            ..Default::default()
        },
        generated_at: fixed_generated_at(),
    }
}
