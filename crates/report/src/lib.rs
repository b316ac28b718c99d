//! Comparison of two benchmark run records and report rendering.
//!
//! `compare` pairs up every metric present in both records; a metric
//! missing from either side is reported as not-comparable, never
//! defaulted to zero. `render` turns the result into a self-contained
//! HTML page.

mod html;

use std::collections::BTreeMap;

use record::RunResultRecord;
use serde::Serialize;
use thiserror::Error;

pub use html::{render, write_report, ReportOptions};

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("records are not comparable: phase '{a}' vs phase '{b}'")]
    IncomparableRecords { a: String, b: String },
}

/// Which side wins a metric, under that metric's fixed direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Advantage {
    A,
    B,
    Tie,
}

/// Fixed comparison direction per metric. Documented here, never
/// inferred from the data: throughput counts up, everything else
/// (latency, stage durations, power, utilization, temperature) counts
/// down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherWins,
    LowerWins,
}

pub fn direction(metric: &str) -> Direction {
    match metric {
        "fps" => Direction::HigherWins,
        _ => Direction::LowerWins,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricComparison {
    pub name: String,
    pub a: f64,
    pub b: f64,
    /// a - b
    pub delta: f64,
    /// a / b, absent when b is zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    pub advantage: Advantage,
}

/// Per-stage share of total latency, as a percentage rounded to one
/// decimal.
#[derive(Debug, Clone, Serialize)]
pub struct StageOverhead {
    pub stage: String,
    pub avg_ms: f64,
    pub pct_of_latency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformSummary {
    pub platform: String,
    pub model: String,
    pub fps: f64,
    pub avg_latency_ms: f64,
    pub frame_count: u64,
    pub error_count: u64,
    pub stage_overhead: Vec<StageOverhead>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub phase: String,
    pub a: PlatformSummary,
    pub b: PlatformSummary,
    pub metrics: Vec<MetricComparison>,
    /// Metric names present only in record A: reported, not compared
    pub only_in_a: Vec<String>,
    /// Metric names present only in record B
    pub only_in_b: Vec<String>,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Flatten a record into comparable named metrics. Only values the
/// record actually carries appear in the map; `power_per_fps` is derived
/// and requires both a power reading and a non-zero fps.
fn metric_map(r: &RunResultRecord) -> BTreeMap<String, f64> {
    let mut map = BTreeMap::new();
    map.insert("fps".to_string(), r.fps);
    map.insert("avg_latency_ms".to_string(), r.avg_latency_ms);
    for (stage, ms) in &r.stages_ms {
        map.insert(format!("stages_ms.{stage}"), *ms);
    }
    let res = &r.resources;
    if let Some(v) = res.cpu_pct {
        map.insert("cpu_pct".to_string(), v);
    }
    if let Some(v) = res.mem_pct {
        map.insert("mem_pct".to_string(), v);
    }
    if let Some(v) = res.gpu_pct {
        map.insert("gpu_pct".to_string(), v);
    }
    if let Some(v) = res.gpu_temp_c {
        map.insert("gpu_temp_c".to_string(), v);
    }
    if let Some(v) = res.power_w {
        map.insert("power_w".to_string(), v);
        if r.fps > 0.0 {
            map.insert("power_per_fps".to_string(), v / r.fps);
        }
    }
    map
}

fn stage_overheads(r: &RunResultRecord) -> Vec<StageOverhead> {
    r.stages_ms
        .iter()
        .map(|(stage, ms)| StageOverhead {
            stage: stage.clone(),
            avg_ms: *ms,
            pct_of_latency: if r.avg_latency_ms > 0.0 {
                round1(ms / r.avg_latency_ms * 100.0)
            } else {
                0.0
            },
        })
        .collect()
}

fn summarize(r: &RunResultRecord) -> PlatformSummary {
    PlatformSummary {
        platform: r.platform.clone(),
        model: r.model.clone(),
        fps: r.fps,
        avg_latency_ms: r.avg_latency_ms,
        frame_count: r.frame_count,
        error_count: r.error_count,
        stage_overhead: stage_overheads(r),
    }
}

fn judge(name: &str, a: f64, b: f64) -> Advantage {
    if a == b {
        return Advantage::Tie;
    }
    match direction(name) {
        Direction::HigherWins => {
            if a > b {
                Advantage::A
            } else {
                Advantage::B
            }
        }
        Direction::LowerWins => {
            if a < b {
                Advantage::A
            } else {
                Advantage::B
            }
        }
    }
}

/// Compare two persisted records of the same phase.
pub fn compare(a: &RunResultRecord, b: &RunResultRecord) -> Result<ComparisonResult, CompareError> {
    if a.phase != b.phase {
        return Err(CompareError::IncomparableRecords {
            a: a.phase.clone(),
            b: b.phase.clone(),
        });
    }

    let map_a = metric_map(a);
    let map_b = metric_map(b);

    let mut metrics = Vec::new();
    let mut only_in_a = Vec::new();
    let mut only_in_b = Vec::new();

    for (name, va) in &map_a {
        match map_b.get(name) {
            Some(vb) => metrics.push(MetricComparison {
                name: name.clone(),
                a: *va,
                b: *vb,
                delta: va - vb,
                ratio: if *vb != 0.0 { Some(va / vb) } else { None },
                advantage: judge(name, *va, *vb),
            }),
            None => only_in_a.push(name.clone()),
        }
    }
    for name in map_b.keys() {
        if !map_a.contains_key(name) {
            only_in_b.push(name.clone());
        }
    }

    Ok(ComparisonResult {
        phase: a.phase.clone(),
        a: summarize(a),
        b: summarize(b),
        metrics,
        only_in_a,
        only_in_b,
    })
}

impl ComparisonResult {
    pub fn metric(&self, name: &str) -> Option<&MetricComparison> {
        self.metrics.iter().find(|m| m.name == name)
    }
}
