//! Running statistics for one benchmark run.
//!
//! An `Aggregator` folds a stream of `FrameTiming`s plus periodic
//! resource samples into a single evolving `RunMetrics`. The caller owns
//! the aggregator's lifetime and calls `finish()` at the end of the run;
//! final statistics never require the full frame history.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::time::Instant;

use telemetry::FrameTiming;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("run already finished; aggregator is immutable")]
    Finished,
}

/// O(1)-update running statistics: count, mean, min, max.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatAccumulator {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl StatAccumulator {
    pub fn observe(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }
}

/// Resource-utilization statistics. Each field is absent until at least
/// one sample reported it; "never measured" stays distinguishable from
/// "measured zero".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceStats {
    pub cpu_pct: Option<StatAccumulator>,
    pub mem_pct: Option<StatAccumulator>,
    pub gpu_pct: Option<StatAccumulator>,
    pub gpu_temp_c: Option<StatAccumulator>,
    pub power_w: Option<StatAccumulator>,
}

/// One reading from the platform's resource sensors. All fields optional:
/// a discrete-GPU desktop has no Tegra power rail, a Jetson has no
/// dedicated VRAM counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSample {
    pub cpu_pct: Option<f64>,
    pub mem_pct: Option<f64>,
    pub gpu_pct: Option<f64>,
    pub gpu_temp_c: Option<f64>,
    pub power_w: Option<f64>,
}

/// Aggregate over all frames of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetrics {
    pub frame_count: u64,
    pub error_count: u64,
    pub elapsed_seconds: f64,
    pub latency_ms: StatAccumulator,
    pub stages_ms: BTreeMap<String, StatAccumulator>,
    pub resources: ResourceStats,
}

impl RunMetrics {
    /// Frames per second, always recomputed from count and elapsed time.
    pub fn fps(&self) -> f64 {
        if self.frame_count > 0 && self.elapsed_seconds > 0.0 {
            self.frame_count as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        self.latency_ms.mean()
    }

    pub fn avg_stage_ms(&self, stage: &str) -> Option<f64> {
        self.stages_ms.get(stage).map(|s| s.mean())
    }
}

const RECENT_CAPACITY: usize = 64;

/// Folds frame timings and resource samples into a `RunMetrics`.
///
/// Successful frames feed the latency and per-stage statistics; errored
/// frames only increment the error count (their stage durations stop at
/// the failure point and would skew the means). A capped ring of recent
/// timings is kept for live progress display only.
pub struct Aggregator {
    started: Instant,
    metrics: RunMetrics,
    recent: VecDeque<FrameTiming>,
    frozen: Option<RunMetrics>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            metrics: RunMetrics::default(),
            recent: VecDeque::with_capacity(RECENT_CAPACITY),
            frozen: None,
        }
    }

    pub fn observe(&mut self, timing: FrameTiming) -> Result<(), MetricsError> {
        if self.frozen.is_some() {
            return Err(MetricsError::Finished);
        }

        if timing.is_error() {
            self.metrics.error_count += 1;
        } else {
            self.metrics.frame_count += 1;
            self.metrics.latency_ms.observe(timing.total_ms);
            for (name, ms) in &timing.stages {
                self.metrics
                    .stages_ms
                    .entry(name.clone())
                    .or_default()
                    .observe(*ms);
            }
        }

        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(timing);
        Ok(())
    }

    pub fn observe_resource_sample(&mut self, sample: ResourceSample) -> Result<(), MetricsError> {
        if self.frozen.is_some() {
            return Err(MetricsError::Finished);
        }
        let res = &mut self.metrics.resources;
        if let Some(v) = sample.cpu_pct {
            res.cpu_pct.get_or_insert_with(Default::default).observe(v);
        }
        if let Some(v) = sample.mem_pct {
            res.mem_pct.get_or_insert_with(Default::default).observe(v);
        }
        if let Some(v) = sample.gpu_pct {
            res.gpu_pct.get_or_insert_with(Default::default).observe(v);
        }
        if let Some(v) = sample.gpu_temp_c {
            res.gpu_temp_c
                .get_or_insert_with(Default::default)
                .observe(v);
        }
        if let Some(v) = sample.power_w {
            res.power_w.get_or_insert_with(Default::default).observe(v);
        }
        Ok(())
    }

    /// Current metrics without stopping aggregation.
    pub fn snapshot(&self) -> RunMetrics {
        if let Some(frozen) = &self.frozen {
            return frozen.clone();
        }
        let mut m = self.metrics.clone();
        m.elapsed_seconds = self.started.elapsed().as_secs_f64();
        m
    }

    /// Mean total latency over the recent ring, for live display.
    pub fn recent_avg_latency_ms(&self) -> f64 {
        let ok: Vec<f64> = self
            .recent
            .iter()
            .filter(|t| !t.is_error())
            .map(|t| t.total_ms)
            .collect();
        if ok.is_empty() {
            0.0
        } else {
            ok.iter().sum::<f64>() / ok.len() as f64
        }
    }

    /// Freeze the metrics. Idempotent: the first call fixes the elapsed
    /// time, later calls return the same frozen value.
    pub fn finish(&mut self) -> RunMetrics {
        if self.frozen.is_none() {
            let mut m = self.metrics.clone();
            m.elapsed_seconds = self.started.elapsed().as_secs_f64();
            self.frozen = Some(m);
        }
        self.frozen.clone().unwrap()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry::FrameTimer;

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

    #[test]
    fn test_stat_accumulator_seeds_min_max() {
        let mut acc = StatAccumulator::default();
        acc.observe(5.0);
        assert_eq!(acc.min, 5.0);
        assert_eq!(acc.max, 5.0);
        acc.observe(2.0);
        acc.observe(9.0);
        assert_eq!(acc.min, 2.0);
        assert_eq!(acc.max, 9.0);
        assert!((acc.mean() - 16.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_frames_yields_zero_fps() {
        let mut agg = Aggregator::new();
        let m = agg.finish();
        assert_eq!(m.fps(), 0.0);
        assert_eq!(m.avg_latency_ms(), 0.0);
        assert!(m.stages_ms.is_empty());
        assert!(m.resources.cpu_pct.is_none());
        assert!(!m.fps().is_nan());
    }

    #[test]
    fn test_stage_means_cover_reporting_frames_only() {
        let mut agg = Aggregator::new();
        agg.observe(timing(0, &[("h2d", 2.0), ("compute", 10.0)], 13.0))
            .unwrap();
        agg.observe(timing(1, &[("compute", 20.0)], 21.0)).unwrap();

        let m = agg.snapshot();
        // h2d was reported by one frame, compute by two
        assert_eq!(m.stages_ms["h2d"].count, 1);
        assert_eq!(m.avg_stage_ms("h2d"), Some(2.0));
        assert_eq!(m.stages_ms["compute"].count, 2);
        assert_eq!(m.avg_stage_ms("compute"), Some(15.0));
        assert_eq!(m.avg_stage_ms("d2h"), None);
    }

    #[test]
    fn test_errored_frame_counts_as_error_not_fps() {
        let mut agg = Aggregator::new();
        agg.observe(timing(0, &[("compute", 10.0)], 11.0)).unwrap();

        let mut timer = FrameTimer::start(1);
        timer.begin_stage("compute").unwrap();
        timer.fail_stage("compute", "boom").unwrap();
        agg.observe(timer.finalize_frame().unwrap()).unwrap();

        let m = agg.snapshot();
        assert_eq!(m.frame_count, 1);
        assert_eq!(m.error_count, 1);
        assert_eq!(m.latency_ms.count, 1);
    }

    #[test]
    fn test_fps_uniform_latency() {
        let mut agg = Aggregator::new();
        for i in 0..100 {
            agg.observe(timing(i, &[("compute", 9.0)], 10.0)).unwrap();
        }
        let mut m = agg.finish();
        // fps derives from wall time; with elapsed forced to N * L the
        // derived rate is exactly 1/L
        m.elapsed_seconds = 100.0 * 0.010;
        assert!((m.fps() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_finish_idempotent() {
        let mut agg = Aggregator::new();
        agg.observe(timing(0, &[("compute", 5.0)], 6.0)).unwrap();
        let first = agg.finish();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = agg.finish();
        assert_eq!(first, second);
        assert_eq!(first.elapsed_seconds.to_bits(), second.elapsed_seconds.to_bits());
    }

    #[test]
    fn test_observe_after_finish_rejected() {
        let mut agg = Aggregator::new();
        agg.finish();
        assert!(matches!(
            agg.observe(timing(0, &[], 1.0)),
            Err(MetricsError::Finished)
        ));
        assert!(matches!(
            agg.observe_resource_sample(ResourceSample::default()),
            Err(MetricsError::Finished)
        ));
    }

    #[test]
    fn test_resource_samples_partial_fields() {
        let mut agg = Aggregator::new();
        agg.observe_resource_sample(ResourceSample {
            cpu_pct: Some(40.0),
            mem_pct: Some(60.0),
            ..Default::default()
        })
        .unwrap();
        agg.observe_resource_sample(ResourceSample {
            cpu_pct: Some(60.0),
            ..Default::default()
        })
        .unwrap();

        let m = agg.snapshot();
        assert_eq!(m.resources.cpu_pct.unwrap().mean(), 50.0);
        assert_eq!(m.resources.mem_pct.unwrap().count, 1);
        assert!(m.resources.power_w.is_none());
    }

    #[test]
    fn test_recent_ring_is_capped() {
        let mut agg = Aggregator::new();
        for i in 0..(RECENT_CAPACITY as u64 + 10) {
            agg.observe(timing(i, &[], 1.0)).unwrap();
        }
        assert!(agg.recent.len() <= RECENT_CAPACITY);
        assert!(agg.recent_avg_latency_ms() > 0.0);
    }
}
