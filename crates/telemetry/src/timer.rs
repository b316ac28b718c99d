// timer.rs - Per-frame stage timing
use crate::{now_ns, record_ms, since_ms};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("stage '{0}' was begun but never ended")]
    IncompleteFrame(String),
    #[error("stage '{0}' ended without a matching begin")]
    StageNotOpen(String),
    #[error("stage '{0}' begun while '{1}' is still open")]
    StageAlreadyOpen(String, String),
}

/// Finalized timing for one processing attempt of one frame.
///
/// Stage durations are milliseconds and keep the order in which the
/// stages ran. `total_ms` is the measured wall-clock span of the whole
/// frame; stages need not account for all of it.
#[derive(Debug, Clone)]
pub struct FrameTiming {
    pub frame_idx: u64,
    pub stages: Vec<(String, f64)>,
    pub total_ms: f64,
    pub completed_ns: u64,
    pub error: Option<String>,
}

impl FrameTiming {
    pub fn stage_ms(&self, name: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ms)| *ms)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Measures the named stages of a single frame.
///
/// One timer per frame; it holds no cross-frame state. Stages run
/// sequentially, so at most one stage is open at a time.
pub struct FrameTimer {
    frame_idx: u64,
    start_ns: u64,
    open: Option<(String, u64)>,
    stages: Vec<(String, f64)>,
    error: Option<String>,
}

impl FrameTimer {
    pub fn start(frame_idx: u64) -> Self {
        Self {
            frame_idx,
            start_ns: now_ns(),
            open: None,
            stages: Vec::new(),
            error: None,
        }
    }

    pub fn begin_stage(&mut self, name: &str) -> Result<(), TimerError> {
        if let Some((open, _)) = &self.open {
            return Err(TimerError::StageAlreadyOpen(name.to_string(), open.clone()));
        }
        self.open = Some((name.to_string(), now_ns()));
        Ok(())
    }

    pub fn end_stage(&mut self, name: &str) -> Result<(), TimerError> {
        match self.open.take() {
            Some((open, t0)) if open == name => {
                let ms = since_ms(t0);
                record_ms(name, t0);
                self.stages.push((open, ms));
                Ok(())
            }
            other => {
                self.open = other;
                Err(TimerError::StageNotOpen(name.to_string()))
            }
        }
    }

    /// Close the open stage after its body failed.
    ///
    /// The duration up to the failure point is still recorded; the frame
    /// carries an error marker and is excluded from FPS-contributing
    /// counts downstream.
    pub fn fail_stage(&mut self, name: &str, err: &str) -> Result<(), TimerError> {
        match self.open.take() {
            Some((open, t0)) if open == name => {
                let ms = since_ms(t0);
                self.stages.push((open, ms));
                self.error = Some(format!("{name}: {err}"));
                Ok(())
            }
            other => {
                self.open = other;
                Err(TimerError::StageNotOpen(name.to_string()))
            }
        }
    }

    pub fn finalize_frame(self) -> Result<FrameTiming, TimerError> {
        if let Some((open, _)) = self.open {
            return Err(TimerError::IncompleteFrame(open));
        }
        Ok(FrameTiming {
            frame_idx: self.frame_idx,
            stages: self.stages,
            total_ms: since_ms(self.start_ns),
            completed_ns: now_ns(),
            error: self.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_stages_match_begun_and_ended() {
        let mut timer = FrameTimer::start(3);
        timer.begin_stage("h2d").unwrap();
        thread::sleep(Duration::from_millis(1));
        timer.end_stage("h2d").unwrap();
        timer.begin_stage("compute").unwrap();
        thread::sleep(Duration::from_millis(2));
        timer.end_stage("compute").unwrap();

        let timing = timer.finalize_frame().unwrap();
        assert_eq!(timing.frame_idx, 3);
        assert_eq!(timing.stages.len(), 2);
        assert_eq!(timing.stages[0].0, "h2d");
        assert_eq!(timing.stages[1].0, "compute");
        assert!(timing.stage_ms("h2d").unwrap() > 0.0);
        assert!(timing.stage_ms("d2h").is_none());
        assert!(!timing.is_error());
    }

    #[test]
    fn test_total_covers_stage_sum() {
        let mut timer = FrameTimer::start(0);
        timer.begin_stage("compute").unwrap();
        thread::sleep(Duration::from_millis(2));
        timer.end_stage("compute").unwrap();
        let timing = timer.finalize_frame().unwrap();

        let stage_sum: f64 = timing.stages.iter().map(|(_, ms)| ms).sum();
        assert!(timing.total_ms >= stage_sum);
    }

    #[test]
    fn test_unended_stage_fails_finalize() {
        let mut timer = FrameTimer::start(0);
        timer.begin_stage("compute").unwrap();
        match timer.finalize_frame() {
            Err(TimerError::IncompleteFrame(name)) => assert_eq!(name, "compute"),
            other => panic!("expected IncompleteFrame, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_end_without_begin() {
        let mut timer = FrameTimer::start(0);
        assert!(matches!(
            timer.end_stage("compute"),
            Err(TimerError::StageNotOpen(_))
        ));
    }

    #[test]
    fn test_nested_begin_rejected() {
        let mut timer = FrameTimer::start(0);
        timer.begin_stage("compute").unwrap();
        assert!(matches!(
            timer.begin_stage("sync"),
            Err(TimerError::StageAlreadyOpen(_, _))
        ));
    }

    #[test]
    fn test_failed_stage_records_partial_duration() {
        let mut timer = FrameTimer::start(0);
        timer.begin_stage("compute").unwrap();
        thread::sleep(Duration::from_millis(1));
        timer.fail_stage("compute", "backend exploded").unwrap();
        let timing = timer.finalize_frame().unwrap();

        assert!(timing.is_error());
        assert!(timing.stage_ms("compute").unwrap() > 0.0);
        assert!(timing.error.unwrap().contains("backend exploded"));
    }
}
