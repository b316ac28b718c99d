//! Synthetic per-frame workload.
//!
//! Stands in for the inference backend: each configured stage validates
//! the frame, touches every pixel, then holds the stage for its
//! configured busy time. A real backend plugs in at the same
//! `Stage<FramePacket, ...>` seam.

use std::time::Duration;

use common_io::{FramePacket, Stage};
use config::StageConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("frame {frame_idx} buffer is {got} bytes, expected {expected}")]
    BadFrame {
        frame_idx: u64,
        got: usize,
        expected: usize,
    },
}

pub struct SyntheticStage {
    pub name: String,
    busy: Duration,
}

impl SyntheticStage {
    pub fn new(cfg: &StageConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            busy: Duration::from_secs_f64(cfg.busy_ms / 1000.0),
        }
    }
}

impl Stage<FramePacket, Result<FramePacket, WorkloadError>> for SyntheticStage {
    fn process(&mut self, input: FramePacket) -> Result<FramePacket, WorkloadError> {
        let expected = input.expected_len();
        let got = input.as_slice().len();
        if got != expected {
            return Err(WorkloadError::BadFrame {
                frame_idx: input.meta.frame_idx,
                got,
                expected,
            });
        }

        // Touch the whole buffer so the stage actually reads the frame
        let mut acc: u64 = 0;
        for byte in input.as_slice() {
            acc = acc.wrapping_add(*byte as u64);
        }
        std::hint::black_box(acc);

        if !self.busy.is_zero() {
            std::thread::sleep(self.busy);
        }
        Ok(input)
    }
}

/// The ordered stage chain for one platform profile.
pub struct Workload {
    pub stages: Vec<SyntheticStage>,
}

impl Workload {
    pub fn from_config(stages: &[StageConfig]) -> Self {
        Self {
            stages: stages.iter().map(SyntheticStage::new).collect(),
        }
    }
}
