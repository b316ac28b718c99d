//! Frame suppliers for the measurement loop.
//!
//! A source hands out frames one at a time until its bounded sequence is
//! exhausted. The image-directory source can loop, matching the original
//! behavior of rewinding the test video when it runs out; the synthetic
//! source generates frames forever and is bounded only by the run budget.

use std::fs;
use std::path::{Path, PathBuf};

use common_io::{FrameMeta, FramePacket, PixelFormat};
use telemetry::now_ns;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read frame directory '{path}': {source}")]
    Dir {
        path: String,
        source: std::io::Error,
    },
    #[error("no decodable images in '{0}'")]
    EmptyDir(String),
    #[error("failed to decode '{path}': {source}")]
    Decode {
        path: String,
        source: image::ImageError,
    },
}

pub trait FrameSource {
    fn name(&self) -> &'static str;
    /// Next frame, or `Ok(None)` once the bounded sequence is exhausted.
    fn next_frame(&mut self) -> Result<Option<FramePacket>, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticPattern {
    Gradient,
    Checker,
}

/// Generates frames without touching the disk. The pattern shifts per
/// frame so downstream checksums see changing data.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    pattern: SyntheticPattern,
    frame_idx: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, pattern: SyntheticPattern) -> Self {
        Self {
            width,
            height,
            pattern,
            frame_idx: 0,
        }
    }

    fn fill(&self, buf: &mut Vec<u8>) {
        let shift = (self.frame_idx % 256) as u8;
        for y in 0..self.height {
            for x in 0..self.width {
                let (r, g, b) = match self.pattern {
                    SyntheticPattern::Gradient => (
                        (x * 255 / self.width.max(1)) as u8,
                        (y * 255 / self.height.max(1)) as u8,
                        shift,
                    ),
                    SyntheticPattern::Checker => {
                        let cell = ((x / 32 + y / 32) % 2) as u8 * 255;
                        (cell, cell.wrapping_add(shift), cell)
                    }
                };
                buf.push(r);
                buf.push(g);
                buf.push(b);
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn next_frame(&mut self) -> Result<Option<FramePacket>, SourceError> {
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        self.fill(&mut data);

        let meta = FrameMeta {
            source_id: 0,
            width: self.width,
            height: self.height,
            pixfmt: PixelFormat::RGB8,
            frame_idx: self.frame_idx,
            t_capture_ns: now_ns(),
        };
        self.frame_idx += 1;
        Ok(Some(FramePacket::new(meta, data)))
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Reads a sorted directory of still images as the frame sequence.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
    frame_idx: u64,
}

impl ImageDirSource {
    pub fn open(dir: &Path, looping: bool) -> Result<Self, SourceError> {
        let entries = fs::read_dir(dir).map_err(|source| SourceError::Dir {
            path: dir.display().to_string(),
            source,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::EmptyDir(dir.display().to_string()));
        }

        Ok(Self {
            paths,
            cursor: 0,
            looping,
            frame_idx: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &'static str {
        "image_dir"
    }

    fn next_frame(&mut self) -> Result<Option<FramePacket>, SourceError> {
        if self.cursor >= self.paths.len() {
            if !self.looping {
                return Ok(None);
            }
            self.cursor = 0;
        }

        let path = &self.paths[self.cursor];
        let img = image::open(path)
            .map_err(|source| SourceError::Decode {
                path: path.display().to_string(),
                source,
            })?
            .to_rgb8();

        let meta = FrameMeta {
            source_id: 0,
            width: img.width(),
            height: img.height(),
            pixfmt: PixelFormat::RGB8,
            frame_idx: self.frame_idx,
            t_capture_ns: now_ns(),
        };

        self.cursor += 1;
        self.frame_idx += 1;
        Ok(Some(FramePacket::new(meta, img.into_raw())))
    }
}
