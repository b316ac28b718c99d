use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    RGB8,
    GRAY8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::RGB8 => 3,
            PixelFormat::GRAY8 => 1,
        }
    }
}

/// Frame metadata carried alongside the pixel buffer through every stage
#[derive(Clone, Copy, Debug)]
pub struct FrameMeta {
    pub source_id: u32,
    pub width: u32,
    pub height: u32,
    pub pixfmt: PixelFormat,
    pub frame_idx: u64,
    pub t_capture_ns: u64,
}

/// One frame travelling through the measurement loop.
///
/// The buffer is shared rather than copied between stages; a stage that
/// needs to mutate pixels clones the underlying Vec first.
#[derive(Clone, Debug)]
pub struct FramePacket {
    pub meta: FrameMeta,
    pub data: Arc<Vec<u8>>,
}

impl FramePacket {
    pub fn new(meta: FrameMeta, data: Vec<u8>) -> Self {
        Self {
            meta,
            data: Arc::new(data),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Expected buffer length for the frame dimensions and pixel format
    pub fn expected_len(&self) -> usize {
        self.meta.width as usize * self.meta.height as usize * self.meta.pixfmt.bytes_per_pixel()
    }
}

pub trait Stage<I, O> {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
    fn process(&mut self, input: I) -> O;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_len_matches_format() {
        let meta = FrameMeta {
            source_id: 0,
            width: 4,
            height: 2,
            pixfmt: PixelFormat::RGB8,
            frame_idx: 0,
            t_capture_ns: 0,
        };
        let packet = FramePacket::new(meta, vec![0u8; 24]);
        assert_eq!(packet.expected_len(), 24);
        assert_eq!(packet.as_slice().len(), 24);
    }

    #[test]
    fn test_clone_shares_buffer() {
        let meta = FrameMeta {
            source_id: 0,
            width: 1,
            height: 1,
            pixfmt: PixelFormat::GRAY8,
            frame_idx: 7,
            t_capture_ns: 0,
        };
        let packet = FramePacket::new(meta, vec![42]);
        let copy = packet.clone();
        assert!(Arc::ptr_eq(&packet.data, &copy.data));
        assert_eq!(copy.meta.frame_idx, 7);
    }
}
