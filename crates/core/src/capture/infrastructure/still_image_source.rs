use std::path::Path;

use crate::capture::domain::capture_source::CaptureSource;
use crate::capture::infrastructure::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// Adapts a single image file to the [`CaptureSource`] interface.
///
/// The image behaves like a feed that never changes: it is ready as soon
/// as it is loaded and pausing only flips a flag.
pub struct StillImageSource {
    frame: Frame,
    paused: bool,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let img = image::open(path)
            .map_err(|e| CaptureError::Image {
                path: path.to_path_buf(),
                source: e,
            })?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Self::from_frame(Frame::new(img.into_raw(), width, height, 3, 0)))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self {
            frame,
            paused: false,
        }
    }
}

impl CaptureSource for StillImageSource {
    fn is_ready(&self) -> bool {
        !self.frame.is_empty()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some(self.frame.dimensions())
    }

    fn current_frame(&self) -> Option<Frame> {
        Some(self.frame.clone())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
