use crate::shared::frame::Frame;

/// Domain interface over a live video feed.
///
/// The poller samples the feed on demand and pauses it while a detection
/// is on screen. How frames arrive (device, file, network stream) is an
/// infrastructure concern.
pub trait CaptureSource: Send {
    /// Whether enough data is buffered to produce a valid frame.
    fn is_ready(&self) -> bool;

    /// Dimensions of the current frame, or `None` before the first one.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Snapshot of the frame currently on display.
    ///
    /// While paused this keeps returning the frame shown at pause time.
    fn current_frame(&self) -> Option<Frame>;

    /// Freezes the visible feed.
    fn pause(&mut self);

    /// Resumes the visible feed.
    fn play(&mut self);

    fn is_paused(&self) -> bool;
}
