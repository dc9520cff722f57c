use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
pub const RECOGNIZE_PATH: &str = "/recognize";
pub const ENROLL_PATH: &str = "/enroll";
pub const UPDATE_FACE_PATH: &str = "/update-face";

/// Name the recognition service reports for a face it could not match.
pub const UNKNOWN_NAME: &str = "Unknown";

pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// How long a detection stays on screen with the feed paused.
pub const DISPLAY_DURATION: Duration = Duration::from_millis(1000);

pub const DEFAULT_JPEG_QUALITY: u8 = 92;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
