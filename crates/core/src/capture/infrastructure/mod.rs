pub mod capture_error;
pub mod ffmpeg_capture_source;
pub mod still_image_source;
