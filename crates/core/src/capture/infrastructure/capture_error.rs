use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture input {input}: {source}")]
    Open {
        input: String,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("unknown capture input format '{0}'")]
    UnknownFormat(String),
    #[error("no video stream found in {0}")]
    NoVideoStream(String),
    #[error("failed to set up decoder: {0}")]
    Decoder(#[from] ffmpeg_next::Error),
    #[error("capture thread exited before producing stream info")]
    DecoderExited,
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
