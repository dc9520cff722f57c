use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::frame_encoder::FrameEncoder;
use crate::recognition::domain::recognition_service::ServiceError;
use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("cannot encode an empty frame")]
    EmptyFrame,
    #[error("unsupported channel count {0} (expected 1 or 3)")]
    UnsupportedChannels(u8),
    #[error("JPEG encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Encodes frames as base64 JPEG data URLs using the `image` crate.
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    fn encode_jpeg(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        if frame.is_empty() {
            return Err(EncodeError::EmptyFrame);
        }
        let color_type = match frame.channels() {
            1 => image::ExtendedColorType::L8,
            3 => image::ExtendedColorType::Rgb8,
            other => return Err(EncodeError::UnsupportedChannels(other)),
        };

        let mut bytes = Vec::new();
        {
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, self.quality);
            encoder.encode(frame.data(), frame.width(), frame.height(), color_type)?;
        }
        Ok(bytes)
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, ServiceError> {
        let jpeg = self.encode_jpeg(frame)?;
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg));
        Ok(EncodedImage::new(data_url, frame.width(), frame.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![128u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn decode(image: &EncodedImage) -> image::DynamicImage {
        let bytes = STANDARD.decode(image.payload().unwrap()).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_produces_jpeg_data_url() {
        let encoder = JpegFrameEncoder::default();
        let image = encoder.encode(&solid_frame(32, 24)).unwrap();

        assert!(image.as_data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.mime_type(), Some("image/jpeg"));
        assert_eq!((image.width(), image.height()), (32, 24));
    }

    #[test]
    fn test_payload_decodes_to_frame_dimensions() {
        let encoder = JpegFrameEncoder::new(80);
        let image = encoder.encode(&solid_frame(40, 30)).unwrap();

        let decoded = decode(&image);
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
    }

    #[test]
    fn test_grayscale_frame_is_supported() {
        let frame = Frame::new(vec![200u8; 16 * 16], 16, 16, 1, 0);
        let image = JpegFrameEncoder::default().encode(&frame).unwrap();
        assert_eq!(decode(&image).width(), 16);
    }

    #[test]
    fn test_rgba_frame_is_rejected() {
        let frame = Frame::new(vec![0u8; 4 * 4 * 4], 4, 4, 4, 0);
        let err = JpegFrameEncoder::default().encode(&frame).unwrap_err();
        assert!(err.to_string().contains("unsupported channel count 4"));
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        assert!(JpegFrameEncoder::default().encode(&frame).is_err());
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(JpegFrameEncoder::new(0).quality(), 1);
        assert_eq!(JpegFrameEncoder::new(255).quality(), 100);
    }
}
