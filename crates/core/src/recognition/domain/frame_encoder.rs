use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::recognition_service::ServiceError;
use crate::shared::frame::Frame;

/// Turns a captured frame into the still image submitted for recognition.
pub trait FrameEncoder: Send {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, ServiceError>;
}
