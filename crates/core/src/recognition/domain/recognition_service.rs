use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::face_match::RecognitionResponse;

/// Error type for operations whose failures cross thread boundaries.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Domain interface for the remote face-recognition service.
///
/// Shared across request threads, so implementations take `&self` and
/// must be `Sync`.
pub trait RecognitionService: Send + Sync {
    fn recognize(&self, image: &EncodedImage) -> Result<RecognitionResponse, ServiceError>;
}
