pub mod encoded_image;
pub mod face_match;
pub mod frame_encoder;
pub mod recognition_service;
