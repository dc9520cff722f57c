pub mod http_recognition_service;
pub mod jpeg_frame_encoder;
