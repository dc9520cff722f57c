use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::face_match::RecognitionResponse;
use crate::recognition::domain::recognition_service::{RecognitionService, ServiceError};
use crate::shared::constants::{ENROLL_PATH, RECOGNIZE_PATH, UPDATE_FACE_PATH};

#[derive(Error, Debug)]
pub enum RecognitionError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {message}")]
    Service {
        url: String,
        status: u16,
        message: String,
    },
    #[error("malformed response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Student details submitted alongside an enrollment photo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Enrollment {
    pub name: String,
    pub mobile: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EnrollmentResponse {
    pub message: String,
    /// Set when the name is already enrolled; the face was not replaced.
    #[serde(default)]
    pub student_exists: bool,
    #[serde(default)]
    pub faces_detected: Option<u32>,
    #[serde(default)]
    pub updated: bool,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: &'a str,
}

#[derive(Serialize)]
struct EnrollRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mobile: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    image: &'a str,
}

#[derive(Serialize)]
struct UpdateFaceRequest<'a> {
    name: &'a str,
    image: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// JSON-over-HTTP client for the face-recognition service.
///
/// Uses reqwest's blocking client, which is safe to share between the
/// request threads of the poll loop.
pub struct HttpRecognitionService {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpRecognitionService {
    /// `timeout` overrides the transport default request timeout.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, RecognitionError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(RecognitionError::Client)?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Registers a new face under `enrollment.name`.
    ///
    /// An existing name is not overwritten; the response reports
    /// `student_exists` and [`Self::update_face`] must be used instead.
    pub fn enroll(
        &self,
        enrollment: &Enrollment,
        image: &EncodedImage,
    ) -> Result<EnrollmentResponse, RecognitionError> {
        self.post(
            ENROLL_PATH,
            &EnrollRequest {
                name: &enrollment.name,
                mobile: enrollment.mobile.as_deref(),
                email: enrollment.email.as_deref(),
                image: image.as_data_url(),
            },
        )
    }

    /// Replaces the stored face of an already enrolled name.
    pub fn update_face(
        &self,
        name: &str,
        image: &EncodedImage,
    ) -> Result<EnrollmentResponse, RecognitionError> {
        self.post(
            UPDATE_FACE_PATH,
            &UpdateFaceRequest {
                name,
                image: image.as_data_url(),
            },
        )
    }

    pub fn recognize_image(
        &self,
        image: &EncodedImage,
    ) -> Result<RecognitionResponse, RecognitionError> {
        self.post(
            RECOGNIZE_PATH,
            &RecognizeRequest {
                image: image.as_data_url(),
            },
        )
    }

    fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, RecognitionError> {
        let url = format!("{}{}", self.endpoint, path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| RecognitionError::Transport {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        let text = response.text().map_err(|e| RecognitionError::Transport {
            url: url.clone(),
            source: e,
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| text.trim().to_string());
            return Err(RecognitionError::Service {
                url,
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| RecognitionError::MalformedResponse { url, source: e })
    }
}

impl RecognitionService for HttpRecognitionService {
    fn recognize(&self, image: &EncodedImage) -> Result<RecognitionResponse, ServiceError> {
        Ok(self.recognize_image(image)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use crossbeam_channel::Receiver;

    struct CapturedRequest {
        request_line: String,
        body: serde_json::Value,
    }

    /// Serves exactly one canned HTTP response on a random local port.
    fn serve_once(status: &str, body: &str) -> (String, Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = crossbeam_channel::bounded(1);
        let status = status.to_string();
        let body = body.to_string();

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            let _ = tx.send(request);
        });

        (endpoint, rx)
    }

    fn read_request(stream: &mut TcpStream) -> CapturedRequest {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                if key.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).unwrap();
        CapturedRequest {
            request_line: request_line.trim_end().to_string(),
            body: serde_json::from_slice(&body).unwrap(),
        }
    }

    fn image() -> EncodedImage {
        EncodedImage::new("data:image/jpeg;base64,QUJD".to_string(), 2, 2)
    }

    #[test]
    fn test_recognize_posts_data_url_and_parses_faces() {
        let (endpoint, requests) =
            serve_once("200 OK", r#"{"faces": [{"name": "Alice", "bbox": [1, 2, 3, 4], "time": "10:00:00"}]}"#);
        let service = HttpRecognitionService::new(&endpoint, None).unwrap();

        let response = service.recognize(&image()).unwrap();

        assert_eq!(response.recognized_name("Unknown"), Some("Alice"));
        let request = requests.recv().unwrap();
        assert_eq!(request.request_line, "POST /recognize HTTP/1.1");
        assert_eq!(request.body["image"], "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn test_error_body_maps_to_service_error() {
        let (endpoint, _requests) =
            serve_once("400 BAD REQUEST", r#"{"error": "No face detected"}"#);
        let service = HttpRecognitionService::new(&endpoint, None).unwrap();

        let err = service.recognize_image(&image()).unwrap_err();

        match err {
            RecognitionError::Service {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "No face detected");
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_json_error_body_is_kept_verbatim() {
        let (endpoint, _requests) = serve_once("500 INTERNAL SERVER ERROR", "boom\n");
        let service = HttpRecognitionService::new(&endpoint, None).unwrap();

        let err = service.recognize_image(&image()).unwrap_err();

        assert!(matches!(
            err,
            RecognitionError::Service { status: 500, ref message, .. } if message == "boom"
        ));
    }

    #[test]
    fn test_malformed_success_body() {
        let (endpoint, _requests) = serve_once("200 OK", "not json");
        let service = HttpRecognitionService::new(&endpoint, None).unwrap();

        let err = service.recognize_image(&image()).unwrap_err();

        assert!(matches!(err, RecognitionError::MalformedResponse { .. }));
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let service = HttpRecognitionService::new(&endpoint, None).unwrap();

        let err = service.recognize_image(&image()).unwrap_err();

        assert!(matches!(err, RecognitionError::Transport { .. }));
    }

    #[test]
    fn test_enroll_sends_optional_fields_only_when_present() {
        let (endpoint, requests) = serve_once(
            "200 OK",
            r#"{"message": "User 'Alice' enrolled successfully.", "faces_detected": 1, "updated": false}"#,
        );
        let service = HttpRecognitionService::new(&format!("{endpoint}/"), None).unwrap();
        let enrollment = Enrollment {
            name: "Alice".to_string(),
            mobile: None,
            email: Some("alice@example.com".to_string()),
        };

        let response = service.enroll(&enrollment, &image()).unwrap();

        assert_eq!(response.faces_detected, Some(1));
        assert!(!response.student_exists);
        let request = requests.recv().unwrap();
        assert_eq!(request.request_line, "POST /enroll HTTP/1.1");
        assert_eq!(request.body["name"], "Alice");
        assert_eq!(request.body["email"], "alice@example.com");
        assert!(request.body.get("mobile").is_none());
    }

    #[test]
    fn test_enroll_existing_student_is_reported() {
        let (endpoint, _requests) = serve_once(
            "200 OK",
            r#"{"message": "Student 'Alice' already exists. Do you want to update facial data?", "student_exists": true}"#,
        );
        let service = HttpRecognitionService::new(&endpoint, None).unwrap();

        let response = service
            .enroll(
                &Enrollment {
                    name: "Alice".to_string(),
                    ..Default::default()
                },
                &image(),
            )
            .unwrap();

        assert!(response.student_exists);
        assert!(!response.updated);
    }

    #[test]
    fn test_update_face_posts_name_and_image() {
        let (endpoint, requests) = serve_once(
            "200 OK",
            r#"{"message": "Facial data for student 'Alice' updated successfully.", "updated": true}"#,
        );
        let service = HttpRecognitionService::new(&endpoint, None).unwrap();

        let response = service.update_face("Alice", &image()).unwrap();

        assert!(response.updated);
        let request = requests.recv().unwrap();
        assert_eq!(request.request_line, "POST /update-face HTTP/1.1");
        assert_eq!(request.body["name"], "Alice");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let service = HttpRecognitionService::new("http://localhost:5000/", None).unwrap();
        assert_eq!(service.endpoint(), "http://localhost:5000");
    }
}
