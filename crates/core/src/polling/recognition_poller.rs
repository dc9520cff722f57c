use std::time::Instant;

use crate::capture::domain::capture_source::CaptureSource;
use crate::notification::domain::notifier::Notifier;
use crate::polling::poll_logger::PollLogger;
use crate::polling::poller_state::{transition, Action, DetectionRules, PollerEvent, PollerState};
use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::face_match::RecognitionResponse;
use crate::recognition::domain::frame_encoder::FrameEncoder;
use crate::recognition::domain::recognition_service::{RecognitionService, ServiceError};

/// Samples the capture source, interprets recognition results and drives
/// the pause/notify/resume cycle.
///
/// The poller owns every piece of mutable state in the cycle and is only
/// ever touched by one thread at a time. Sampling and result handling are
/// separate steps so a runtime can keep requests in flight while the next
/// tick fires; [`RecognitionPoller::poll`] chains them for callers that
/// are happy to block.
pub struct RecognitionPoller {
    capture: Box<dyn CaptureSource>,
    notifier: Box<dyn Notifier>,
    logger: Box<dyn PollLogger>,
    rules: DetectionRules,
    state: PollerState,
}

impl RecognitionPoller {
    pub fn new(
        capture: Box<dyn CaptureSource>,
        notifier: Box<dyn Notifier>,
        logger: Box<dyn PollLogger>,
        rules: DetectionRules,
    ) -> Self {
        Self {
            capture,
            notifier,
            logger,
            rules,
            state: PollerState::Idle,
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    /// Whether the detection notification is currently visible.
    pub fn is_notifying(&self) -> bool {
        matches!(self.state, PollerState::Detected { .. })
    }

    pub fn detected_name(&self) -> Option<&str> {
        match &self.state {
            PollerState::Detected { event, .. } => Some(event.name()),
            PollerState::Idle => None,
        }
    }

    /// When the visible detection expires, if one is visible.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            PollerState::Detected { until, .. } => Some(*until),
            PollerState::Idle => None,
        }
    }

    /// First half of a poll tick: grab and encode the current frame.
    ///
    /// Returns `None` when the tick is skipped, i.e. the capture source has
    /// no usable frame yet or encoding failed. No request may be sent then.
    pub fn sample(&mut self, encoder: &dyn FrameEncoder) -> Option<EncodedImage> {
        self.logger.tick();

        let frame = match self.capture.current_frame() {
            Some(frame) if self.capture.is_ready() => frame,
            _ => {
                log::debug!("Capture source not ready, skipping tick");
                self.logger.skipped();
                return None;
            }
        };

        match encoder.encode(&frame) {
            Ok(image) => {
                self.logger.request_sent();
                Some(image)
            }
            Err(e) => {
                log::warn!("Failed to encode frame {}: {e}", frame.index());
                self.logger.request_failed();
                None
            }
        }
    }

    /// Second half of a poll tick: apply the service's answer.
    ///
    /// Failures are logged and otherwise leave the state untouched.
    pub fn handle_outcome(
        &mut self,
        outcome: Result<RecognitionResponse, ServiceError>,
        now: Instant,
    ) {
        match outcome {
            Ok(response) => {
                if self.is_notifying() && !response.faces.is_empty() {
                    log::debug!("Detection on screen, ignoring {} face(s)", response.faces.len());
                }
                self.apply(PollerEvent::Recognized(&response, now));
            }
            Err(e) => {
                log::warn!("Recognition error: {e}");
                self.logger.request_failed();
                self.apply(PollerEvent::RequestFailed);
            }
        }
    }

    /// Hides the notification and resumes the feed once the display
    /// duration has passed. Earlier calls are no-ops.
    pub fn expire(&mut self, now: Instant) {
        self.apply(PollerEvent::DisplayElapsed(now));
    }

    /// Runs one complete poll tick, blocking on the service.
    ///
    /// Returns whether a request was sent.
    pub fn poll(&mut self, service: &dyn RecognitionService, encoder: &dyn FrameEncoder) -> bool {
        let Some(image) = self.sample(encoder) else {
            return false;
        };
        let outcome = service.recognize(&image);
        self.handle_outcome(outcome, Instant::now());
        true
    }

    /// Clears a visible detection right away, hiding the notification and
    /// resuming the feed. Used on teardown so nothing stays paused or drawn.
    pub fn dismiss(&mut self) {
        if let PollerState::Detected { event, .. } =
            std::mem::replace(&mut self.state, PollerState::Idle)
        {
            log::debug!("Dismissing detection of {}", event.name());
            self.notifier.hide();
            self.capture.play();
        }
    }

    pub fn summary(&self) {
        self.logger.summary();
    }

    fn apply(&mut self, event: PollerEvent<'_>) {
        let state = std::mem::replace(&mut self.state, PollerState::Idle);
        let (next, action) = transition(state, event, &self.rules);
        self.state = next;

        match action {
            Action::None => {}
            Action::PauseAndNotify(event) => {
                self.capture.pause();
                self.logger.detection(event.name());
                self.notifier.show(&event);
            }
            Action::HideAndResume => {
                self.notifier.hide();
                self.capture.play();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use crate::capture::domain::capture_source::CaptureSource;
    use crate::notification::domain::notifier::{DetectionEvent, Notifier};
    use crate::recognition::domain::encoded_image::EncodedImage;
    use crate::recognition::domain::face_match::{FaceMatch, RecognitionResponse};
    use crate::recognition::domain::frame_encoder::FrameEncoder;
    use crate::recognition::domain::recognition_service::{RecognitionService, ServiceError};
    use crate::shared::frame::Frame;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Call {
        Pause,
        Play,
        Show(String),
        Hide,
    }

    pub type CallLog = Arc<Mutex<Vec<Call>>>;

    pub struct FakeCapture {
        pub ready: bool,
        pub paused: bool,
        pub calls: CallLog,
    }

    impl CaptureSource for FakeCapture {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn dimensions(&self) -> Option<(u32, u32)> {
            self.ready.then_some((4, 4))
        }

        fn current_frame(&self) -> Option<Frame> {
            self.ready
                .then(|| Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, 0))
        }

        fn pause(&mut self) {
            self.paused = true;
            self.calls.lock().unwrap().push(Call::Pause);
        }

        fn play(&mut self) {
            self.paused = false;
            self.calls.lock().unwrap().push(Call::Play);
        }

        fn is_paused(&self) -> bool {
            self.paused
        }
    }

    pub struct RecordingNotifier {
        pub calls: CallLog,
    }

    impl Notifier for RecordingNotifier {
        fn show(&mut self, event: &DetectionEvent) {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Show(event.name().to_string()));
        }

        fn hide(&mut self) {
            self.calls.lock().unwrap().push(Call::Hide);
        }
    }

    pub struct StubEncoder;

    impl FrameEncoder for StubEncoder {
        fn encode(&self, frame: &Frame) -> Result<EncodedImage, ServiceError> {
            Ok(EncodedImage::new(
                "data:image/jpeg;base64,AA==".to_string(),
                frame.width(),
                frame.height(),
            ))
        }
    }

    pub struct FailingEncoder;

    impl FrameEncoder for FailingEncoder {
        fn encode(&self, _frame: &Frame) -> Result<EncodedImage, ServiceError> {
            Err("encoder broke".into())
        }
    }

    /// Answers with a fixed list of names, or fails when `names` is `None`.
    pub struct StubService {
        pub names: Option<Vec<String>>,
        pub requests: Arc<Mutex<usize>>,
    }

    impl StubService {
        pub fn answering(names: &[&str]) -> Self {
            Self {
                names: Some(names.iter().map(|n| n.to_string()).collect()),
                requests: Arc::new(Mutex::new(0)),
            }
        }

        pub fn failing() -> Self {
            Self {
                names: None,
                requests: Arc::new(Mutex::new(0)),
            }
        }

        pub fn request_count(&self) -> usize {
            *self.requests.lock().unwrap()
        }
    }

    impl RecognitionService for StubService {
        fn recognize(&self, _image: &EncodedImage) -> Result<RecognitionResponse, ServiceError> {
            *self.requests.lock().unwrap() += 1;
            match &self.names {
                Some(names) => Ok(RecognitionResponse::new(
                    names.iter().map(|n| FaceMatch::named(n.as_str())).collect(),
                )),
                None => Err("connection refused".into()),
            }
        }
    }
}
