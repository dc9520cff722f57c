use std::time::Instant;

/// A recognized face, alive for one notification cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionEvent {
    name: String,
    detected_at: Instant,
}

impl DetectionEvent {
    pub fn new(name: impl Into<String>, detected_at: Instant) -> Self {
        Self {
            name: name.into(),
            detected_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detected_at(&self) -> Instant {
        self.detected_at
    }
}

/// User-facing surface for detections.
///
/// `show` and `hide` always alternate: the poller never shows a second
/// event before hiding the first.
pub trait Notifier: Send {
    fn show(&mut self, event: &DetectionEvent);
    fn hide(&mut self);
}

/// Notifier that discards all events. Used where nothing is displayed.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn show(&mut self, _event: &DetectionEvent) {}
    fn hide(&mut self) {}
}
