use std::time::{Duration, Instant};

use crate::notification::domain::notifier::DetectionEvent;
use crate::recognition::domain::face_match::RecognitionResponse;
use crate::shared::constants::{DISPLAY_DURATION, UNKNOWN_NAME};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollerState {
    /// Feed playing, notification hidden.
    Idle,
    /// Feed paused, notification visible until `until`.
    Detected {
        event: DetectionEvent,
        until: Instant,
    },
}

#[derive(Clone, Copy, Debug)]
pub enum PollerEvent<'a> {
    Recognized(&'a RecognitionResponse, Instant),
    RequestFailed,
    DisplayElapsed(Instant),
}

/// Side effect the poller must carry out after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    None,
    PauseAndNotify(DetectionEvent),
    HideAndResume,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionRules {
    /// Face name the service uses for "not recognized".
    pub unknown_name: String,
    pub display_duration: Duration,
}

impl DetectionRules {
    pub fn new(unknown_name: impl Into<String>, display_duration: Duration) -> Self {
        Self {
            unknown_name: unknown_name.into(),
            display_duration,
        }
    }
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self::new(UNKNOWN_NAME, DISPLAY_DURATION)
    }
}

pub fn transition(
    state: PollerState,
    event: PollerEvent<'_>,
    rules: &DetectionRules,
) -> (PollerState, Action) {
    match (state, event) {
        (PollerState::Idle, PollerEvent::Recognized(response, now)) => {
            match response.recognized_name(&rules.unknown_name) {
                Some(name) => {
                    let event = DetectionEvent::new(name, now);
                    (
                        PollerState::Detected {
                            event: event.clone(),
                            until: now + rules.display_duration,
                        },
                        Action::PauseAndNotify(event),
                    )
                }
                None => (PollerState::Idle, Action::None),
            }
        }
        (PollerState::Detected { until, .. }, PollerEvent::DisplayElapsed(now)) if now >= until => {
            (PollerState::Idle, Action::HideAndResume)
        }
        // A detection is already on screen; results are ignored until it expires.
        (state, _) => (state, Action::None),
    }
}
