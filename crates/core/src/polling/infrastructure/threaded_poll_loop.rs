use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::polling::recognition_poller::RecognitionPoller;
use crate::recognition::domain::encoded_image::EncodedImage;
use crate::recognition::domain::face_match::RecognitionResponse;
use crate::recognition::domain::frame_encoder::FrameEncoder;
use crate::recognition::domain::recognition_service::{RecognitionService, ServiceError};
use crate::shared::constants::POLL_INTERVAL;

type Outcome = Result<RecognitionResponse, ServiceError>;

/// Runs a [`RecognitionPoller`] on a dedicated thread.
///
/// Layout: `loop thread [tick → sample] → request thread per tick → loop thread [apply]`
///
/// The loop thread owns the poller and is the only place its state changes.
/// Each tick's request runs on its own thread, so ticks keep a fixed cadence
/// regardless of how long the service takes, and overlapping requests never
/// wait on each other.
pub struct ThreadedPollLoop {
    interval: Duration,
}

impl ThreadedPollLoop {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts polling. The first tick fires one interval from now.
    pub fn spawn(
        &self,
        poller: RecognitionPoller,
        service: Arc<dyn RecognitionService>,
        encoder: Box<dyn FrameEncoder>,
    ) -> PollerHandle {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let interval = self.interval;
        let thread = thread::spawn(move || run_loop(poller, service, encoder, interval, stop_rx));

        PollerHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

impl Default for ThreadedPollLoop {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}

/// Owned handle to a running poll loop.
///
/// Stopping (explicitly or by dropping the handle) ends the loop and joins
/// its thread. Requests still in flight are left to finish on their own;
/// their results are discarded.
pub struct PollerHandle {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<RecognitionPoller>>,
}

impl PollerHandle {
    /// Stops the loop and hands the poller back, e.g. for a final summary.
    pub fn stop(mut self) -> Result<RecognitionPoller, Box<dyn std::error::Error>> {
        self.shutdown()
            .ok_or_else(|| "Poll loop thread panicked".into())
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    fn shutdown(&mut self) -> Option<RecognitionPoller> {
        // Disconnecting the stop channel wakes the loop.
        drop(self.stop_tx.take());
        self.thread.take()?.join().ok()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() && self.shutdown().is_none() {
            log::warn!("Poll loop thread panicked");
        }
    }
}

fn run_loop(
    mut poller: RecognitionPoller,
    service: Arc<dyn RecognitionService>,
    encoder: Box<dyn FrameEncoder>,
    interval: Duration,
    stop_rx: Receiver<()>,
) -> RecognitionPoller {
    let ticker = crossbeam_channel::tick(interval);
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<Outcome>();

    loop {
        let deadline = poller
            .deadline()
            .map(crossbeam_channel::at)
            .unwrap_or_else(crossbeam_channel::never);

        crossbeam_channel::select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                if let Some(image) = poller.sample(&*encoder) {
                    spawn_request(service.clone(), image, result_tx.clone());
                }
            }
            recv(result_rx) -> outcome => {
                if let Ok(outcome) = outcome {
                    poller.handle_outcome(outcome, Instant::now());
                }
            }
            recv(deadline) -> _ => poller.expire(Instant::now()),
        }
    }

    poller.dismiss();
    log::debug!("Poll loop stopped");
    poller
}

fn spawn_request(service: Arc<dyn RecognitionService>, image: EncodedImage, result_tx: Sender<Outcome>) {
    thread::spawn(move || {
        let outcome = service.recognize(&image);
        // The loop may have stopped while the request was in flight.
        let _ = result_tx.send(outcome);
    });
}
