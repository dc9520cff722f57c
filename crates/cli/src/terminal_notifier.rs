use std::io::Write;

use facewatch_core::notification::domain::notifier::{DetectionEvent, Notifier};

/// Prints the detected name with a check mark on stderr while the
/// detection is on screen, and clears the line when it is dismissed.
pub struct TerminalNotifier {
    visible: bool,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self { visible: false }
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for TerminalNotifier {
    fn show(&mut self, event: &DetectionEvent) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r  {}  \u{2714}\u{fe0f}", event.name());
        let _ = stderr.flush();
        self.visible = true;
    }

    fn hide(&mut self) {
        if self.visible {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "\r\x1b[2K");
            let _ = stderr.flush();
            self.visible = false;
        }
    }
}
