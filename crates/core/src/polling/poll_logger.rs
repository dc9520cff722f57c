use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for poll loop events.
///
/// Decouples the poller from specific output mechanisms so each caller can
/// observe polling behaviour without changing the state machine.
pub trait PollLogger: Send {
    /// A poll tick fired.
    fn tick(&mut self);

    /// The tick was skipped because the capture source was not ready.
    fn skipped(&mut self);

    /// A still was submitted to the recognition service.
    fn request_sent(&mut self);

    /// Encoding or the recognition request failed.
    fn request_failed(&mut self);

    /// A known face was detected.
    fn detection(&mut self, name: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPollLogger;

impl PollLogger for NullPollLogger {
    fn tick(&mut self) {}
    fn skipped(&mut self) {}
    fn request_sent(&mut self) {}
    fn request_failed(&mut self) {}
    fn detection(&mut self, _name: &str) {}
}

/// CLI-oriented logger that counts poll outcomes and reports a summary
/// when the loop is torn down.
pub struct StdoutPollLogger {
    ticks: usize,
    skipped: usize,
    requests: usize,
    failures: usize,
    detections: HashMap<String, usize>,
    start_time: Instant,
}

impl StdoutPollLogger {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            skipped: 0,
            requests: 0,
            failures: 0,
            detections: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no tick fired.
    pub fn summary_string(&self) -> Option<String> {
        if self.ticks == 0 {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![
            format!("Poll summary ({} ticks, {elapsed:.1}s total):", self.ticks),
            format!("  skipped  : {}", self.skipped),
            format!("  requests : {}", self.requests),
            format!("  failures : {}", self.failures),
        ];

        let mut names: Vec<_> = self.detections.iter().collect();
        names.sort();
        if names.is_empty() {
            lines.push("  detections: none".to_string());
        } else {
            let listed: Vec<String> = names
                .iter()
                .map(|(name, count)| format!("{name} x{count}"))
                .collect();
            lines.push(format!("  detections: {}", listed.join(", ")));
        }

        Some(lines.join("\n"))
    }

    pub fn detections_of(&self, name: &str) -> usize {
        self.detections.get(name).copied().unwrap_or(0)
    }
}

impl Default for StdoutPollLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PollLogger for StdoutPollLogger {
    fn tick(&mut self) {
        self.ticks += 1;
    }

    fn skipped(&mut self) {
        self.skipped += 1;
    }

    fn request_sent(&mut self) {
        self.requests += 1;
    }

    fn request_failed(&mut self) {
        self.failures += 1;
    }

    fn detection(&mut self, name: &str) {
        *self.detections.entry(name.to_string()).or_default() += 1;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
