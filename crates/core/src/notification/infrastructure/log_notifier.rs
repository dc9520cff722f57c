use crate::notification::domain::notifier::{DetectionEvent, Notifier};

/// Reports detections through the `log` facade.
pub struct LogNotifier {
    visible: Option<String>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self { visible: None }
    }

    /// Name currently on display, if any.
    pub fn visible(&self) -> Option<&str> {
        self.visible.as_deref()
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn show(&mut self, event: &DetectionEvent) {
        log::info!("{} \u{2714}", event.name());
        self.visible = Some(event.name().to_string());
    }

    fn hide(&mut self) {
        if let Some(name) = self.visible.take() {
            log::debug!("Notification for {name} dismissed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_show_then_hide_tracks_visibility() {
        let mut notifier = LogNotifier::new();
        assert_eq!(notifier.visible(), None);

        notifier.show(&DetectionEvent::new("Alice", Instant::now()));
        assert_eq!(notifier.visible(), Some("Alice"));

        notifier.hide();
        assert_eq!(notifier.visible(), None);
    }

    #[test]
    fn test_hide_without_show_is_noop() {
        let mut notifier = LogNotifier::new();
        notifier.hide();
        assert_eq!(notifier.visible(), None);
    }
}
