//! Fan-out delivery of one message to a set of channels.

use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics;
use crate::telegram::Messenger;
use crate::texts;

/// At most this many failure lines appear in a user-facing report.
const MAX_REPORTED_FAILURES: usize = 5;

/// One destination of a broadcast.
#[derive(Debug, Clone)]
pub struct BroadcastTarget {
    pub channel_id: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub title: String,
    pub error: String,
}

/// Outcome of one broadcast. `delivered + failed` always equals the
/// number of targets passed to `deliver`.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    /// Report text for an immediate broadcast.
    pub fn summary(&self) -> String {
        self.render(texts::REPORT_HEADER)
    }

    /// Report text for a scheduled broadcast.
    pub fn scheduled_summary(&self) -> String {
        self.render(texts::REPORT_HEADER_SCHEDULED)
    }

    fn render(&self, header: &str) -> String {
        let mut text = format!(
            "{}\n\n✅ Успешно отправлено: {}\n❌ Ошибок: {}\n",
            header, self.delivered, self.failed
        );
        if !self.failures.is_empty() {
            let lines: Vec<String> = self
                .failures
                .iter()
                .take(MAX_REPORTED_FAILURES)
                .map(|failure| format!("❌ {}: {}", failure.title, failure.error))
                .collect();
            text.push_str("\nОшибки:\n");
            text.push_str(&lines.join("\n"));
        }
        text
    }

    /// True when at least one target was attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.delivered == 0 && self.failed > 0
    }
}

/// Sends a message to every target through the `Messenger`.
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
}

impl Dispatcher {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Deliver `text` to every target, sequentially. A failing target is
    /// recorded and the rest still get their attempt; no retries within
    /// one call.
    pub async fn deliver(&self, text: &str, targets: &[BroadcastTarget]) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for target in targets {
            match self.messenger.send_post(&target.channel_id, text).await {
                Ok(()) => {
                    report.delivered += 1;
                    metrics::record_post_sent(true);
                }
                Err(e) => {
                    warn!(
                        "Send to {} ({}) failed: {}",
                        target.title, target.channel_id, e
                    );
                    report.failed += 1;
                    report.failures.push(DeliveryFailure {
                        title: target.title.clone(),
                        error: e.to_string(),
                    });
                    metrics::record_post_sent(false);
                }
            }
        }

        info!(
            "📤 Broadcast finished: {} delivered, {} failed of {}",
            report.delivered,
            report.failed,
            targets.len()
        );
        report
    }
}
