//! Background loop that delivers due scheduled posts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info};

use crate::dispatcher::{BroadcastTarget, Dispatcher};
use crate::error::Result;
use crate::metrics;
use crate::storage::{ScheduledPost, Storage};
use crate::telegram::Messenger;

/// Periodic due-check loop. One instance per process; `start` spawns a
/// single persistent background task, `stop` lets it wind down between
/// cycles.
#[derive(Clone)]
pub struct Scheduler {
    storage: Arc<Storage>,
    dispatcher: Arc<Dispatcher>,
    messenger: Arc<dyn Messenger>,
    check_interval: Duration,
    max_send_attempts: u32,
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        storage: Arc<Storage>,
        messenger: Arc<dyn Messenger>,
        check_interval: Duration,
        max_send_attempts: u32,
    ) -> Self {
        Self {
            storage,
            dispatcher: Arc::new(Dispatcher::new(messenger.clone())),
            messenger,
            check_interval,
            max_send_attempts,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the background loop. Calling `start` on a running scheduler
    /// does nothing.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Scheduler already running");
            return;
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.check_interval);
            while scheduler.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !scheduler.running.load(Ordering::SeqCst) {
                    break;
                }
                scheduler.run_cycle().await;
            }
            debug!("Scheduler loop exited");
        });

        info!(
            "📅 Scheduler started (check every {}s)",
            self.check_interval.as_secs()
        );
    }

    /// Request the loop to stop. Takes effect between cycles; a cycle in
    /// progress finishes normally.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("🛑 Scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One due-check pass. Every due post is processed independently; an
    /// error on one entry is logged and never affects its siblings.
    pub async fn run_cycle(&self) {
        let due = self.storage.due_posts(Utc::now()).await;
        let mut had_errors = false;

        for post in due {
            if let Err(e) = self.process_post(&post).await {
                had_errors = true;
                error!("Failed to process scheduled post {}: {}", post.id, e);
            }
        }

        metrics::record_scheduler_cycle(!had_errors);
        metrics::set_pending_posts(self.storage.scheduled_posts_count().await);
    }

    /// Deliver one due post and apply the redelivery policy.
    async fn process_post(&self, post: &ScheduledPost) -> Result<()> {
        // Channels removed since scheduling are skipped, not failures.
        let live = self.storage.user_channels(post.user_id).await;
        let targets: Vec<BroadcastTarget> = post
            .channels
            .iter()
            .filter_map(|channel_id| {
                live.get(channel_id).map(|info| BroadcastTarget {
                    channel_id: channel_id.clone(),
                    title: info.title.clone(),
                })
            })
            .collect();

        let started = Instant::now();
        let report = self.dispatcher.deliver(&post.message, &targets).await;
        metrics::record_broadcast("scheduled", started.elapsed());

        // Kept for another cycle only when nothing got through and the
        // attempt budget is not exhausted yet.
        let retry = report.all_failed() && post.attempts + 1 < self.max_send_attempts;
        if retry {
            self.storage.record_attempt(&post.id).await?;
            info!(
                "📨 Scheduled post {} failed everywhere (attempt {}), will retry",
                post.id,
                post.attempts + 1
            );
        } else {
            self.storage.remove_scheduled_post(&post.id).await?;
            info!(
                "📨 Scheduled post {} processed: {} delivered, {} failed",
                post.id, report.delivered, report.failed
            );
        }

        // The report is best-effort; a failure here is only logged.
        if let Err(e) = self
            .messenger
            .send_user_text(post.user_id, &report.scheduled_summary())
            .await
        {
            error!("Failed to notify user {}: {}", post.user_id, e);
        }
        Ok(())
    }
}
