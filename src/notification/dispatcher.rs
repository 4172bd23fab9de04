use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::metrics::SendMetrics;
use crate::provider::MessagingProvider;

use super::{DispatchOutcome, DispatchSummary, ResolvedNotification};

/// Default number of concurrent sends for one request
pub const DEFAULT_MAX_CONCURRENT_SENDS: usize = 100;

/// Per-request dispatch knobs, taken from the configuration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub max_concurrent_sends: usize,
    /// Echo raw recipient tokens in logs and outcomes
    pub log_raw_targets: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
            log_raw_targets: false,
        }
    }
}

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Requests that reached the dispatcher
    pub total_requests: AtomicU64,
    /// Successful per-target sends
    pub total_sent: AtomicU64,
    /// Failed per-target sends
    pub total_failed: AtomicU64,
    /// Requests where every target failed
    pub failed_requests: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_requests: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub failed_requests: u64,
}

/// Sends one resolved notification to every target, isolating failures.
#[derive(Default)]
pub struct NotificationDispatcher {
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get dispatcher statistics
    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch `notification` to each of `targets`.
    ///
    /// Never fails: every provider error is captured in that target's
    /// outcome. Outcomes come back in target order.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, provider, notification, targets, options),
        fields(provider = provider.name(), target_count = targets.len())
    )]
    pub async fn dispatch(
        &self,
        provider: &Arc<dyn MessagingProvider>,
        notification: &ResolvedNotification,
        targets: &[String],
        options: DispatchOptions,
    ) -> DispatchSummary {
        let started = Instant::now();
        let max_concurrent = options.max_concurrent_sends.max(1);

        // One slot per target, each written exactly once
        let mut slots: Vec<Option<DispatchOutcome>> = vec![None; targets.len()];

        let mut futures = FuturesUnordered::new();
        let mut pending = 0;

        for (index, target) in targets.iter().enumerate() {
            futures.push(async move {
                let result = provider.send_to_one(target, notification).await;
                (index, result)
            });
            pending += 1;

            // Process completed futures when we hit the concurrency limit
            while pending >= max_concurrent {
                match futures.next().await {
                    Some((index, result)) => {
                        pending -= 1;
                        slots[index] = Some(self.record(index, &targets[index], result, options));
                    }
                    None => break,
                }
            }
        }

        // Process remaining futures
        while let Some((index, result)) = futures.next().await {
            slots[index] = Some(self.record(index, &targets[index], result, options));
        }

        let outcomes: Vec<DispatchOutcome> = slots.into_iter().flatten().collect();
        let summary = DispatchSummary::from_outcomes(outcomes);

        // Update stats
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_sent
            .fetch_add(summary.sent_count as u64, Ordering::Relaxed);
        self.stats
            .total_failed
            .fetch_add(summary.failed_count as u64, Ordering::Relaxed);
        if !summary.success {
            self.stats.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        SendMetrics::observe_dispatch(started.elapsed().as_secs_f64());

        tracing::debug!(
            sent = summary.sent_count,
            failed = summary.failed_count,
            total = summary.total_targets,
            "Dispatched notification"
        );

        summary
    }

    fn record(
        &self,
        index: usize,
        target: &str,
        result: Result<String, crate::provider::ProviderError>,
        options: DispatchOptions,
    ) -> DispatchOutcome {
        let shown_target = options.log_raw_targets.then(|| target.to_string());

        match result {
            Ok(message_id) => {
                SendMetrics::record_success();
                if options.log_raw_targets {
                    tracing::debug!(index, target = %target, message_id = %message_id, "Sent notification");
                } else {
                    tracing::debug!(index, message_id = %message_id, "Sent notification");
                }
                DispatchOutcome {
                    index,
                    target: shown_target,
                    success: true,
                    message_id: Some(message_id),
                    error: None,
                }
            }
            Err(e) => {
                SendMetrics::record_failure(e.code());
                if options.log_raw_targets {
                    tracing::warn!(index, target = %target, error = %e, "Failed to send notification");
                } else {
                    tracing::warn!(index, error = %e, "Failed to send notification");
                }
                DispatchOutcome {
                    index,
                    target: shown_target,
                    success: false,
                    message_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
