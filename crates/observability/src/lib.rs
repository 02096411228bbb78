use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    chat_requests_total: AtomicU64,
    chat_completed_total: AtomicU64,
    policy_hits_total: AtomicU64,
    probe_replies_total: AtomicU64,
    model_failures_total: AtomicU64,
    store_failures_total: AtomicU64,
    posts_saved_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub chat_requests_total: u64,
    pub chat_completed_total: u64,
    pub policy_hits_total: u64,
    pub probe_replies_total: u64,
    pub model_failures_total: u64,
    pub store_failures_total: u64,
    pub posts_saved_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_chat_request(&self) {
        self.chat_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_policy_hit(&self) {
        self.policy_hits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_probe_reply(&self) {
        self.probe_replies_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_failure(&self) {
        self.model_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_failure(&self) {
        self.store_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_post_saved(&self) {
        self.posts_saved_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one completed chat; failed requests are not averaged in.
    pub fn observe_latency(&self, duration: Duration) {
        self.chat_completed_total.fetch_add(1, Ordering::Relaxed);
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.chat_completed_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            chat_requests_total: self.chat_requests_total.load(Ordering::Relaxed),
            chat_completed_total: completed,
            policy_hits_total: self.policy_hits_total.load(Ordering::Relaxed),
            probe_replies_total: self.probe_replies_total.load(Ordering::Relaxed),
            model_failures_total: self.model_failures_total.load(Ordering::Relaxed),
            store_failures_total: self.store_failures_total.load(Ordering::Relaxed),
            posts_saved_total: self.posts_saved_total.load(Ordering::Relaxed),
            avg_latency_millis: if completed == 0 {
                0.0
            } else {
                latency as f64 / completed as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,voices_api=info,voices_agents=info,voices_storage=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_latency_ignores_failed_requests() {
        let metrics = AppMetrics::default();
        assert_eq!(metrics.snapshot().avg_latency_millis, 0.0);

        metrics.inc_chat_request();
        metrics.inc_chat_request();
        metrics.inc_chat_request();
        metrics.observe_latency(Duration::from_millis(30));
        metrics.observe_latency(Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chat_requests_total, 3);
        assert_eq!(snapshot.chat_completed_total, 2);
        assert_eq!(snapshot.avg_latency_millis, 20.0);
    }
}
