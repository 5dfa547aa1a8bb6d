use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::storage::StorageCounts;

/// Process-wide request counters. Cheap atomics, recorded by the tracking
/// middleware on every response.
pub struct MetricsCollector {
    started: Instant,
    requests: AtomicU64,
    errors: AtomicU64,
    total_response_micros: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_response_micros: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self, elapsed: Duration, is_error: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        if is_error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn error_rate_percent(&self) -> f64 {
        let requests = self.requests();
        if requests == 0 {
            return 0.0;
        }
        self.errors.load(Ordering::Relaxed) as f64 / requests as f64 * 100.0
    }

    fn avg_response_ms(&self) -> f64 {
        let requests = self.requests();
        if requests == 0 {
            return 0.0;
        }
        self.total_response_micros.load(Ordering::Relaxed) as f64 / requests as f64 / 1000.0
    }

    /// Prometheus text exposition for /metrics.
    pub fn render_prometheus(&self, counts: &StorageCounts) -> String {
        format!(
            "# HELP lawhelp_total_users Total number of registered users\n\
             # TYPE lawhelp_total_users gauge\n\
             lawhelp_total_users {}\n\
             \n\
             # HELP lawhelp_active_chat_sessions Number of active chat sessions\n\
             # TYPE lawhelp_active_chat_sessions gauge\n\
             lawhelp_active_chat_sessions {}\n\
             \n\
             # HELP lawhelp_total_messages Total number of chat messages\n\
             # TYPE lawhelp_total_messages counter\n\
             lawhelp_total_messages {}\n\
             \n\
             # HELP lawhelp_lawyers_count Total number of registered lawyers\n\
             # TYPE lawhelp_lawyers_count gauge\n\
             lawhelp_lawyers_count {}\n\
             \n\
             # HELP lawhelp_uptime_seconds Application uptime in seconds\n\
             # TYPE lawhelp_uptime_seconds counter\n\
             lawhelp_uptime_seconds {}\n\
             \n\
             # HELP lawhelp_response_time_ms Average response time in milliseconds\n\
             # TYPE lawhelp_response_time_ms gauge\n\
             lawhelp_response_time_ms {:.3}\n\
             \n\
             # HELP lawhelp_error_rate_percent Error rate percentage\n\
             # TYPE lawhelp_error_rate_percent gauge\n\
             lawhelp_error_rate_percent {:.3}\n\
             \n\
             # HELP lawhelp_requests_total Total number of HTTP requests\n\
             # TYPE lawhelp_requests_total counter\n\
             lawhelp_requests_total {}",
            counts.users,
            counts.active_sessions,
            counts.messages,
            counts.lawyers,
            self.uptime_seconds(),
            self.avg_response_ms(),
            self.error_rate_percent(),
            self.requests(),
        )
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rate_counts_only_errors() {
        let collector = MetricsCollector::new();
        collector.record_request(Duration::from_millis(10), false);
        collector.record_request(Duration::from_millis(20), true);
        collector.record_request(Duration::from_millis(30), false);
        collector.record_request(Duration::from_millis(40), true);

        assert_eq!(collector.requests(), 4);
        assert!((collector.error_rate_percent() - 50.0).abs() < f64::EPSILON);
        assert!((collector.avg_response_ms() - 25.0).abs() < 0.01);
    }

    #[test]
    fn prometheus_render_includes_storage_gauges() {
        let collector = MetricsCollector::new();
        collector.record_request(Duration::from_millis(5), false);

        let counts = StorageCounts {
            users: 4,
            active_sessions: 2,
            messages: 17,
            lawyers: 2,
        };
        let text = collector.render_prometheus(&counts);

        assert!(text.contains("lawhelp_total_users 4"));
        assert!(text.contains("lawhelp_active_chat_sessions 2"));
        assert!(text.contains("lawhelp_total_messages 17"));
        assert!(text.contains("lawhelp_lawyers_count 2"));
        assert!(text.contains("lawhelp_requests_total 1"));
        assert!(text.contains("# TYPE lawhelp_uptime_seconds counter"));
    }

    #[test]
    fn empty_collector_renders_zero_rates() {
        let collector = MetricsCollector::new();
        let text = collector.render_prometheus(&StorageCounts::default());
        assert!(text.contains("lawhelp_error_rate_percent 0.000"));
        assert!(text.contains("lawhelp_requests_total 0"));
    }
}
