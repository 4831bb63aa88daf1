/// Prometheus metrics for the directory service.
///
/// Counters cover the save-then-notify path: how many extension saves
/// happened, how many reports were built and how long that took, and how many
/// notification mails went out or failed.
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SaveLabels {
    /// "created" or "updated"
    pub kind: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    /// Error category from `ErrorCode::category`
    pub category: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,

    pub extension_saves_total: Family<SaveLabels, Counter>,

    pub reports_generated_total: Counter,

    pub report_generation_seconds: Histogram,

    pub notifications_sent_total: Counter,

    pub notification_failures_total: Counter,

    pub directory_errors_total: Family<ErrorLabels, Counter>,

    pub directory_extensions: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let extension_saves_total = Family::<SaveLabels, Counter>::default();
        registry.register(
            "intercom_extension_saves",
            "Extension records saved, by kind",
            extension_saves_total.clone(),
        );

        let reports_generated_total = Counter::default();
        registry.register(
            "intercom_reports_generated",
            "Intercom workbooks generated",
            reports_generated_total.clone(),
        );

        // Buckets: 5ms .. ~2.5s
        let report_generation_seconds = Histogram::new(exponential_buckets(0.005, 2.0, 10));
        registry.register(
            "intercom_report_generation_seconds",
            "Time spent building the intercom workbook",
            report_generation_seconds.clone(),
        );

        let notifications_sent_total = Counter::default();
        registry.register(
            "intercom_notifications_sent",
            "Notification mails accepted by the transport",
            notifications_sent_total.clone(),
        );

        let notification_failures_total = Counter::default();
        registry.register(
            "intercom_notification_failures",
            "Notification runs aborted by a transport failure",
            notification_failures_total.clone(),
        );

        let directory_errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "intercom_directory_errors",
            "Directory operation failures by category",
            directory_errors_total.clone(),
        );

        let directory_extensions = Gauge::default();
        registry.register(
            "intercom_directory_extensions",
            "Extension records currently stored",
            directory_extensions.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            extension_saves_total,
            reports_generated_total,
            report_generation_seconds,
            notifications_sent_total,
            notification_failures_total,
            directory_errors_total,
            directory_extensions,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(err) = encode(&mut buffer, &registry) {
            tracing::warn!(error = %err, "failed to encode metrics");
        }
        buffer
    }

    pub fn record_save(&self, kind: &str) {
        self.extension_saves_total
            .get_or_create(&SaveLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    pub fn record_report(&self, duration: Duration) {
        self.reports_generated_total.inc();
        self.report_generation_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn record_notification_sent(&self) {
        self.notifications_sent_total.inc();
    }

    pub fn record_notification_failure(&self) {
        self.notification_failures_total.inc();
    }

    pub fn record_error(&self, category: &str) {
        self.directory_errors_total
            .get_or_create(&ErrorLabels {
                category: category.to_string(),
            })
            .inc();
    }

    pub fn set_extension_count(&self, count: usize) {
        self.directory_extensions.set(count as i64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
