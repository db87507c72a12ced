use std::{sync::Arc, time::Duration};

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use rebound_core::{RetryMetrics, RetryOutcome};

const NAMESPACE: &str = "rebound";

/// Prometheus implementation of [`RetryMetrics`].
///
/// ## Metrics
/// - `rebound_attempts_total{policy}` - Counter of operation invocations
/// - `rebound_retries_scheduled_total{policy}` - Counter of retries scheduled after a failure
/// - `rebound_retry_delay_seconds{policy}` - Histogram of jittered retry delays
/// - `rebound_runs_finished_total{policy, outcome}` - Counter of finished runs
/// - `rebound_run_attempts{policy, outcome}` - Histogram of attempts per finished run
///
/// ## Label cardinality
/// - `policy`: "exponential", "fibonacci"
/// - `outcome`: "succeeded", "cancelled", "abandoned"
#[derive(Clone)]
pub struct PrometheusMetrics {
    attempts: CounterVec,
    retries_scheduled: CounterVec,
    retry_delay: HistogramVec,
    runs_finished: CounterVec,
    run_attempts: HistogramVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create the collectors and register them in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let attempts = CounterVec::new(
            Opts::new("attempts_total", "Total number of operation invocations")
                .namespace(NAMESPACE),
            &["policy"],
        )?;
        registry.register(Box::new(attempts.clone()))?;

        let retries_scheduled = CounterVec::new(
            Opts::new(
                "retries_scheduled_total",
                "Total number of retries scheduled after a failed attempt",
            )
            .namespace(NAMESPACE),
            &["policy"],
        )?;
        registry.register(Box::new(retries_scheduled.clone()))?;

        let retry_delay = HistogramVec::new(
            HistogramOpts::new("retry_delay_seconds", "Delay before a scheduled retry")
                .namespace(NAMESPACE)
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
            &["policy"],
        )?;
        registry.register(Box::new(retry_delay.clone()))?;

        let runs_finished = CounterVec::new(
            Opts::new("runs_finished_total", "Total number of finished retry runs")
                .namespace(NAMESPACE),
            &["policy", "outcome"],
        )?;
        registry.register(Box::new(runs_finished.clone()))?;

        let run_attempts = HistogramVec::new(
            HistogramOpts::new("run_attempts", "Operation invocations per finished run")
                .namespace(NAMESPACE)
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 50.0, 100.0]),
            &["policy", "outcome"],
        )?;
        registry.register(Box::new(run_attempts.clone()))?;

        Ok(Self {
            attempts,
            retries_scheduled,
            retry_delay,
            runs_finished,
            run_attempts,
            registry,
        })
    }

    /// Create the backend with a private registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metric families for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render the registry in the text exposition format.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl RetryMetrics for PrometheusMetrics {
    fn record_attempt(&self, policy: &str) {
        self.attempts.with_label_values(&[policy]).inc();
    }

    fn record_retry_scheduled(&self, policy: &str, delay: Duration) {
        self.retries_scheduled.with_label_values(&[policy]).inc();
        self.retry_delay
            .with_label_values(&[policy])
            .observe(delay.as_secs_f64());
    }

    fn record_finished(&self, policy: &str, outcome: RetryOutcome, attempts: u32) {
        let labels = [policy, outcome.as_label()];
        self.runs_finished.with_label_values(&labels).inc();
        self.run_attempts
            .with_label_values(&labels)
            .observe(f64::from(attempts));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebound_core::{BackoffScheduler, ManualScheduler};
    use rebound_model::BackoffStrategy;

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
        families
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("metric {name} not found"))
    }

    #[test]
    fn attempts_are_counted_per_policy() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_attempt("exponential");
        metrics.record_attempt("exponential");
        metrics.record_attempt("fibonacci");

        let families = metrics.gather();
        let attempts = family(&families, "rebound_attempts_total");
        assert_eq!(attempts.get_metric().len(), 2);
    }

    #[test]
    fn scheduled_retry_updates_counter_and_histogram() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_retry_scheduled("exponential", Duration::from_millis(250));
        metrics.record_retry_scheduled("exponential", Duration::from_secs(2));

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("rebound_retries_scheduled_total{policy=\"exponential\"} 2"));
        assert!(text.contains("rebound_retry_delay_seconds_count{policy=\"exponential\"} 2"));
        assert!(text.contains("rebound_retry_delay_seconds_sum{policy=\"exponential\"} 2.25"));
    }

    #[test]
    fn finished_runs_are_split_by_outcome() {
        let metrics = PrometheusMetrics::new().unwrap();

        metrics.record_finished("fibonacci", RetryOutcome::Succeeded, 3);
        metrics.record_finished("fibonacci", RetryOutcome::Cancelled, 1);

        let families = metrics.gather();
        assert_eq!(family(&families, "rebound_runs_finished_total").get_metric().len(), 2);
        assert_eq!(family(&families, "rebound_run_attempts").get_metric().len(), 2);
    }

    #[test]
    fn text_encoding_contains_metric_names() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.record_attempt("exponential");

        let text = metrics.encode_text().unwrap();
        assert!(text.contains("rebound_attempts_total{policy=\"exponential\"} 1"));
    }

    #[test]
    fn registering_twice_in_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        PrometheusMetrics::new_with_registry(registry.clone()).unwrap();
        assert!(PrometheusMetrics::new_with_registry(registry).is_err());
    }

    #[test]
    fn scheduler_reports_through_prometheus() {
        let metrics = PrometheusMetrics::new().unwrap();
        let manual = Arc::new(ManualScheduler::new());
        let scheduler = BackoffScheduler::new(BackoffStrategy::exponential(100, 1_000), manual.clone())
            .unwrap()
            .with_metrics(Arc::new(metrics.clone()));

        let handle = scheduler.run(|report| {
            let ok = report.attempt() >= 3;
            report.report(ok);
        });
        manual.run_until_idle(10);

        assert!(handle.is_finished());
        let text = metrics.encode_text().unwrap();
        assert!(text.contains("rebound_attempts_total{policy=\"exponential\"} 3"));
        assert!(text.contains("rebound_retries_scheduled_total{policy=\"exponential\"} 2"));
        assert!(text.contains(
            "rebound_runs_finished_total{outcome=\"succeeded\",policy=\"exponential\"} 1"
        ));
    }
}
