pub mod server;

use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use tracing::error;

pub struct Metrics {
    rest_call: CounterVec,
    rest_call_error: CounterVec,
    rest_call_duration: HistogramVec,
    searches: Counter,
    searches_failed: Counter,
    search_matches: Histogram,
    cached_bridge_events: Gauge,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let rest_call = CounterVec::new(
            Opts::new("rest_call", "Number of calls to the dYdX REST API"),
            &["endpoint"],
        )
        .expect("Failed to create rest_call counter");

        if let Err(err) = registry.register(Box::new(rest_call.clone())) {
            error!("Error: Failed to register rest_call: {}", err);
        }

        let rest_call_error = CounterVec::new(
            Opts::new(
                "rest_call_error",
                "Number of failed calls to the dYdX REST API",
            ),
            &["endpoint"],
        )
        .expect("Failed to create rest_call_error counter");

        if let Err(err) = registry.register(Box::new(rest_call_error.clone())) {
            error!("Error: Failed to register rest_call_error: {}", err);
        }

        let opts = HistogramOpts::new(
            "rest_call_duration_seconds",
            "Duration of calls to the dYdX REST API",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]);
        let rest_call_duration = match HistogramVec::new(opts, &["endpoint"]) {
            Ok(histogram) => histogram,
            Err(err) => panic!("Failed to create rest_call_duration histogram: {}", err),
        };

        if let Err(err) = registry.register(Box::new(rest_call_duration.clone())) {
            error!("Error: Failed to register rest_call_duration: {}", err);
        }

        let searches = Counter::new("searches", "Number of address searches started")
            .expect("Failed to create searches counter");

        if let Err(err) = registry.register(Box::new(searches.clone())) {
            error!("Error: Failed to register searches: {}", err);
        }

        let searches_failed = Counter::new("searches_failed", "Number of failed address searches")
            .expect("Failed to create searches_failed counter");

        if let Err(err) = registry.register(Box::new(searches_failed.clone())) {
            error!("Error: Failed to register searches_failed: {}", err);
        }

        let opts = HistogramOpts::new(
            "search_matches",
            "Number of bridge events matching a searched address",
        )
        .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0]);
        let search_matches = match Histogram::with_opts(opts) {
            Ok(histogram) => histogram,
            Err(err) => panic!("Failed to create search_matches histogram: {}", err),
        };

        if let Err(err) = registry.register(Box::new(search_matches.clone())) {
            error!("Error: Failed to register search_matches: {}", err);
        }

        let cached_bridge_events = Gauge::new(
            "cached_bridge_events",
            "Number of delayed bridge events held by the event cache",
        )
        .expect("Failed to create cached_bridge_events gauge");

        if let Err(err) = registry.register(Box::new(cached_bridge_events.clone())) {
            error!("Error: Failed to register cached_bridge_events: {}", err);
        }

        Self {
            rest_call,
            rest_call_error,
            rest_call_duration,
            searches,
            searches_failed,
            search_matches,
            cached_bridge_events,
            registry,
        }
    }

    pub fn inc_rest_call(&self, endpoint: &str) {
        match self.rest_call.get_metric_with_label_values(&[endpoint]) {
            Ok(counter) => counter.inc(),
            Err(_) => error!(
                "Failed to increment REST call counter for endpoint: {}",
                endpoint
            ),
        }
    }

    pub fn inc_rest_call_error(&self, endpoint: &str) {
        match self.rest_call_error.get_metric_with_label_values(&[endpoint]) {
            Ok(counter) => counter.inc(),
            Err(_) => error!(
                "Failed to increment REST call error counter for endpoint: {}",
                endpoint
            ),
        }
    }

    pub fn observe_rest_call_duration(&self, endpoint: &str, duration_sec: f64) {
        match self
            .rest_call_duration
            .get_metric_with_label_values(&[endpoint])
        {
            Ok(histogram) => histogram.observe(duration_sec),
            Err(_) => error!(
                "Failed to observe REST call duration for endpoint: {}",
                endpoint
            ),
        }
    }

    pub fn inc_searches(&self) {
        self.searches.inc();
    }

    pub fn inc_searches_failed(&self) {
        self.searches_failed.inc();
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn observe_search_matches(&self, matches: usize) {
        self.search_matches.observe(matches as f64);
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn set_cached_bridge_events(&self, count: usize) {
        self.cached_bridge_events.set(count as f64);
    }

    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return String::new();
        }

        match String::from_utf8(buffer) {
            Ok(metrics) => metrics,
            Err(e) => {
                error!("Failed to convert metrics to UTF-8: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather() {
        let metrics = Metrics::new();

        metrics.inc_rest_call("latest_block");
        metrics.inc_rest_call("latest_block");
        metrics.inc_rest_call_error("delayed_messages");
        metrics.observe_rest_call_duration("latest_block", 0.2);
        metrics.inc_searches();
        metrics.inc_searches_failed();
        metrics.observe_search_matches(3);
        metrics.set_cached_bridge_events(12);

        let output = metrics.gather();

        assert!(output.contains("rest_call{endpoint=\"latest_block\"} 2"));
        assert!(output.contains("rest_call_error{endpoint=\"delayed_messages\"} 1"));
        assert!(output.contains("rest_call_duration_seconds_count{endpoint=\"latest_block\"} 1"));
        assert!(output.contains("searches 1"));
        assert!(output.contains("searches_failed 1"));
        assert!(output.contains("search_matches_count 1"));
        assert!(output.contains("cached_bridge_events 12"));
    }
}
