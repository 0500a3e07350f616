//! Prometheus metrics for API observability.
//!
//! Metric names are stable and form part of the external contract:
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `api_requests_total` | Counter | `endpoint`, `status` |
//! | `api_request_duration_seconds` | Histogram | `endpoint` |
//! | `analysis_by_framework_total` | Counter | `framework`, `tier` |
//! | `metrics_extracted_count` | Histogram | — |
//! | `cache_operations_total` | Counter | `op`, `outcome` |
//! | `credit_debits_total` | Counter | `outcome` |
//! | `rate_limit_hits_total` | Counter | `endpoint`, `tier` |

use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

pub struct ApiMetrics {
    registry: Registry,
    pub api_requests_total: CounterVec,
    pub api_request_duration_seconds: HistogramVec,
    pub analysis_by_framework_total: CounterVec,
    pub metrics_extracted_count: Histogram,
    pub cache_operations_total: CounterVec,
    pub credit_debits_total: CounterVec,
    pub rate_limit_hits_total: CounterVec,
}

impl ApiMetrics {
    pub fn new() -> Result<ApiMetrics, prometheus::Error> {
        let registry = Registry::new();

        let api_requests_total = CounterVec::new(
            Opts::new("api_requests_total", "Total API requests"),
            &["endpoint", "status"],
        )?;
        let api_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("api_request_duration_seconds", "Request duration")
                .buckets(vec![0.005, 0.025, 0.1, 0.25, 1.0, 5.0, 15.0, 60.0]),
            &["endpoint"],
        )?;
        let analysis_by_framework_total = CounterVec::new(
            Opts::new(
                "analysis_by_framework_total",
                "Analyses per framework and tier",
            ),
            &["framework", "tier"],
        )?;
        let metrics_extracted_count = Histogram::with_opts(
            HistogramOpts::new(
                "metrics_extracted_count",
                "Standardized metrics per analysis",
            )
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0]),
        )?;
        let cache_operations_total = CounterVec::new(
            Opts::new("cache_operations_total", "Cache operations by outcome"),
            &["op", "outcome"],
        )?;
        let credit_debits_total = CounterVec::new(
            Opts::new("credit_debits_total", "Credit debit attempts by outcome"),
            &["outcome"],
        )?;
        let rate_limit_hits_total = CounterVec::new(
            Opts::new("rate_limit_hits_total", "Rate limit rejections"),
            &["endpoint", "tier"],
        )?;

        registry.register(Box::new(api_requests_total.clone()))?;
        registry.register(Box::new(api_request_duration_seconds.clone()))?;
        registry.register(Box::new(analysis_by_framework_total.clone()))?;
        registry.register(Box::new(metrics_extracted_count.clone()))?;
        registry.register(Box::new(cache_operations_total.clone()))?;
        registry.register(Box::new(credit_debits_total.clone()))?;
        registry.register(Box::new(rate_limit_hits_total.clone()))?;

        Ok(ApiMetrics {
            registry,
            api_requests_total,
            api_request_duration_seconds,
            analysis_by_framework_total,
            metrics_extracted_count,
            cache_operations_total,
            credit_debits_total,
            rate_limit_hits_total,
        })
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %e, "Metric encoding failed");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_encode() {
        let metrics = ApiMetrics::new().unwrap();
        metrics
            .api_requests_total
            .with_label_values(&["analyze", "200"])
            .inc();
        metrics
            .api_request_duration_seconds
            .with_label_values(&["analyze"])
            .observe(0.05);
        metrics
            .analysis_by_framework_total
            .with_label_values(&["CSRD", "free"])
            .inc();
        metrics.metrics_extracted_count.observe(3.0);
        metrics
            .cache_operations_total
            .with_label_values(&["get", "hit"])
            .inc();
        metrics
            .credit_debits_total
            .with_label_values(&["ok"])
            .inc();
        metrics
            .rate_limit_hits_total
            .with_label_values(&["analyze", "free"])
            .inc();

        let text = metrics.encode_text();
        for name in [
            "api_requests_total",
            "api_request_duration_seconds",
            "analysis_by_framework_total",
            "metrics_extracted_count",
            "cache_operations_total",
            "credit_debits_total",
            "rate_limit_hits_total",
        ] {
            assert!(text.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_fresh_registry_per_instance() {
        // Two instances must not collide on registration.
        let _a = ApiMetrics::new().unwrap();
        let _b = ApiMetrics::new().unwrap();
    }
}
