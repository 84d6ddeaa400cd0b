//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::config::MetricsConfig;
use crate::domain::{PipelineStage, Termination};

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Get the metrics as a string for the metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_default_metrics();
            tracing::info!("Prometheus metrics initialized at {}", config.path);
            Some(PrometheusMetrics::from_handle(handle))
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    gauge!("docubot_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record a run that produced an answer
pub fn record_pipeline_run(termination: Termination, iterations: u32, duration: Duration) {
    counter!("docubot_pipeline_runs_total", "termination" => termination.as_str()).increment(1);
    histogram!("docubot_pipeline_iterations").record(f64::from(iterations));
    histogram!("docubot_pipeline_duration_seconds", "outcome" => "answered").record(duration.as_secs_f64());
}

/// Record a run that ended with a fatal error
pub fn record_pipeline_error(stage: PipelineStage, duration: Duration) {
    counter!("docubot_pipeline_errors_total", "stage" => stage.as_str()).increment(1);
    histogram!("docubot_pipeline_duration_seconds", "outcome" => "error").record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_metrics_are_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let metrics = PrometheusMetrics::from_handle(recorder.handle());

        metrics::with_local_recorder(&recorder, || {
            record_pipeline_run(Termination::Verified, 2, Duration::from_millis(120));
            record_pipeline_error(PipelineStage::Generation, Duration::from_millis(30));
        });

        let rendered = metrics.render();
        assert!(rendered.contains("docubot_pipeline_runs_total{termination=\"verified\"} 1"));
        assert!(rendered.contains("docubot_pipeline_errors_total{stage=\"generation\"} 1"));
        assert!(rendered.contains("docubot_pipeline_iterations"));
    }

    #[test]
    fn test_disabled_metrics() {
        let config = MetricsConfig {
            enabled: false,
            path: "/metrics".to_string(),
        };

        assert!(init_metrics(&config).is_none());
    }
}
