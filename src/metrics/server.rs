//! HTTP server for the Prometheus metrics endpoint.

use crate::config::ListenAddress;
use crate::metrics::ExporterRegistry;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen socket could not be created.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The server stopped with an error.
    #[error("server error: {0}")]
    Server(String),

    /// The listen address kind is not available on this platform.
    #[error("unsupported listen address: {0}")]
    Unsupported(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// TCP address or Unix socket path to listen on.
    pub listen_address: ListenAddress,
    /// Path under which metrics are exposed.
    pub telemetry_path: String,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            listen_address: ListenAddress::default(),
            telemetry_path: "/metrics".to_string(),
        }
    }
}

/// HTTP server exposing the exporter registry.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: ExporterRegistry,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(config: MetricsServerConfig, registry: ExporterRegistry) -> Self {
        Self { config, registry }
    }

    /// Builds the router without binding.
    pub fn router(&self) -> Router {
        let landing = landing_page(&self.config.telemetry_path);
        Router::new()
            .route(&self.config.telemetry_path, get(metrics_handler))
            .route("/", get(move || async move { Html(landing) }))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.registry.clone())
    }

    /// Starts the HTTP server.
    ///
    /// Runs until Ctrl-C or SIGTERM is received. A Unix socket file created
    /// here is removed on shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();

        match &self.config.listen_address {
            ListenAddress::Tcp(addr) => {
                let listener = tokio::net::TcpListener::bind(addr).await?;
                self.log_listening();

                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
                    .map_err(|e| ServerError::Server(e.to_string()))
            }
            #[cfg(unix)]
            ListenAddress::Unix(path) => {
                let listener = tokio::net::UnixListener::bind(path)?;
                self.log_listening();

                let served = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await;
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::debug!(error = %e, path = %path.display(), "failed to remove socket file");
                }
                served.map_err(|e| ServerError::Server(e.to_string()))
            }
            #[cfg(not(unix))]
            ListenAddress::Unix(_) => Err(ServerError::Unsupported(
                self.config.listen_address.to_string(),
            )),
        }
    }

    fn log_listening(&self) {
        tracing::info!(
            addr = %self.config.listen_address,
            path = %self.config.telemetry_path,
            "Metrics server listening"
        );
    }
}

/// Handler for the metrics endpoint.
///
/// Collection scrapes NGINX with a blocking client, so it runs off the
/// async workers.
async fn metrics_handler(State(registry): State<ExporterRegistry>) -> impl IntoResponse {
    let encoded = tokio::task::spawn_blocking(move || registry.encode()).await;

    match encoded {
        Ok(Ok(output)) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
        Err(e) => {
            tracing::error!(error = %e, "metrics collection task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Failed to collect metrics: {}", e),
            )
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>NGINX Exporter</title></head>\n\
         <body>\n\
         <h1>NGINX Exporter</h1>\n\
         <p><a href='{telemetry_path}'>Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl-C received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{SourceError, StatusSnapshot, StatusSource};
    use crate::collector::StatusCollector;
    use std::collections::HashMap;

    struct Unreachable;

    impl StatusSource for Unreachable {
        fn fetch(&self) -> Result<StatusSnapshot, SourceError> {
            Err(SourceError::Parse("connection refused".to_string()))
        }
    }

    fn down_registry() -> ExporterRegistry {
        let collector =
            StatusCollector::new(Box::new(Unreachable), "nginx", &HashMap::new()).unwrap();
        ExporterRegistry::new(collector).unwrap()
    }

    async fn spawn_server(path: &str) -> String {
        let config = MetricsServerConfig {
            telemetry_path: path.to_string(),
            ..Default::default()
        };
        let app = MetricsServer::new(config, down_registry()).router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_config_default() {
        let config = MetricsServerConfig::default();
        assert_eq!(config.listen_address.to_string(), "0.0.0.0:9113");
        assert_eq!(config.telemetry_path, "/metrics");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_metrics_endpoint_reports_down() {
        let base = spawn_server("/custom-metrics").await;

        let response = reqwest::get(format!("{base}/custom-metrics")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body = response.text().await.unwrap();
        assert!(body.contains("nginx_up 0"));
        assert!(body.contains("nginx_scrape_errors_total{type=\"network\"} 1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_landing_page_links_metrics() {
        let base = spawn_server("/metrics").await;

        let body = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        assert!(body.contains("href='/metrics'"));

        let health = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread")]
    async fn test_serves_metrics_on_unix_socket() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let path = std::env::temp_dir().join(format!("nginx-exporter-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let config = MetricsServerConfig {
            listen_address: ListenAddress::Unix(path.clone()),
            ..Default::default()
        };
        tokio::spawn(MetricsServer::new(config, down_registry()).run());

        let mut stream = None;
        for _ in 0..100 {
            if let Ok(s) = tokio::net::UnixStream::connect(&path).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let mut stream = stream.expect("server did not bind the socket");

        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("nginx_up 0"));
    }
}
