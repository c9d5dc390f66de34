//! NGINX Prometheus Exporter CLI
//!
//! Resolves configuration, connects to NGINX (retrying if asked to) and
//! serves metrics until interrupted.

use clap::Parser;
use nginx_exporter::{
    bootstrap::create_with_retries,
    client::{build_http_client, PlusClient, StatusSource, StubStatusClient},
    collector::StatusCollector,
    config::{Cli, ExporterConfig},
    metrics::{ExporterRegistry, MetricsServer, MetricsServerConfig},
};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    info!("Starting NGINX Prometheus Exporter v{}", nginx_exporter::VERSION);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.resolve()?;

    info!(
        plus = config.plus,
        scrape_uri = %config.scrape_uri,
        listen = %config.listen_address,
        "Configuration loaded"
    );

    // The blocking HTTP client must be created and dropped outside the
    // async runtime.
    let source = connect(&config)?;
    let collector =
        StatusCollector::new(source, config.namespace(), &config.const_labels_map())?;
    let registry = ExporterRegistry::new(collector)?;

    let server = MetricsServer::new(
        MetricsServerConfig {
            listen_address: config.listen_address.clone(),
            telemetry_path: config.telemetry_path.clone(),
        },
        registry.clone(),
    );

    let runtime = tokio::runtime::Runtime::new()?;
    info!("NGINX Prometheus Exporter has successfully started");
    let result = runtime.block_on(server.run());
    drop(runtime);
    drop(registry);

    result?;
    Ok(())
}

fn connect(config: &ExporterConfig) -> Result<Box<dyn StatusSource>, Box<dyn std::error::Error>> {
    let http = build_http_client(&config.http_settings())?;

    let source: Box<dyn StatusSource> = if config.plus {
        let client = create_with_retries(
            || PlusClient::connect(http.clone(), &config.scrape_uri),
            config.retries,
            config.retry_interval,
        )
        .map_err(|e| format!("Could not create NGINX Plus client: {e}"))?;
        info!(version = client.version(), "Connected to NGINX Plus API");
        Box::new(client)
    } else {
        let client = create_with_retries(
            || StubStatusClient::connect(http.clone(), config.scrape_uri.clone()),
            config.retries,
            config.retry_interval,
        )
        .map_err(|e| format!("Could not create NGINX client: {e}"))?;
        info!(uri = client.uri(), "Connected to NGINX stub_status");
        Box::new(client)
    };

    Ok(source)
}
