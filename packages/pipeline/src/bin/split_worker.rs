use tracing_subscriber::EnvFilter;

use mailsplit_pipeline::config::WorkerConfig;
use mailsplit_pipeline::health;
use mailsplit_pipeline::worker::run_split_worker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let health_addr = ("0.0.0.0", config.health_port);
    match tokio::net::TcpListener::bind(health_addr).await {
        Ok(listener) => {
            tracing::info!(port = config.health_port, action = %config.split_action, "health endpoint listening");
            tokio::spawn(health::serve(listener, config.split_action.clone()));
        }
        // The worker still runs without its health endpoint
        Err(e) => tracing::error!(port = config.health_port, error = %e, "failed to bind health endpoint"),
    }

    if let Err(e) = run_split_worker(config).await {
        tracing::error!(error = %e, "split worker exited with error");
        std::process::exit(1);
    }
}
