use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hoplink::{Config, Server};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hoplink=info,access=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hoplink {}...", hoplink::PKG_VERSION);

    let config = Config::from_env()?;
    config.log_summary();

    // Multi-threaded runtime: the startup sweep probes targets in parallel
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::new(config).await?;
    info!("Loaded {} redirect records", server.record_count());

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
