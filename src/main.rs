use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tenantpool::{Config, PoolRegistry, PostgresConnector, Server, ServiceFacade};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "tenantpool";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = setup().await?;
    run_forever(config).await
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

async fn setup() -> std::io::Result<Config> {
    // Tracing needs the log level, so config comes first; its errors go to
    // stderr directly.
    let config = Config::load().await.map_err(|e| {
        eprintln!("{APP_NAME}: {e}");
        std::io::Error::other(e)
    })?;

    init_tracing(&config);
    Ok(config)
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(config.log_level.as_str())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run_forever(config: Config) -> std::io::Result<()> {
    let registry = Arc::new(PoolRegistry::new(PostgresConnector, config.pool.clone()));
    let facade = Arc::new(ServiceFacade::new(registry.clone(), config.release_dsn.clone()));

    let server = match Server::bind(config.listen_addr, facade) {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind {}: {e}", config.listen_addr);
            return Err(e);
        }
    };

    info!("{} starting on {}", APP_NAME, config.listen_addr);

    server
        .serve(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("ctrl_c handler failed, serving until killed: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    let closed = registry.close_all();
    info!("{} shutting down, closed {closed} pools", APP_NAME);

    Ok(())
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
