use pulsevote::auth::{RateLimiters, SledUserRepository, TokenIssuer, UserRepository};
use server_http::{build_router, AppState};
use shared::config::Config;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How often stale rate-limit windows are swept
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting PulseVote HTTP Server...");

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    if let Err(e) = run().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment variables
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config);

    let user_repo = init_user_repository(&config.data_dir)?;
    let tokens = Arc::new(TokenIssuer::new(&config.jwt_secret));
    let limiters = Arc::new(RateLimiters::new(
        config.register_limit.into(),
        config.login_limit.into(),
    ));

    spawn_limiter_sweeper(limiters.clone());

    let state =
        AppState::new(user_repo, tokens, limiters).with_trusted_proxies(config.trusted_proxies);
    let router = build_router(state, &config.allowed_origins);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!("HTTP Server listening on http://{}", address);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_user_repository(data_dir: &str) -> Result<Arc<dyn UserRepository>, Box<dyn std::error::Error>> {
    let base_path = Path::new(data_dir);
    std::fs::create_dir_all(base_path)?;

    let repo = SledUserRepository::new(base_path.join("users.sled"))?;
    info!("User store opened at {}", base_path.join("users.sled").display());

    Ok(Arc::new(repo))
}

fn spawn_limiter_sweeper(limiters: Arc<RateLimiters>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            limiters.cleanup();
        }
    });
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
