use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sqlab_api::state::{AppConfig, AppState};
use sqlab_sandbox::connect::SandboxConfig;

/// SQLab grading service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SQLab grading service");

    let config = load_config()?;

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    let app = sqlab_api::create_router(state);

    let port = if env::var("SERVER_PORT").is_ok() {
        config.server_port
    } else {
        args.port
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let dev_mode = env::var("DEV_MODE").unwrap_or_else(|_| "false".to_string()) == "true";

    // Generate a random key in dev mode; in production, fail fast when the
    // key material is missing.
    let credential_key = env::var("CREDENTIAL_ENCRYPTION_KEY").unwrap_or_else(|_| {
        if dev_mode {
            use rand::RngCore;
            let mut key = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut key);
            info!("DEV MODE: Generated random CREDENTIAL_ENCRYPTION_KEY");
            hex::encode(key)
        } else {
            panic!("Security error: CREDENTIAL_ENCRYPTION_KEY environment variable must be set for production. Cannot use default or generated keys.");
        }
    });

    let sandbox = SandboxConfig {
        host: env::var("SANDBOX_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port: env::var("SANDBOX_PORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse()
            .context("invalid SANDBOX_PORT")?,
        admin_user: env::var("SANDBOX_ADMIN_USER").unwrap_or_else(|_| "postgres".to_string()),
        admin_password: env::var("SANDBOX_ADMIN_PASSWORD")
            .context("SANDBOX_ADMIN_PASSWORD environment variable must be set")?,
        statement_timeout_ms: env::var("STATEMENT_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .context("invalid STATEMENT_TIMEOUT_MS")?,
    };

    Ok(AppConfig {
        database_url: env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/sqlab".to_string()),
        credential_key,
        student_role_id: env::var("STUDENT_ROLE_ID")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("invalid STUDENT_ROLE_ID")?,
        sandbox,
        server_port: env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("invalid SERVER_PORT")?,
    })
}
