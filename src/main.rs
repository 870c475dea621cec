use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use tramitex::{
    auth::jwt::JwtService,
    config::AppConfig,
    db,
    mailer::{HttpMailer, NoopMailer, Notifier},
    routes,
    s3::build_client,
    state::AppState,
    storage::S3Storage,
    tracking::RandomCodeGenerator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        s3_bucket = %config.s3_bucket,
        mail_enabled = config.mail_api_url.is_some(),
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let s3_client = build_client(&config).await?;
    let storage = Arc::new(S3Storage::new(
        s3_client,
        config.s3_bucket.clone(),
        config.aws_endpoint_url.clone(),
    ));
    let mailer: Arc<dyn Notifier> = match config.mail_api_url.clone() {
        Some(api_url) => Arc::new(HttpMailer::new(
            api_url,
            config.mail_api_token.clone(),
            config.mail_from.clone(),
        )),
        None => Arc::new(NoopMailer),
    };
    let jwt = JwtService::from_config(&config)?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(
        pool,
        config,
        storage,
        mailer,
        Arc::new(RandomCodeGenerator),
        jwt,
    );
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "tramitex API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("received shutdown signal");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
