use std::net::SocketAddr;
use std::time::Duration;

use talentdesk::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_json);

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool)?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        match app_state.user_service.ensure_admin(email, password).await {
            Ok(true) => info!(email = %email, "bootstrap admin created"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = ?e, "failed to create bootstrap admin"),
        }
    }

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.bulk_service.run_once(&state.ai_service).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "bulk screening worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    {
        let email = app_state.email_service.clone();
        tokio::spawn(async move {
            loop {
                match email.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1500)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "email outbox worker error");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });
    }

    // Keep the scheduler alive for the lifetime of the server.
    let _scheduler = app_state.maintenance().start().await?;

    info!(uploads_dir = %config.uploads_dir, matcher = ?config.matcher_provider, "starting talentdesk");
    let app = routes::app_router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
