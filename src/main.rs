use dotenvy::dotenv;
use tracing::info;

use subscription_sync::infra::{
    app::create_app,
    config::AppConfig,
    maintenance::{run_change_log_loop, run_processed_event_sweep_loop},
    setup::{init_app_state, init_tracing},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env();
    init_tracing(config.log_file.as_deref());

    let app_state = init_app_state(config).await?;

    let bind_addr = app_state.config.bind_addr;

    let app = create_app(app_state.clone());

    // Spawn background tasks (after tracing is initialized)
    tokio::spawn(run_processed_event_sweep_loop(
        app_state.subscription_sync_use_cases.clone(),
        app_state.config.sweep_interval,
        app_state.config.processed_event_retention,
    ));
    tokio::spawn(run_change_log_loop(app_state.change_feed.subscribe()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Subscription sync listening at {}", &listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
