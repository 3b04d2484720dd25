use std::sync::Arc;

use sigdash::{
    dashboard_router, init_logging, log_app_bind, log_app_start, log_app_stop,
    log_backend_selected, log_shutdown_signal_error, BackendProxy, DashboardConfig,
    DashboardOptions, LoggingConfig, MarketPoller, ReqwestSnapshotFetcher, SnapshotStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = LoggingConfig::from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let cfg = DashboardConfig::from_env()?;
    log_backend_selected(&cfg);

    let store = SnapshotStore::new();
    let fetcher = ReqwestSnapshotFetcher::new(cfg.data_url())?;
    let mut poller = MarketPoller::spawn(fetcher, store.clone(), cfg.poll_interval());

    let options = DashboardOptions {
        refresh_interval_ms: cfg.poll_interval_ms,
        backend_proxy: Some(BackendProxy::new(
            reqwest::Client::new(),
            cfg.backend_api_url.clone(),
        )),
    };
    let app = dashboard_router(Arc::new(store), options);

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    let bound_addr = listener.local_addr()?;
    log_app_bind(bound_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    poller.stop();
    log_app_stop();
    served?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log_shutdown_signal_error(&err);
        std::future::pending::<()>().await;
    }
}
