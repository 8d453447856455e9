mod api;
mod dispatcher;
mod downstream;
mod error;
mod item;
mod queue;
mod strategy;

use crate::dispatcher::{Dispatch, Dispatcher};
use crate::downstream::DownstreamClient;
use crate::error::ProxyError;
use crate::queue::QueueSet;
use crate::strategy::{Strategy, StrategyRegister};
use actix_web::{App, HttpServer, ResponseError, web};
use std::env;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub downstream_url: String,
    pub downstream_timeout_secs: u64,
    pub initial_strategy: Strategy,
    pub batch_timeout_ms: u64,
    pub idle_poll_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
        let downstream_url = env::var("DOWNSTREAM_URL").unwrap_or_else(|_| "http://localhost:8001/classify".into());
        let downstream_timeout_secs = env::var("DOWNSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let initial_strategy = env::var("PROXY_STRATEGY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Strategy::Sjf);
        let batch_timeout_ms = env::var("BATCH_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);
        let idle_poll_ms = env::var("IDLE_POLL_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        Self {
            bind_addr,
            downstream_url,
            downstream_timeout_secs,
            initial_strategy,
            batch_timeout_ms,
            idle_poll_ms,
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cfg = AppConfig::default();
    let queues = Arc::new(Mutex::new(QueueSet::new()));
    let strategy = Arc::new(StrategyRegister::new(cfg.initial_strategy));
    let downstream = Arc::new(DownstreamClient::new(
        cfg.downstream_url.clone(),
        Duration::from_secs(cfg.downstream_timeout_secs),
    ));
    let shutdown = Arc::new(AtomicBool::new(false));

    let dispatch = Arc::new(Dispatch::new(queues.clone(), strategy.clone()));

    Dispatcher::new(
        queues,
        strategy,
        downstream,
        Duration::from_millis(cfg.idle_poll_ms),
        Duration::from_millis(cfg.batch_timeout_ms),
        shutdown.clone(),
    )
    .run();

    tracing::info!(
        "starting proxy on {} \u{2192} downstream {} (strategy={}, batch_timeout={}ms)",
        cfg.bind_addr,
        cfg.downstream_url,
        cfg.initial_strategy,
        cfg.batch_timeout_ms,
    );

    let bind_addr = cfg.bind_addr.clone();
    let result = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(dispatch.clone()))
            .app_data(json_config())
            .configure(api::configure)
    })
    .bind(bind_addr)?
    .run()
    .await;

    shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    result
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        actix_web::error::InternalError::from_response(
            err.to_string(),
            ProxyError::InvalidBody(err.to_string()).error_response(),
        )
        .into()
    })
}
