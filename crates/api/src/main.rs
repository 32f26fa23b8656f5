use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pezo_core::llm::openai::OpenAiClient;
use pezo_core::llm::DecisionClient;
use pezo_core::quota::redis::RedisCounterStore;
use pezo_core::quota::{CounterStore, QuotaGate, UnlimitedStore};

mod error;
mod request_id;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pezo_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // Rate limiting is availability-over-strictness: without a usable
    // counter store the gate admits everything.
    let store: Arc<dyn CounterStore> = match settings.redis_url.as_deref() {
        Some(url) => match RedisCounterStore::connect(url) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::warn!(error = %e, "counter store unusable; rate limiting disabled");
                Arc::new(UnlimitedStore)
            }
        },
        None => {
            tracing::warn!("REDIS_URL missing; rate limiting disabled");
            Arc::new(UnlimitedStore)
        }
    };

    let llm: Option<Arc<dyn DecisionClient>> = match OpenAiClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "upstream credential missing; starting API in degraded mode");
            None
        }
    };

    let state = routes::AppState {
        quota: QuotaGate::new(store),
        llm,
    };

    let (set_request_id, propagate_request_id) = request_id::layers();
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &pezo_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
