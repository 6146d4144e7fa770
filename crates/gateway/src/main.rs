//! Cognify API Gateway
//!
//! The HTTP front for the study assistant.
//! Handles:
//! - Authentication (Bearer JWT)
//! - Rate limiting of AI-backed routes
//! - Request routing
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use cognify_common::{
    ai::create_llm_client,
    attempt::AttemptLimits,
    auth::JwtManager,
    config::{AppConfig, StoreBackend},
    db::{DbPool, Repository},
    metrics,
    store::{DocumentStore, MemoryStore},
    AiFlows, StudyService,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{create_rate_limiter, rate_limit_middleware};

/// Uploads per multipart request, used to size the body limit
const MAX_FILES_PER_UPLOAD: usize = 10;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: StudyService,
    pub jwt: Arc<JwtManager>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting Cognify API Gateway v{}",
        cognify_common::VERSION
    );

    if config.observability.metrics_port > 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    let store = connect_store(&config).await?;
    let llm = create_llm_client(&config.ai)?;
    info!(model = llm.model_name(), "AI client ready");

    let flows = AiFlows::new(llm, config.ai.enforce_question_count);
    let service = StudyService::new(
        store,
        flows,
        config.acquisition.clone(),
        AttemptLimits::from(&config.attempts),
    )?;

    let jwt_secret = config
        .auth
        .jwt_secret
        .as_deref()
        .context("auth.jwt_secret is required")?;
    let jwt = Arc::new(JwtManager::new(jwt_secret, config.auth.jwt_expiration_secs));

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        service,
        jwt,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Open connections get `shutdown_timeout` to drain after the signal
    let shutdown_timeout = config.shutdown_timeout();
    let (draining_tx, draining_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = draining_tx.send(());
        })
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = async {
            if draining_rx.await.is_ok() {
                tokio::time::sleep(shutdown_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Shutdown timeout elapsed, dropping open connections"
            );
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("ai_duration_seconds".to_string()),
            metrics::AI_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("assessment_score".to_string()),
            metrics::SCORE_BUCKETS,
        )?
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.database.backend {
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let pool = DbPool::new(&config.database).await?;
            if config.database.run_migrations {
                pool.run_migrations().await?;
            }
            Ok(Arc::new(Repository::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let upload_limit = config
        .acquisition
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_UPLOAD);

    // Routes that call the model
    let mut ai_routes = Router::new()
        .route("/materials/text", post(handlers::materials::create_from_text))
        .route("/materials/url", post(handlers::materials::create_from_url))
        .route(
            "/materials/{id}/study-guide",
            post(handlers::study::generate_study_guide),
        )
        .route(
            "/materials/{id}/assessments",
            post(handlers::study::generate_assessment),
        )
        .route("/materials/{id}/evaluations", post(handlers::study::evaluate))
        .route("/materials/{id}/attempts", post(handlers::attempts::open_attempt))
        .route("/attempts/{id}/submit", post(handlers::attempts::submit_attempt))
        .route("/chat", post(handlers::chat::ask));

    // Batch uploads run one model call chain per file, so they are bounded
    // per file rather than by the request timeout
    let mut upload_routes = Router::new().route(
        "/materials/files",
        post(handlers::materials::upload_files).layer(DefaultBodyLimit::max(upload_limit)),
    );

    if config.rate_limit.enabled {
        let limiter = create_rate_limiter(
            config.rate_limit.ai_requests_per_second,
            config.rate_limit.burst,
        );
        ai_routes = ai_routes.route_layer(axum::middleware::from_fn_with_state(
            limiter.clone(),
            rate_limit_middleware,
        ));
        upload_routes = upload_routes.route_layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Materials
        .route("/materials", get(handlers::materials::list_materials))
        .route("/materials/{id}", get(handlers::materials::get_material))
        .route("/materials/{id}/tests", get(handlers::history::past_tests))
        .route("/tests/{id}", get(handlers::history::past_test))
        // Attempts
        .route("/attempts/{id}", get(handlers::attempts::attempt_status))
        .route("/attempts/{id}/answers", put(handlers::attempts::record_answer))
        // Dashboard
        .route("/history", get(handlers::history::history))
        .route("/progress", get(handlers::history::progress))
        .merge(ai_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .merge(upload_routes);

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .route_layer(axum::middleware::from_fn(
            middleware::metrics::track_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
