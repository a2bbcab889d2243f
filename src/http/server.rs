//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every endpoint
//! - Wire up middleware (tracing, request id, metrics, panic recovery,
//!   rate limiting, authentication, timeouts, body limit)
//! - Serve on a listener until the shutdown coordinator says stop

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, Request},
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::data::permissions::{MOVIES_READ, MOVIES_WRITE};
use crate::data::Models;
use crate::http::handlers::{self, healthcheck, movies, tokens, users};
use crate::http::middleware::{authenticate, recover_panic, require_permission, track_metrics};
use crate::http::request::BodyLimit;
use crate::lifecycle::{BackgroundJobs, ShutdownCoordinator, ShutdownError};
use crate::mailer::Mailer;
use crate::security::rate_limit::{rate_limit_middleware, TokenBucketRegistry};
use crate::security::Authenticator;
use crate::storage::Engine;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub models: Models,
    pub authenticator: Authenticator,
    pub mailer: Arc<dyn Mailer>,
    pub jobs: BackgroundJobs,
}

impl AppState {
    pub fn new(config: AppConfig, engine: &Engine, mailer: Arc<dyn Mailer>, jobs: BackgroundJobs) -> Self {
        let models = Models::new(engine, config.storage.query_timeout());
        let authenticator = Authenticator::new(models.users.clone(), models.permissions.clone());
        Self {
            config: Arc::new(config),
            models,
            authenticator,
            mailer,
            jobs,
        }
    }
}

/// The API server.
pub struct HttpServer {
    router: Router,
    state: AppState,
    limiter: Option<Arc<TokenBucketRegistry>>,
    coordinator: ShutdownCoordinator,
}

impl HttpServer {
    pub fn new(config: AppConfig, engine: Engine, mailer: Arc<dyn Mailer>) -> Self {
        let jobs = BackgroundJobs::new();
        let coordinator = ShutdownCoordinator::new(config.shutdown.grace_period(), jobs.clone());
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(TokenBucketRegistry::from_config(&config.rate_limit)));

        let state = AppState::new(config, &engine, mailer, jobs);
        let router = build_router(state.clone(), limiter.clone());

        Self {
            router,
            state,
            limiter,
            coordinator,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn coordinator(&self) -> &ShutdownCoordinator {
        &self.coordinator
    }

    /// Serve until shutdown completes.
    pub async fn run(self, listener: TcpListener) -> Result<(), ShutdownError> {
        let addr = listener.local_addr()?;
        let config = &self.state.config;
        tracing::info!(
            address = %addr,
            env = %config.listener.environment,
            rate_limit = config.rate_limit.enabled,
            "HTTP server starting"
        );

        let token = self.coordinator.token();
        let sweeper = self.limiter.as_ref().map(|limiter| {
            limiter.spawn_eviction(config.rate_limit.sweep_interval(), token.child_token())
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .into_future();

        let result = self.coordinator.run(server).await;

        token.cancel();
        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }
        if result.is_ok() {
            tracing::info!("HTTP server stopped");
        }
        result
    }
}

/// Build the router and its middleware stack.
///
/// Layers added later wrap the ones added before, so the stack below reads
/// innermost first.
#[allow(deprecated)]
pub fn build_router(state: AppState, limiter: Option<Arc<TokenBucketRegistry>>) -> Router {
    let config = Arc::clone(&state.config);
    let max_body = config.security.max_body_size;

    let read_movies = Router::new()
        .route("/v1/movies", get(movies::list_movies))
        .route("/v1/movies/{id}", get(movies::show_movie))
        .route_layer(middleware::from_fn_with_state(MOVIES_READ, require_permission));

    let write_movies = Router::new()
        .route("/v1/movies", post(movies::create_movie))
        .route(
            "/v1/movies/{id}",
            axum::routing::patch(movies::update_movie).delete(movies::delete_movie),
        )
        .route_layer(middleware::from_fn_with_state(MOVIES_WRITE, require_permission));

    let mut router = Router::new()
        .route("/v1/healthcheck", get(healthcheck::healthcheck))
        .merge(read_movies)
        .merge(write_movies)
        .route("/v1/users", post(users::register_user))
        .route("/v1/users/activated", put(users::activate_user))
        .route(
            "/v1/users/authentication",
            post(tokens::create_authentication_token),
        )
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .with_state(state.clone())
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(Extension(BodyLimit(max_body)))
        .layer(middleware::from_fn_with_state(
            state.authenticator.clone(),
            authenticate,
        ));

    if let Some(limiter) = limiter {
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
    }

    let request_id = HeaderName::from_static(X_REQUEST_ID);
    router
        .layer(middleware::from_fn(recover_panic))
        .layer(middleware::from_fn(track_metrics))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}
