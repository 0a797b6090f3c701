//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the asset handler as fallback for every path
//! - Wire up middleware (headers, panic catcher, request ID, tracing, limits)
//! - Gate requests through the rate limiter
//! - Bind server to listener and run until shutdown
//! - Spawn the idle-window sweeper

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeFile,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::assets::ContentRoot;
use crate::config::SiteConfig;
use crate::http::error::ErrorResponder;
use crate::http::request::{request_id, RequestUuid};
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::observability::metrics;
use crate::security::{
    rate_limit_middleware, security_headers_middleware, spawn_sweeper, RateLimiter,
    SecurityHeaders,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentRoot>,
    pub errors: Arc<ErrorResponder>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build fresh state: content root, fallback page, empty rate-limit store.
    pub async fn from_config(config: &SiteConfig) -> Self {
        let content = ContentRoot::open(&config.content.root, config.content.index_file.clone()).await;
        let errors = ErrorResponder::load(content.path(), &config.content.not_found_page).await;
        let limiter = if config.rate_limit.enabled {
            RateLimiter::from_config(&config.rate_limit)
        } else {
            RateLimiter::disabled()
        };

        Self {
            content: Arc::new(content),
            errors: Arc::new(errors),
            limiter: Arc::new(limiter),
        }
    }
}

/// HTTP server for the site.
pub struct HttpServer {
    router: Router,
    config: SiteConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub async fn new(config: SiteConfig) -> Self {
        let state = AppState::from_config(&config).await;
        Self::with_state(config, state)
    }

    /// Create a server around state built elsewhere.
    pub fn with_state(config: SiteConfig, state: AppState) -> Self {
        let router = build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// A handle on the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            content_root = %self.state.content.path().display(),
            "HTTP server starting"
        );

        let sweep_secs = self.config.rate_limit.sweep_interval_secs;
        let sweeper = (self.state.limiter.is_enabled() && sweep_secs > 0).then(|| {
            spawn_sweeper(
                self.state.limiter.clone(),
                Duration::from_secs(sweep_secs),
                shutdown.resubscribe(),
            )
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// The site router: every method and path goes to the asset handler.
pub fn build_router(config: &SiteConfig, state: AppState) -> Router {
    let assets = Router::new().fallback(serve_asset).with_state(state.clone());
    with_policies(assets, config, &state)
}

/// Wrap `routes` in the admission and delivery policy layers.
///
/// Layers run outermost first: security headers → metrics → panic catcher →
/// request id → trace → timeout → rate limiter → body limit → routes.
#[allow(deprecated)]
pub fn with_policies(routes: Router, config: &SiteConfig, state: &AppState) -> Router {
    let router = routes
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(RequestUuid))
        .layer(CatchPanicLayer::custom(ErrorResponder::panic_response))
        .layer(middleware::from_fn(metrics::track_requests));

    if config.security.enable_headers {
        router.layer(middleware::from_fn_with_state(
            Arc::new(SecurityHeaders::new()),
            security_headers_middleware,
        ))
    } else {
        router
    }
}

/// Resolve the request path and stream the file, or answer 404/500.
async fn serve_asset(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    // Only reads are served from disk; anything else falls through to 404.
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return state.errors.not_found(&path);
    }

    let asset = match state.content.resolve(&path).await {
        Ok(asset) => asset,
        Err(err) => return state.errors.respond(&path, err),
    };

    tracing::debug!(
        request_id = %request_id(&request),
        path = %path,
        file = %asset.path.display(),
        category = ?asset.category,
        "Serving asset"
    );

    let response = match ServeFile::new(&asset.path).oneshot(request).await {
        Ok(response) => response,
        Err(err) => return ErrorResponder::internal_error(&err),
    };

    match response.status() {
        // Raced with a delete between resolve and open.
        StatusCode::NOT_FOUND => state.errors.not_found(&path),
        StatusCode::INTERNAL_SERVER_ERROR => {
            ErrorResponder::internal_error(&format!("file server failed for {}", asset.path.display()))
        }
        _ => {
            let mut response = response.map(Body::new);
            asset
                .category
                .cache_directive()
                .apply(response.headers_mut());
            response
        }
    }
}
