//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, origin access, security headers, limits, tracing)
//! - Gate data and relay routes behind bearer authentication
//! - Bind to a listener and shut down gracefully
//!
//! # Layer order (outermost first)
//! ```text
//! request id → cors → security headers → body limit → trace → [auth] → handler
//! ```

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware,
    routing::{any, delete, get, post},
    Extension, Json, Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::schema::DEFAULT_JWT_SECRET;
use crate::config::ServiceConfig;
use crate::http::request::RequestIdExt;
use crate::http::{data, debug, request};
use crate::relay::{RelayExecutor, RelayRequest, RelayResult};
use crate::security::access_control::require_auth;
use crate::security::cors::cors_middleware;
use crate::security::origin::OriginEntryError;
use crate::security::{headers, limits, AllowList, CallerContext, OriginPolicy, TokenVerifier};
use crate::store::{DataStore, MemoryStore};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid allowed origin: {0}")]
    AllowList(#[from] OriginEntryError),

    #[error("failed to load data file: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayExecutor>,
    pub store: Arc<dyn DataStore>,
}

/// HTTP server for the relay and its data routes.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    store: Arc<dyn DataStore>,
}

impl HttpServer {
    /// Create a server with a fresh relay client and the configured store.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let relay = Arc::new(RelayExecutor::new(&config.relay)?);
        let store: Arc<dyn DataStore> = match &config.storage.data_file {
            Some(path) => Arc::new(MemoryStore::load_from_file(path)?),
            None => Arc::new(MemoryStore::new(None)),
        };
        Self::with_parts(config, relay, store)
    }

    /// Create a server around an existing executor and store.
    pub fn with_parts(
        config: ServiceConfig,
        relay: Arc<RelayExecutor>,
        store: Arc<dyn DataStore>,
    ) -> Result<Self, ServerError> {
        let allow_list = AllowList::new(&config.cors.allowed_origins)?;
        let policy = Arc::new(OriginPolicy::new(allow_list, config.cors.dev_mode));
        if policy.allow_list().is_empty() {
            tracing::warn!("No allowed origins configured; every origin will be permitted");
        } else {
            tracing::info!(
                entries = policy.allow_list().len(),
                dev_mode = policy.dev_mode(),
                "Origin policy loaded"
            );
        }
        if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("Using the default JWT secret; set JWT_SECRET in production");
        }

        let verifier = Arc::new(TokenVerifier::new(&config.auth.jwt_secret));
        let state = AppState {
            relay,
            store: store.clone(),
        };

        let router = Self::build_router(&config, state, policy, verifier);
        Ok(Self {
            router,
            config,
            store,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ServiceConfig,
        state: AppState,
        policy: Arc<OriginPolicy>,
        verifier: Arc<TokenVerifier>,
    ) -> Router {
        let protected = Router::new()
            .route("/api/proxy", post(relay_handler))
            .route(
                "/api/history",
                get(data::get_history)
                    .post(data::add_history)
                    .delete(data::clear_history),
            )
            .route(
                "/api/collections",
                get(data::get_collections).post(data::create_collection),
            )
            .route("/api/collections/{id}", delete(data::delete_collection))
            .route("/api/collections/{id}/items", post(data::add_collection_item))
            .route_layer(middleware::from_fn_with_state(verifier, require_auth));

        let mut public = Router::new()
            .route("/", get(debug::root))
            .route("/api", get(debug::api_index));
        if config.cors.dev_mode {
            public = public.route("/api/debug/echo", any(debug::echo));
        }

        let router = public
            .merge(protected)
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "http",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %req.request_id(),
                )
            }));

        let router = limits::apply(router, config.security.max_body_size);
        let router = headers::apply(router, config.security.enable_headers);
        let router = router.layer(middleware::from_fn_with_state(policy, cors_middleware));
        request::apply(router)
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then flush the store.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            dev_mode = self.config.cors.dev_mode,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        if let Err(e) = self.store.flush() {
            tracing::error!(error = %e, "Failed to persist store on shutdown");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Relay handler. The outer status always mirrors the envelope's `status`.
async fn relay_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    body: Bytes,
) -> (StatusCode, Json<RelayResult>) {
    let descriptor = RelayRequest::from_slice_lenient(&body);
    tracing::debug!(user = %caller.user_id, "Relay requested");

    let result = state.relay.execute(descriptor).await;
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(result))
}
