//!
//! tenantgate HTTP server
//! ----------------------
//! Axum router for the auth engine.
//!
//! Responsibilities:
//! - Unauthenticated liveness and login (`POST /authorize`).
//! - Every other route sits behind the request identity middleware and checks
//!   access with an `AccessGuard` or a coarse role gate before touching data.
//! - Startup: configuration, seed loading and listener binding.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tracing::info;

use crate::config::ServerConfig;
use crate::identity::{require_identity, AuthProvider, IdentityLayer, IdentityResolver, LocalAuthProvider, TokenCodec};
use crate::security::{Argon2Verifier, CredentialVerifier};
use crate::storage::{seed, IdentityStore, SharedStore};

pub mod routes;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IdentityStore>,
    /// Token verification plus tenant/entity resolution, shared with the middleware.
    pub identity: IdentityLayer,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn IdentityStore>, codec: TokenCodec, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let resolver = IdentityResolver::new(store.clone());
        let auth = Arc::new(LocalAuthProvider::new(store.clone(), verifier, codec.clone()));
        Self { store, identity: IdentityLayer::new(codec, resolver), auth }
    }

    pub fn resolver(&self) -> &IdentityResolver { &self.identity.resolver }
}

pub fn build_router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/user", get(routes::current_user))
        .route("/user/role", get(routes::current_user_role))
        .route("/companies", get(routes::list_companies))
        .route("/company/{id}", get(routes::get_company))
        .route("/company/{id}/contractors", get(routes::get_company_contractors))
        .route("/company/{id}/jobs", get(routes::get_company_jobs))
        .route("/managers", get(routes::list_managers))
        .route("/manager/{id}", get(routes::get_manager))
        .route("/manager/{id}/company", get(routes::get_manager_company))
        .route("/manager/{id}/jobs", get(routes::get_manager_jobs))
        .route("/contractors", get(routes::list_contractors))
        .route("/contractor/{id}", get(routes::get_contractor))
        .route("/contractor/{id}/company", get(routes::get_contractor_company))
        .route("/contractor/{id}/jobs", get(routes::get_contractor_jobs))
        .route("/contractor/{id}/job/{job_id}", get(routes::get_contractor_job))
        .route("/jobs", get(routes::list_jobs))
        .route("/job/{id}", get(routes::get_job))
        .route("/job/{id}/contractors", get(routes::get_job_contractors))
        .route_layer(middleware::from_fn_with_state(state.identity.clone(), require_identity));

    Router::new()
        .route("/", get(|| async { "tenantgate ok" }))
        .route("/authorize", post(routes::authorize))
        .merge(guarded)
        .with_state(state)
}

/// Start the HTTP server with a fully resolved configuration.
pub async fn run_with_config(cfg: ServerConfig) -> anyhow::Result<()> {
    let verifier: Arc<dyn CredentialVerifier> = Arc::new(Argon2Verifier);
    let store = match &cfg.seed_path {
        Some(path) => seed::load_seed_file(path, verifier.as_ref())
            .with_context(|| format!("While loading seed file: {}", path.display()))?,
        None => {
            tracing::warn!(target: "startup", "no seed file configured; identity store starts empty");
            SharedStore::new()
        }
    };
    let codec = TokenCodec::new(&cfg.signing_secret, cfg.token_ttl).context("While building token codec")?;
    let state = AppState::new(Arc::new(store), codec, verifier);
    let app = build_router(state);

    let addr: SocketAddr = cfg.socket_addr();
    info!(target: "startup", "Starting tenantgate on {} (token ttl {}s)", addr, cfg.token_ttl.as_secs());
    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("While binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
