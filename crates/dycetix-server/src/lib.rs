//! Dycetix Server
//!
//! HTTP surface for client intake and admin triage.
//!
//! # Routes
//!
//! | method | path | auth |
//! |---|---|---|
//! | POST | `/api/forms/submit/client-requirement` | open |
//! | GET | `/api/forms/client-requirements` | admin |
//! | GET | `/api/forms/client-requirements/stats` | admin |
//! | GET | `/api/forms/client-requirements/recent` | admin |
//! | GET, PATCH | `/api/forms/client-requirements/:id` | admin |
//! | GET | `/api/forms/admin/stats` | admin |
//! | GET | `/api/forms/admin/sidebar-stats` | admin |
//! | GET | `/api/forms/admin/health` | admin |
//! | GET | `/api/forms/admin/notifications/unread-count` | admin |
//!
//! Admin routes take `Authorization: Bearer <session key>`.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ServerConfig::load(None)?;
//! let state = AppState::from_config(config)?;
//! let listener = tokio::net::TcpListener::bind(state.config.socket_addr()?).await?;
//! dycetix_server::serve(listener, state).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod auth;
pub mod config;
mod error;
pub mod logging;
mod routes;
mod state;

pub use auth::Authenticated;
pub use config::{ConfigError, DatabaseBackend, ServerConfig};
pub use error::{ApiError, GENERIC_ERROR};
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let forms = Router::new()
        .route(
            "/submit/client-requirement",
            post(routes::submit_requirement),
        )
        .route("/client-requirements", get(routes::list_requirements))
        .route(
            "/client-requirements/stats",
            get(routes::requirement_stats),
        )
        .route(
            "/client-requirements/recent",
            get(routes::recent_requirements),
        )
        .route(
            "/client-requirements/:id",
            get(routes::requirement_detail).patch(routes::update_requirement),
        )
        .route("/admin/stats", get(routes::dashboard_stats))
        .route("/admin/sidebar-stats", get(routes::sidebar_stats))
        .route("/admin/health", get(routes::health))
        .route(
            "/admin/notifications/unread-count",
            get(routes::unread_count),
        );

    let body_limit = state.config.intake.max_body_bytes;
    Router::new()
        .nest("/api/forms", forms)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until ctrl-c or SIGTERM
///
/// # Errors
/// Propagates accept-loop I/O failures.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let app = build_router(state);
    tracing::info!(address = %listener.local_addr()?, "Server running");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
