pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    extract::Request,
    http::{
        HeaderValue,
        header::{X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION},
    },
    middleware::{Next, from_fn, from_fn_with_state},
    response::Response,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth;
use state::AppState;

/// Hardening headers, production only
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));

    response
}

/// All routes: JSON API, Swagger UI, and the single-page app as fallback.
///
/// Files that exist under `public_dir` are served without a token. Routes
/// and the `index.html` fallback pass the auth gate; public paths go
/// straight through.
pub fn build_router(state: Arc<AppState>) -> Router {
    let gate = from_fn_with_state(state.auth_gate.clone(), user_auth::auth_gate);

    let index = Router::new()
        .fallback_service(ServeFile::new(state.public_dir.join("index.html")))
        .layer(gate.clone());
    let spa = ServeDir::new(&state.public_dir).fallback(index);

    let api = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/location", post(handlers::location))
        .route("/api/places-by-address", post(handlers::places_by_address))
        .route("/api/update", post(handlers::update))
        .route("/api/signup", post(user_auth::handlers::signup))
        .route("/api/login", post(user_auth::handlers::login))
        .route("/api/check-token", post(user_auth::handlers::check_token))
        .with_state(state.clone());

    let mut app = Router::new()
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .route_layer(gate)
        .fallback_service(spa);

    if state.production {
        app = app.layer(from_fn(security_headers));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Start HTTP server; returns after a graceful shutdown
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let production = state.production;
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(%addr, production, "Nightlife server listening");
    tracing::info!("API docs at http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
