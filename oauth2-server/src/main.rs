use axum::middleware;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use log::{error, info};
use oauth2_engine::{Client, MockEngine, User};
use oauth2_server::config::Settings;
use oauth2_server::{MemoryModel, OAuth2Server, OAuthState, ServerOptions, StartupError};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

/// Entries kept per store in the demo model
const STORE_CAPACITY: u64 = 10_000;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("Server shutdown complete");
}

async fn run() -> Result<(), StartupError> {
    // Load configuration
    let settings = Settings::new()?;

    let mut options = ServerOptions::from_config(&settings.oauth);
    let model = demo_model(options.engine.refresh_token_lifetime());
    options = options.with_model(Arc::new(model));
    let server = OAuth2Server::<MockEngine>::new(options)?;

    let app = create_app(&server);

    // Build server address
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Start the server and wait for it to finish
    info!("Server running on {}, press Ctrl+C to stop", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Seeds the demo model with one web client, one service client and one user
fn demo_model(ttl_secs: u64) -> MemoryModel {
    let web = Client {
        id: "demo-app".to_string(),
        redirect_uris: vec!["http://localhost:3000/callback".to_string()],
        grants: vec![
            "authorization_code".to_string(),
            "password".to_string(),
            "refresh_token".to_string(),
        ],
        access_token_lifetime: None,
        refresh_token_lifetime: None,
    };
    let service = Client {
        id: "demo-service".to_string(),
        redirect_uris: vec![],
        grants: vec!["client_credentials".to_string()],
        access_token_lifetime: None,
        refresh_token_lifetime: None,
    };

    MemoryModel::new(ttl_secs, STORE_CAPACITY)
        .with_client(web, "demo-secret")
        .with_client(service, "demo-secret")
        .with_user(User::new("demo"), "demo")
        .with_scopes(["read", "write"])
}

/// Create the demo router around an adapter
fn create_app(server: &OAuth2Server<MockEngine>) -> Router {
    let token = Router::new()
        .route("/oauth/token", post(unreachable_handler))
        .route_layer(middleware::from_fn(server.token(None)));

    let authorize = Router::new()
        .route(
            "/oauth/authorize",
            get(unreachable_handler).post(unreachable_handler),
        )
        .route_layer(middleware::from_fn(server.authorize(None)));

    let secret = Router::new()
        .route("/secret", get(secret_handler))
        .route_layer(middleware::from_fn(server.authenticate()));

    Router::new().merge(token).merge(authorize).merge(secret)
}

/// Only reached with `continue_middleware` enabled
async fn unreachable_handler(Extension(state): Extension<OAuthState>) -> Json<Value> {
    Json(json!({
        "token": state.token.map(|token| token.access_token),
        "code": state.code.map(|code| code.authorization_code),
    }))
}

async fn secret_handler(Extension(state): Extension<OAuthState>) -> Json<Value> {
    let user = state.token.map(|token| token.user.id).unwrap_or_default();
    Json(json!({ "message": "Secret area", "user": user }))
}

// Simple signal handler that works on all platforms
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
