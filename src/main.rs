use axum::{http::StatusCode, middleware as axum_middleware, response::IntoResponse, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use lawhelp_api::config::{self, Environment};
use lawhelp_api::state::AppState;
use lawhelp_api::{chat, handlers, middleware, storage};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting LawHelp API in {:?} mode", config.environment);

    let storage = match storage::init(config).await {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Failed to initialize storage: {:#}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(config, storage);
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("LAWHELP_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("LawHelp API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // Live chat socket (authenticates via its first frame)
        .route("/ws", get(chat::ws_handler))
        .merge(auth_public_routes())
        .merge(lawyer_public_routes())
        .merge(protected_routes())
        // Global middleware
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(build_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use axum::routing::post;
    use handlers::public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify-email", post(auth::verify_email))
        .route("/api/auth/verify-2fa", post(auth::verify_two_factor))
        .route("/api/auth/password-reset/request", post(auth::password_reset_request))
        .route("/api/auth/password-reset/confirm", post(auth::password_reset_confirm))
}

fn lawyer_public_routes() -> Router<AppState> {
    use handlers::public::lawyers;

    Router::new()
        .route("/api/lawyers", get(lawyers::list))
        .route("/api/lawyers/:id", get(lawyers::show))
        .route("/api/lawyers/:id/ratings", get(lawyers::ratings))
}

fn protected_routes() -> Router<AppState> {
    use axum::routing::{patch, post};
    use handlers::protected::{chat as chat_api, lawyers, notifications, profile, two_factor};

    Router::new()
        // Profile
        .route("/api/user/profile", get(profile::get_profile).patch(profile::update_profile))
        .route("/api/user/lawyer-profile", post(lawyers::create_profile))
        // Two-factor enrollment
        .route("/api/auth/2fa/setup/totp", post(two_factor::setup_totp))
        .route("/api/auth/2fa/setup/email", post(two_factor::setup_email))
        .route("/api/auth/2fa/verify-setup", post(two_factor::verify_setup))
        .route("/api/auth/2fa/disable", post(two_factor::disable))
        // Chat history
        .route("/api/chat/sessions", post(chat_api::create_session).get(chat_api::list_sessions))
        .route("/api/chat/sessions/:id", patch(chat_api::update_session))
        .route("/api/chat/sessions/:id/messages", get(chat_api::session_messages))
        // Lawyer reviews
        .route("/api/lawyers/:id/rate", post(lawyers::rate))
        // Notifications
        .route("/api/notifications", get(notifications::list))
        .route("/api/notifications/:id/read", patch(notifications::mark_read))
        .route_layer(axum_middleware::from_fn(middleware::jwt_auth_middleware))
}

fn build_cors() -> CorsLayer {
    let config = config::config();
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    match config.environment {
        Environment::Development => CorsLayer::permissive(),
        _ => {
            let origins: Vec<axum::http::HeaderValue> = config
                .security
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
    }
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "LawHelp API",
            "version": version,
            "description": "AI legal assistant, lawyer directory and account API for Cameroon",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "metrics": "/metrics (public)",
                "auth": "/api/auth/* (public - registration, login, 2FA, password reset)",
                "lawyers": "/api/lawyers[/:id] (public directory)",
                "profile": "/api/user/profile (protected)",
                "chat": "/api/chat/sessions[/:id] (protected)",
                "notifications": "/api/notifications (protected)",
                "ws": "/ws (live chat, token auth over the socket)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "healthy",
                    "timestamp": now,
                    "uptime": state.metrics.uptime_seconds(),
                    "version": env!("CARGO_PKG_VERSION"),
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "storage unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "storage_error": e.to_string(),
                }
            })),
        ),
    }
}

async fn metrics(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::response::Response {
    match state.storage.counts().await {
        Ok(counts) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            state.metrics.render_prometheus(&counts),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to collect metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::response::Json(json!({ "error": "Failed to collect metrics" })),
            )
                .into_response()
        }
    }
}
