//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, PgIdentityAdapter},
    config::Config,
    error::ApiError,
    web::{
        active_session_handler, check_in_handler, create_elevation_handler,
        create_resource_handler, decide_elevation_handler, end_session_handler,
        list_resources_handler, pending_elevations_handler, profile_handler, require_auth,
        session_attendance_handler, start_session_handler,
        auth::{login_handler, logout_handler, signup_handler},
        rest::ApiDoc,
        state::AppState,
    },
};
use attendance_core::token::UniformTokenGenerator;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let identity_adapter = Arc::new(PgIdentityAdapter::new(db_pool.clone()));
    let token_generator = Arc::new(UniformTokenGenerator);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store: db_adapter,
        identity: identity_adapter,
        tokens: token_generator,
        config: config.clone(),
        live_broadcasts: tokio::sync::Mutex::new(HashMap::new()),
    });

    let allowed_origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {e}")))?;
    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/profile", get(profile_handler))
        .route("/sessions", post(start_session_handler))
        .route("/sessions/active", get(active_session_handler))
        .route("/sessions/{id}/end", post(end_session_handler))
        .route("/sessions/{id}/attendance", get(session_attendance_handler))
        .route("/attendance", post(check_in_handler))
        .route("/resources", get(list_resources_handler).post(create_resource_handler))
        .route("/elevations", post(create_elevation_handler))
        .route("/elevations/pending", get(pending_elevations_handler))
        .route("/elevations/{id}/decide", post(decide_elevation_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
