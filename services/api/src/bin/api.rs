//! services/api/src/bin/api.rs

use chat_api_lib::{
    adapters::{DbAdapter, GeminiChatAdapter},
    auth::AuthService,
    config::Config,
    error::ApiError,
    web::{router, AppState},
};
use chat_core::chat::ChatOrchestrator;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "{},tower_http=debug",
            config.log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(
        environment = ?config.environment,
        jwt = ?config.jwt,
        model = %config.chat_model,
        "Configuration loaded. Starting server..."
    );

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let gemini_api_key = config
        .gemini_api_key
        .as_deref()
        .ok_or_else(|| ApiError::Internal("GEMINI_API_KEY is required".to_string()))?;
    let generator = Arc::new(GeminiChatAdapter::new(
        gemini_api_key,
        &config.llm_api_base,
        config.chat_model.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        auth: AuthService::new(db_adapter.clone(), config.jwt.clone()),
        chat: ChatOrchestrator::new(db_adapter, generator, config.guest_user_id),
        config: config.clone(),
    });

    app_state.check_guest_user().await?;
    info!("Guest user {} is provisioned.", config.guest_user_id);

    // --- 5. Create the Web Router ---
    let app = router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    if config.swagger_enabled() {
        info!(
            "Swagger UI available at http://{}/swagger-ui",
            config.bind_address
        );
    }
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
