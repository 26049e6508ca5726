//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DocxWriter, FileDocumentReader, FileEventLog, JsonAccountStore, OpenAiOracleAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        auth::ensure_admin_account,
        build_router,
        rest::ApiDoc,
        state::{AppState, SessionRegistry},
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use translation_workflow_core::ports::{AccountStore, EventLog, TranslationOracle};
use translation_workflow_core::workflow::TranslationWorkflow;
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

    // --- 2. Open the Account Store & Access Log ---
    let accounts: Arc<dyn AccountStore> =
        Arc::new(JsonAccountStore::open(config.user_db_file.clone()).await?);
    let events: Arc<dyn EventLog> = Arc::new(FileEventLog::new(config.log_file.clone()));
    if ensure_admin_account(accounts.as_ref(), config.admin_password.as_deref()).await? {
        info!("Bootstrap admin account created from ADMIN_PASSWORD.");
    }

    // --- 3. Initialize Service Adapters ---
    let oracle: Option<Arc<dyn TranslationOracle>> = match config.gemini_api_key.as_deref() {
        Some(api_key) => {
            let client = OpenAiOracleAdapter::client_for(api_key, &config.oracle_base_url);
            let adapter: Arc<dyn TranslationOracle> = Arc::new(OpenAiOracleAdapter::new(
                client,
                config.oracle_model.clone(),
            ));
            Some(adapter)
        }
        None => {
            warn!("GEMINI_API_KEY is not set; translation actions will fail until it is configured.");
            None
        }
    };

    let workflow = TranslationWorkflow::new(
        oracle,
        Arc::new(FileDocumentReader::new()),
        Arc::new(DocxWriter::new()),
        events.clone(),
    )
    .with_oracle_timeout(config.oracle_timeout);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        workflow,
        accounts,
        events,
        sessions: SessionRegistry::new(),
    });

    // --- 5. Create the Web Router ---
    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = build_router(app_state).layer(cors);

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
