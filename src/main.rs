use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use eduvoice::{
    api::{AppState, create_router},
    config::{Config, LoggingConfig},
    llm_service::LlmService,
    providers::{DeepgramClient, GroqClient, MurfClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging before anything that wants to log
    let logging_config = LoggingConfig::from_env();
    let _guard = setup_logging(&logging_config)?;

    let config = Config::from_env()?;
    config.validate()?;

    info!("Starting EduVoice server...");
    info!(
        deepgram_configured = !config.providers.deepgram_api_key.is_empty(),
        groq_configured = !config.providers.groq_api_key.is_empty(),
        murf_configured = !config.providers.murf_api_key.is_empty(),
        "Provider credentials"
    );

    // Initialize provider clients
    let speech = DeepgramClient::new(config.providers.deepgram_api_key.clone());
    let llm = LlmService::new(GroqClient::new(config.providers.groq_api_key.clone()));
    let voice = MurfClient::new(config.providers.murf_api_key.clone());

    let state = AppState::new(speech, llm, voice);

    // Build the application router with CORS restricted to the frontend
    let cors = match config.server.frontend_origin.parse() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(
                origin = %config.server.frontend_origin,
                "FRONTEND_URL is not a valid origin, allowing any origin"
            );
            CorsLayer::permissive()
        }
    };

    let app = create_router(state).layer(ServiceBuilder::new().layer(cors));

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    // Set up file appender with daily rotation
    let (file_layer, guard) = if config.file_enabled {
        if let Err(e) = std::fs::create_dir_all(&config.log_directory) {
            eprintln!("Warning: Could not create logs directory: {}", e);
        }
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "eduvoice.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        log_directory = %config.log_directory,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(guard)
}
