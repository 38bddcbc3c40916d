use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use brief_agent::adapters::http::{api_router, BriefHandlers};
use brief_agent::adapters::{
    GeminiConfig, GeminiProvider, HttpCampaignRegistry, InMemorySessionStore, PostgresSessionStore,
};
use brief_agent::application::{BackoffExecutor, ModelGateway, PersistenceBridge, ProcessTurnHandler};
use brief_agent::config::{AppConfig, LogFormat, ServerConfig, StoreBackend, ValidationError};
use brief_agent::ports::{AIProvider, CampaignRegistry, SessionStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let store = build_store(&config).await?;
    let provider = build_provider(&config)?;
    let registry = build_registry(&config)?;

    let info = provider.provider_info();
    tracing::info!(
        provider = %info.name,
        model = %info.model,
        store = ?config.store.backend,
        registration = registry.is_some(),
        "Starting brief agent"
    );

    let handler = ProcessTurnHandler::new(
        store.clone(),
        ModelGateway::new(provider, config.ai.temperature),
        BackoffExecutor::new(config.retry.policy()),
        PersistenceBridge::new(store, registry),
    );
    let app = api_router(BriefHandlers::new(Arc::new(handler)), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    match server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>, BoxError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions are lost on restart");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .as_deref()
                .ok_or(ValidationError::MissingRequired("STORE__DATABASE_URL"))?;
            let store = PostgresSessionStore::connect(url, config.store.max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}

fn build_provider(config: &AppConfig) -> Result<Arc<dyn AIProvider>, BoxError> {
    let key = config
        .ai
        .gemini_api_key
        .clone()
        .ok_or(ValidationError::MissingRequired("AI__GEMINI_API_KEY"))?;

    let provider = GeminiProvider::new(
        GeminiConfig::from_secret(key)
            .with_model(&config.ai.model)
            .with_base_url(&config.ai.base_url)
            .with_timeout(config.ai.timeout()),
    )?;
    Ok(Arc::new(provider))
}

fn build_registry(config: &AppConfig) -> Result<Option<Arc<dyn CampaignRegistry>>, BoxError> {
    match config.registration.endpoint() {
        Some(url) => {
            let registry = HttpCampaignRegistry::new(url, config.registration.timeout())?;
            Ok(Some(Arc::new(registry)))
        }
        None => {
            tracing::warn!("No registration URL configured; completed briefs will not be registered");
            Ok(None)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
