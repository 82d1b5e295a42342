pub mod api;
pub mod config;
pub mod credentials;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{api_router, serve_until_ctrl_c, ApiContext};
use crate::config::{LoggingSettings, Settings};
use crate::db::{PersistenceGateway, SqliteGateway};
use crate::pipeline::extraction::GeminiClient;
use crate::pipeline::schema::SchemaRegistry;

/// `RUST_LOG` wins over the configured filter.
pub fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load settings, open storage and serve the API until Ctrl-C.
pub fn run() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.logging);

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let registry = Arc::new(SchemaRegistry::builtin()?);
    let store: Arc<dyn PersistenceGateway> =
        Arc::new(SqliteGateway::open(&settings.database.path)?);
    tracing::info!(path = %settings.database.path.display(), "Database ready");

    // The blocking HTTP client runs its own runtime and must be created and
    // dropped outside of tokio. This handle outlives the runtime below.
    let gemini = Arc::new(GeminiClient::new(
        &settings.extraction.base_url,
        &settings.extraction.model,
        &settings.extraction.api_key,
        settings.extraction.timeout_secs,
    )?);
    tracing::info!(model = gemini.model(), "Extraction service configured");

    let ctx = ApiContext::new(
        registry,
        store,
        gemini.clone(),
        gemini.clone(),
        settings.extraction.timeout(),
    )
    .with_max_upload_bytes(settings.server.max_upload_bytes);
    let app = api_router(ctx, &settings.server.cors_origins);
    let addr = settings.socket_addr()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(serve_until_ctrl_c(addr, app));
    drop(runtime);
    drop(gemini);

    served?;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
