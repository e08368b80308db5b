mod config;
mod contact;
mod db;
mod errors;
mod export;
mod mail_client;
mod models;
mod routes;
mod state;
mod tenant;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::export::{command_export_deps, ResumeExporter};
use crate::mail_client::{MailClient, MailTransport};
use crate::routes::build_router;
use crate::state::AppState;
use crate::tenant::pg_source::PgTenantSource;
use crate::tenant::{CompanyDataResolver, JsonDirSource, TenantSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Vitae API v{}", env!("CARGO_PKG_VERSION"));

    // Tenant source: Postgres when configured, JSON files otherwise
    let source: Arc<dyn TenantSource> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            Arc::new(PgTenantSource::new(pool))
        }
        None => {
            let json = JsonDirSource::new(config.data_dir.clone());
            info!("Reading tenant datasets from {}", json.dir().display());
            Arc::new(json)
        }
    };
    let resolver = CompanyDataResolver::new(source);

    // Export pipeline (template engine is built on first export)
    let deps = command_export_deps(&config);
    info!(
        "Export page: {} {:?}, {}in margins, {} dpi, settle {:?} via {}",
        deps.page.format.as_str(),
        deps.page.orientation,
        deps.page.margins.top_in,
        deps.page.dpi(),
        deps.settle.budget(),
        config.rasterizer_bin
    );
    let exporter = ResumeExporter::new(deps);

    // Mail transport for the contact form
    let mail: Option<Arc<dyn MailTransport>> = match config.mail.clone() {
        Some(mail_config) => {
            info!("Mail transport configured ({})", mail_config.api_url);
            let client: Arc<dyn MailTransport> = Arc::new(MailClient::new(mail_config)?);
            Some(client)
        }
        None => {
            warn!("MAIL_API_KEY not set; contact form submissions will be rejected");
            None
        }
    };

    // Build app state
    let state = AppState {
        resolver,
        exporter,
        mail,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
