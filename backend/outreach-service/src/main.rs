/// Outreach Service Main Entry Point
///
/// Starts the HTTP API with:
/// - Identity store client (or in-memory store in development)
/// - Contact store client (or in-memory store in development)
/// - Mail transport (HTTP messages API, SMTP, or no-op)
/// - School directory data file
use anyhow::{anyhow, Context, Result};
use outreach_service::{
    config::Settings,
    http::{start_http_server, AppState},
    services::{
        build_transport, outreach::OutreachOptions, ContactStore, HttpContactStore,
        HttpIdentityStore, IdentityStore, MemoryContactStore, MemoryIdentityStore,
        OutreachService, ReservationService, SchoolDirectory,
    },
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "outreach_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Outreach Service");

    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    let remote_required = matches!(
        std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str(),
        "production" | "staging"
    );

    let identities: Arc<dyn IdentityStore> = if settings.identity.base_url.is_some() {
        info!("Identity store client initialized");
        Arc::new(HttpIdentityStore::from_settings(&settings.identity)?)
    } else if remote_required {
        return Err(anyhow!("IDENTITY_STORE_URL is required in production/staging"));
    } else {
        warn!("IDENTITY_STORE_URL not set - using in-memory identity store (development only)");
        Arc::new(MemoryIdentityStore::new(settings.identity.email_domain.clone()))
    };

    let contacts: Arc<dyn ContactStore> = if settings.contacts.base_url.is_some() {
        info!("Contact store client initialized");
        Arc::new(HttpContactStore::from_settings(&settings.contacts)?)
    } else if remote_required {
        return Err(anyhow!("CONTACT_STORE_URL is required in production/staging"));
    } else {
        warn!("CONTACT_STORE_URL not set - using in-memory contact store (development only)");
        match &settings.contacts.seed_path {
            Some(path) => Arc::new(
                MemoryContactStore::load_seed(path).context("Failed to load contact seed file")?,
            ),
            None => {
                warn!("CONTACT_SEED_PATH not set - every selected recipient will be reported as not found");
                Arc::new(MemoryContactStore::new())
            }
        }
    };

    let transport =
        build_transport(&settings.transport).context("Failed to initialize mail transport")?;
    info!(kind = ?settings.transport.kind, "Mail transport initialized");

    let schools = match &settings.outreach.school_directory_path {
        Some(path) => SchoolDirectory::load(path).context("Failed to load school directory")?,
        None => {
            info!("SCHOOL_DIRECTORY_PATH not set; school names fall back to ids");
            SchoolDirectory::default()
        }
    };

    let state = AppState {
        reservation: ReservationService::new(Arc::clone(&identities)),
        outreach: OutreachService::new(
            identities,
            contacts,
            transport,
            Arc::new(schools),
            OutreachOptions::from(&settings.outreach),
        ),
        internal_api_key: settings.server.internal_api_key.clone(),
    };

    if state.internal_api_key.is_none() {
        warn!("INTERNAL_API_KEY not set - gateway authentication disabled");
    }

    start_http_server(
        state,
        &settings.server.host,
        settings.server.port,
        shutdown_signal(),
    )
    .await
    .context("HTTP server error")?;

    info!("Outreach service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
