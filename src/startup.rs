//! Application Startup
//!
//! Backend selection, application building, and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::{BackendKind, Settings};
use crate::domain::service::ChatService;
use crate::infrastructure::{
    database, CredentialRegistry, FileSnapshotStore, MemoryChatService, PostgresChatService,
};
use crate::presentation::http::routes;
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn ChatService>,
    pub settings: Arc<Settings>,
    /// Signalled by the shutdown endpoint; drains the server gracefully.
    pub shutdown: Arc<Notify>,
}

/// Application instance.
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings.
    pub async fn build(settings: Settings) -> Result<Self> {
        let service = build_service(&settings).await?;
        Self::with_service(settings, service).await
    }

    /// Build with an already-constructed service (used by test drivers).
    pub async fn with_service(
        settings: Settings,
        service: Arc<dyn ChatService>,
    ) -> Result<Self> {
        let state = AppState {
            service,
            settings: Arc::new(settings.clone()),
            shutdown: Arc::new(Notify::new()),
        };

        let router = routes::create_router(state.clone())
            .layer(create_trace_layer())
            .layer(create_cors_layer(&settings.cors));

        let addr: SocketAddr = settings.server_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server until interrupted or told to shut down, then close the
    /// service (final snapshot save, pool release).
    pub async fn run_until_stopped(self) -> Result<()> {
        let shutdown = self.state.shutdown.clone();
        let service = self.state.service.clone();

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.notified() => {
                        tracing::info!("shutdown requested via endpoint");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("interrupt received");
                    }
                }
            })
            .await?;

        if let Err(err) = service.close().await {
            tracing::error!(error = %err, "service close failed");
        }

        Ok(())
    }

    /// Get the bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Construct the backend the configuration selects.
pub async fn build_service(settings: &Settings) -> Result<Arc<dyn ChatService>> {
    let registry = Arc::new(CredentialRegistry::new());

    match settings.backend() {
        BackendKind::Memory => {
            let store = Arc::new(FileSnapshotStore::new(settings.snapshot.path.clone()));
            let service = MemoryChatService::open(store, registry).await?;
            tracing::info!(path = %settings.snapshot.path, "in-memory backend ready");
            Ok(service)
        }
        BackendKind::Postgres => {
            let pool = database::create_pool(&settings.database).await?;
            database::create_tables(&pool)
                .await
                .map_err(|err| anyhow::anyhow!("schema bootstrap failed: {err}"))?;
            tracing::info!(database = %settings.database.name, "postgres backend ready");
            Ok(Arc::new(PostgresChatService::new(pool, registry)))
        }
    }
}
