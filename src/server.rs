//! Engine bootstrap and process lifecycle
//!
//! Builds the job registry from configuration, starts the scheduler loop and
//! the optional admin API, and shuts both down gracefully.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::routes::create_router;
use crate::config::Settings;
use crate::jobs::{CatalogContext, JobCatalog, JobRegistry, JobRunner, JobScheduler, RunHistory};
use crate::state::AppState;

/// Builds a scheduler holding every declared job.
///
/// Fails if a job type is unknown, a payload is rejected by its factory, a
/// schedule does not parse, or a job's log sink cannot be created.
pub fn build_scheduler(settings: &Settings) -> anyhow::Result<Arc<JobScheduler>> {
    let timezone = settings.scheduler.time_zone()?;
    let sinks = settings.job_logs.sink_factory();
    let catalog = JobCatalog::with_builtin(CatalogContext {
        log_root: settings.job_logs.root_path(),
    });

    let mut registry = JobRegistry::new(timezone);
    for declaration in &settings.jobs {
        let task = catalog
            .create_task(&declaration.job_type, declaration.payload())
            .with_context(|| format!("Failed to build job '{}'", declaration.name))?;
        let definition = declaration.to_definition();
        sinks
            .for_job(&definition)
            .with_context(|| format!("Failed to prepare log sink for job '{}'", declaration.name))?;

        let job = registry
            .register(definition, task)
            .with_context(|| format!("Failed to register job '{}'", declaration.name))?;
        if !declaration.enabled {
            registry.set_enabled(job.id(), false)?;
        }
    }

    let history = Arc::new(RunHistory::with_capacity(settings.scheduler.history_limit));
    let runner = JobRunner::new(sinks, history);

    Ok(Arc::new(JobScheduler::new(
        Arc::new(registry),
        Arc::new(runner),
        settings.scheduler.to_scheduler_config(),
    )))
}

/// Scheduler process manager
pub struct Server {
    settings: Settings,
}

/// A started server. Dropping it does not stop anything; call [`RunningServer::shutdown`].
pub struct RunningServer {
    scheduler: Arc<JobScheduler>,
    scheduler_loop: Option<JoinHandle<()>>,
    admin: Option<AdminServer>,
    shutdown_grace: Duration,
}

struct AdminServer {
    local_addr: SocketAddr,
    stop: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Start, run until Ctrl+C or SIGTERM, then shut down.
    pub async fn run(self) -> anyhow::Result<()> {
        let running = self.start().await?;
        shutdown_signal().await;

        if !running.shutdown().await {
            tracing::warn!("Some job runs did not finish within the shutdown grace period");
        }
        Ok(())
    }

    /// Builds the engine and starts the scheduler loop and admin API as configured.
    pub async fn start(self) -> anyhow::Result<RunningServer> {
        let settings = self.settings;

        tracing::info!(
            app_name = %settings.application.name,
            app_version = %settings.application.version,
            "Application starting"
        );
        tracing::info!(
            timezone = %settings.scheduler.timezone,
            tick_interval_ms = settings.scheduler.tick_interval_ms,
            shutdown_grace_seconds = settings.scheduler.shutdown_grace_seconds,
            job_log_root = %settings.job_logs.root,
            remote_store = settings.job_logs.remote.is_some(),
            "Scheduler configuration loaded"
        );

        let scheduler = build_scheduler(&settings)?;
        tracing::info!(jobs = scheduler.registry().len(), "Jobs registered");

        let scheduler_loop = if settings.scheduler.enabled {
            Some(scheduler.start())
        } else {
            tracing::warn!("Scheduler loop disabled; jobs only run on manual trigger");
            None
        };

        let admin = if settings.admin.enabled {
            let state = AppState::new(Arc::clone(&scheduler));
            let router = create_router(state, Duration::from_secs(settings.admin.request_timeout));

            let address = settings.admin.address();
            let listener = TcpListener::bind(address.as_str()).await.map_err(|e| {
                tracing::error!(error = %e, address = %address, "Failed to bind to address");
                anyhow::anyhow!("Failed to bind to {}: {}", address, e)
            })?;
            let local_addr = listener.local_addr()?;
            tracing::info!(address = %local_addr, "Admin API listening");

            let stop = CancellationToken::new();
            let shutdown = stop.clone().cancelled_owned();
            let handle = tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown)
                    .await
            });
            Some(AdminServer {
                local_addr,
                stop,
                handle,
            })
        } else {
            None
        };

        Ok(RunningServer {
            scheduler,
            scheduler_loop,
            admin,
            shutdown_grace: settings.scheduler.shutdown_grace(),
        })
    }
}

impl RunningServer {
    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }

    /// Address the admin API is bound to, if enabled.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin.as_ref().map(|admin| admin.local_addr)
    }

    /// Stops accepting admin requests and scheduled fires, cancels running
    /// jobs and waits for them up to the grace period. Returns `false` if
    /// some runs were still in flight when the grace period ran out.
    pub async fn shutdown(self) -> bool {
        if let Some(admin) = self.admin {
            admin.stop.cancel();
            match admin.handle.await {
                Ok(Ok(())) => tracing::info!("Admin API stopped"),
                Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
                Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
            }
        }

        let finished = self.scheduler.shutdown(self.shutdown_grace).await;

        if let Some(handle) = self.scheduler_loop {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Scheduler loop task panicked");
            }
        }

        tracing::info!("Shutdown complete");
        finished
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
