// PortDaemon - owns the registry, its state file and the HTTP facade
//
// Lifecycle:
// - new():   open (or create) the state file, load it, spawn the persistence thread
// - serve(): answer HTTP requests until the shutdown future resolves
// - on exit: stop the persistence thread, which writes the final state

use std::fs::{self, OpenOptions};
use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::DaemonConfig;
use crate::errors::Result;
use crate::persist::{self, Throttler};
use crate::registry::Registry;
use crate::server::{self, AppState};

pub struct PortDaemon {
    config: DaemonConfig,
    registry: Arc<Registry>,
    throttler: Throttler,
}

impl PortDaemon {
    pub fn new(config: DaemonConfig) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(Registry::new(config.pool_min, config.pool_max)?);

        if let Some(dir) = config.state_file.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&config.state_file)?;
        persist::load(&mut file, &*registry)?;

        tracing::info!(
            state_file = %config.state_file.display(),
            services = registry.len(),
            pool_min = config.pool_min,
            pool_max = config.pool_max,
            "Loaded port registry"
        );

        let throttler = Throttler::spawn(Arc::clone(&registry), file, config.throttle())?;

        Ok(PortDaemon {
            config,
            registry,
            throttler,
        })
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Bind the configured listen address
    pub async fn bind(&self) -> Result<TcpListener> {
        Ok(TcpListener::bind(self.config.listen).await?)
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let PortDaemon {
            registry,
            throttler,
            ..
        } = self;

        let state = AppState::new(registry, throttler.flusher());
        let served = server::serve(listener, state, shutdown).await;

        // All handler flushers are gone with the router; this drains the
        // queue and writes the final state.
        if let Err(e) = tokio::task::spawn_blocking(move || throttler.shutdown()).await {
            tracing::error!(error = %e, "Persistence thread did not stop cleanly");
        }
        tracing::info!("Port daemon stopped");
        served
    }
}

