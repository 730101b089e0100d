//! HTTP facade over the registry
//!
//! Three verbs, all answering `text/plain`:
//!
//! | Route  | Query                              | Success         |
//! |--------|------------------------------------|-----------------|
//! | `/get` | `service`                          | `PORT\n`        |
//! | `/set` | `service`, optional `port`, `addr` | `PORT\n`/`OK\n` |
//! | `/del` | `port`                             | `OK\n`          |

mod handlers;

pub use handlers::ApiError;

use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::errors::Result;
use crate::persist::Flusher;
use crate::registry::Registry;

/// Shared state handed to every handler
#[derive(Clone, Debug)]
pub struct AppState {
    registry: Arc<Registry>,
    flusher: Flusher,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, flusher: Flusher) -> Self {
        AppState { registry, flusher }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/get", get(handlers::get_port).post(handlers::get_port))
        .route("/set", get(handlers::set_port).post(handlers::set_port))
        .route("/del", get(handlers::del_port).post(handlers::del_port))
        .with_state(state)
}

/// Serve until `shutdown` resolves and every open connection is done
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "HTTP facade listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP facade stopped");
    Ok(())
}
