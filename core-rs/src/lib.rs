//! # pald - Port Allocator Daemon
//!
//! Hands out TCP ports to named services on a host and remembers the
//! assignments across restarts.
//!
//! ## Core Principle
//!
//! **One name, one port**: a service name maps to at most one port and a
//! port belongs to at most one name. Ports come either from a dynamic pool
//! (`alloc`) or are pinned by the caller (`fix`).
//!
//! ## Architecture
//!
//! ```text
//!   palc / PaldClient
//!          │  HTTP /get /set /del
//!          ▼
//!   ┌──────────────┐   flush signal   ┌──────────────────┐
//!   │  server      │ ───────────────► │ persist          │
//!   │  (axum)      │                  │ Throttler thread │
//!   └──────┬───────┘                  └────────┬─────────┘
//!          │ alloc/fix/forget/lookup           │ dump
//!          ▼                                   ▼
//!   ┌──────────────┐                  ┌──────────────────┐
//!   │  Registry    │ ◄──── load ───── │  state file      │
//!   └──────────────┘                  └──────────────────┘
//! ```

pub mod errors;
pub mod grammar;
pub mod registry;
pub mod persist;
pub mod config;
pub mod server;
pub mod client;
pub mod daemon;

pub use errors::{PaldError, Result};
pub use registry::{Registry, ServiceRecord};
pub use persist::{Flusher, Throttler};
pub use config::DaemonConfig;
pub use server::AppState;
pub use client::PaldClient;
pub use daemon::PortDaemon;

/// Version of the daemon and its state file format
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
