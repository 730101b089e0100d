//! Throttled persistence loop
//!
//! ```text
//!            signal                elapsed >= window
//!   Idle ─────────────▶ evaluate ──────────────────▶ Flushing ──┐
//!    ▲                     │                                    │
//!    │                     │ elapsed < window                   │
//!    │                     ▼                                    │
//!    └────────────────── Skipping ◀─────────────────────────────┘
//! ```
//!
//! A skipped signal is dropped for good: nothing is scheduled for later.
//! The mutation it announced reaches the sink only when a later signal
//! arrives after the window, or when the loop shuts down.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::{rewrite, Dumper, Sink};
use crate::errors::Result;

/// Pending flush signals before senders have to wait
pub const FLUSH_QUEUE_CAPACITY: usize = 10;

/// Observable state of the throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    Idle,
    Flushing,
    Skipping,
}

/// Decides whether a flush signal turns into a write
///
/// The window is measured from the last *successful* write. A failed write
/// leaves it where it was, so the next signal retries right away.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last_write: Instant,
    state: ThrottleState,
}

impl Throttle {
    pub fn new(window: Duration, last_write: Instant) -> Self {
        Throttle {
            window,
            last_write,
            state: ThrottleState::Idle,
        }
    }

    pub fn state(&self) -> ThrottleState {
        self.state
    }

    pub fn last_write(&self) -> Instant {
        self.last_write
    }

    /// Evaluate a signal received at `now`: Idle -> Flushing | Skipping
    pub fn on_signal(&mut self, now: Instant) -> ThrottleState {
        debug_assert_eq!(self.state, ThrottleState::Idle);

        self.state = if now.saturating_duration_since(self.last_write) >= self.window {
            ThrottleState::Flushing
        } else {
            ThrottleState::Skipping
        };
        self.state
    }

    /// Back to Idle. `written_at` is the signal instant of a successful flush.
    pub fn complete(&mut self, written_at: Option<Instant>) {
        if let (ThrottleState::Flushing, Some(at)) = (self.state, written_at) {
            self.last_write = at;
        }
        self.state = ThrottleState::Idle;
    }
}

/// Sending half of the flush queue
#[derive(Debug, Clone)]
pub struct Flusher {
    tx: mpsc::Sender<()>,
}

impl Flusher {
    /// Ask for a flush, waiting while the queue is full
    pub async fn flush(&self) {
        if self.tx.send(()).await.is_err() {
            tracing::warn!("persistence loop is gone, flush signal dropped");
        }
    }

    /// Blocking variant of [`Flusher::flush`] for code outside the runtime
    ///
    /// # Panics
    /// When called from within an asynchronous execution context.
    pub fn blocking_flush(&self) {
        if self.tx.blocking_send(()).is_err() {
            tracing::warn!("persistence loop is gone, flush signal dropped");
        }
    }
}

/// Owner of the persistence thread
#[derive(Debug)]
pub struct Throttler {
    flusher: Flusher,
    worker: thread::JoinHandle<()>,
}

impl Throttler {
    /// Write the current state to `sink` and start the persistence thread
    ///
    /// The first write happens before this returns and starts the throttle
    /// window. The thread owns `sink` from then on.
    ///
    /// # Errors
    /// `Io` if the first write fails or the thread cannot be started
    pub fn spawn<D, S>(dumper: Arc<D>, mut sink: S, window: Duration) -> Result<Throttler>
    where
        D: Dumper + ?Sized + 'static,
        S: Sink + 'static,
    {
        let started = Instant::now();
        let wrote = rewrite(&*dumper, &mut sink)?;
        tracing::debug!(bytes = wrote, "initial registry dump");

        let (tx, rx) = mpsc::channel(FLUSH_QUEUE_CAPACITY);
        let throttle = Throttle::new(window, started);

        let worker = thread::Builder::new()
            .name("pald-persist".to_string())
            .spawn(move || run(dumper, sink, throttle, rx))?;

        Ok(Throttler {
            flusher: Flusher { tx },
            worker,
        })
    }

    /// A new handle for sending flush signals
    pub fn flusher(&self) -> Flusher {
        self.flusher.clone()
    }

    /// Drop this handle's sender and wait for the thread to write the final
    /// state and exit.
    ///
    /// Blocks until every other [`Flusher`] has been dropped as well.
    pub fn shutdown(self) {
        let Throttler { flusher, worker } = self;
        drop(flusher);
        if worker.join().is_err() {
            tracing::error!("persistence thread panicked");
        }
    }
}

fn run<D, S>(dumper: Arc<D>, mut sink: S, mut throttle: Throttle, mut rx: mpsc::Receiver<()>)
where
    D: Dumper + ?Sized,
    S: Sink,
{
    while rx.blocking_recv().is_some() {
        let now = Instant::now();
        match throttle.on_signal(now) {
            ThrottleState::Flushing => match rewrite(&*dumper, &mut sink) {
                Ok(bytes) => {
                    tracing::debug!(bytes, "flushed registry");
                    throttle.complete(Some(now));
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to flush registry, retrying on next signal");
                    throttle.complete(None);
                }
            },
            _ => {
                tracing::trace!(
                    since_last_write = ?now.saturating_duration_since(throttle.last_write()),
                    "flush throttled"
                );
                throttle.complete(None);
            }
        }
    }

    match rewrite(&*dumper, &mut sink) {
        Ok(bytes) => tracing::debug!(bytes, "final registry flush"),
        Err(e) => tracing::error!(error = %e, "final registry flush failed"),
    }
}
