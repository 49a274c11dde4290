//! Shutdown coordination for graceful server shutdown.
//!
//! Shared flags let the signal handler ask the dispatch loop to stop and let
//! the application wait until in-flight events have been drained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared shutdown state, cloneable across tasks.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Set once shutdown is requested; the dispatch loop stops polling.
    shutdown_initiated: Arc<AtomicBool>,
    /// Set once the dispatch loop has drained and exited.
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    /// Creates a new shutdown state with both flags cleared.
    pub fn new() -> Self {
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true once shutdown has been requested.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Returns true once the dispatch loop has exited.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Requests shutdown. The dispatch loop exits after its current tick.
    pub fn initiate_shutdown(&self) {
        self.shutdown_initiated.store(true, Ordering::Release);
        info!("🛑 Shutdown initiated - dispatch loop will stop after this tick");
    }

    /// Marks the dispatch loop as drained and stopped.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ Dispatch loop stopped - ready for final cleanup");
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}
