// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PTY Process Manager (§4.5): spawns agent children in a pseudo-terminal
//! and applies the primary→fallback respawn policy on early exit.

pub mod nbio;
pub mod preset;
pub mod spawn;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::driver::ExitStatus;

/// Input sent to the PTY backend: raw bytes to write, a resize request, or a
/// drain synchronization point.
#[derive(Debug)]
pub enum BackendInput {
    /// Raw bytes to write to the PTY.
    Write(Bytes),
    /// Resize request, applied from inside the backend's own run loop (§4.5)
    /// since `run` holds `&mut self` for the life of the child and a
    /// separately-called `resize()` would otherwise need a second borrow of
    /// the same backend.
    Resize { cols: u16, rows: u16 },
    /// Drain marker: since the backend processes messages sequentially, all
    /// prior writes are complete when this is received. The sender is
    /// notified via the oneshot channel.
    Drain(oneshot::Sender<()>),
}

/// Terminal backend abstraction over a real PTY. Object-safe for use as
/// `Box<dyn Backend>` so a respawned fallback child can replace the
/// in-flight backend without changing the session's types.
pub trait Backend: Send + 'static {
    fn run(
        &mut self,
        output_tx: mpsc::Sender<Bytes>,
        input_rx: mpsc::Receiver<BackendInput>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ExitStatus>> + Send + '_>>;

    fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()>;

    fn child_pid(&self) -> Option<u32>;
}

/// Conversion trait so both concrete backends and `Box<dyn Backend>` can be
/// passed around without explicit boxing at every call site.
pub trait Boxed {
    fn boxed(self) -> Box<dyn Backend>;
}

impl<T: Backend> Boxed for T {
    fn boxed(self) -> Box<dyn Backend> {
        Box::new(self)
    }
}

impl Boxed for Box<dyn Backend> {
    fn boxed(self) -> Box<dyn Backend> {
        self
    }
}

/// Whether an observed exit should trigger the fallback respawn protocol
/// (§4.5): exit code 1, no signal, and the child that just exited was the
/// primary command. All other exits (different code, signal-caused
/// termination, or an already-fallback child) go directly to cleanup.
pub fn should_fallback(status: ExitStatus, is_primary_command: bool) -> bool {
    is_primary_command && status.is_early_exit()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
