//! # Cross-platform OS signal → cancellation bridge.
//!
//! Provides [`cancel_on_shutdown_signal`], an async helper that cancels a
//! [`Context`] when the process receives a termination signal.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use crate::{Context, Status};

/// Waits for a termination signal, then cancels `ctx` with `status`.
///
/// Each call creates independent signal listeners. The cancellation
/// propagates to the whole subtree under `ctx`, exactly as
/// [`Context::cancel`] would.
///
/// Returns `Ok(())` once the context has been cancelled, or `Err` if signal
/// registration fails (in which case the context is left untouched).
#[cfg(unix)]
pub async fn cancel_on_shutdown_signal(ctx: Context, status: Status) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    ctx.cancel(status);
    Ok(())
}

/// Waits for a termination signal, then cancels `ctx` with `status`.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` once the context has been cancelled, or `Err` if signal
/// registration fails (in which case the context is left untouched).
#[cfg(not(unix))]
pub async fn cancel_on_shutdown_signal(ctx: Context, status: Status) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    ctx.cancel(status);
    Ok(())
}
