//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process is asked to stop —
//! the usual trigger for [`TaskEngine::shutdown`](crate::TaskEngine::shutdown)
//! in embedders that run the engine as their main loop.
//!
//! Unix listens for `SIGINT` (Ctrl-C), `SIGTERM` (systemd/Kubernetes stop),
//! and `SIGQUIT`; elsewhere only Ctrl-C is available.

/// Completes when any termination signal is received.
///
/// Each call installs its own independent listeners; an `Err` means listener
/// registration itself failed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
        _ = sigquit.recv() => {}
    }
    Ok(())
}

/// Completes when any termination signal is received.
///
/// Each call installs its own independent listeners; an `Err` means listener
/// registration itself failed.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
