//! Termination signal handling.

/// Ctrl-C and SIGTERM handlers, registered as soon as this is installed.
///
/// Signals delivered between `install` and `recv` are not lost.
pub struct TerminationListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(not(unix))]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl TerminationListener {
    /// Registers the handlers, replacing the default "terminate now" action.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` - If a handler could not be registered
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Registers the handlers, replacing the default "terminate now" action.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` - If a handler could not be registered
    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Resolves on the first termination signal.
    pub async fn recv(mut self) {
        #[cfg(unix)]
        tokio::select! {
            _ = self.interrupt.recv() => tracing::info!("Received SIGINT"),
            _ = self.terminate.recv() => tracing::info!("Received SIGTERM"),
        }

        #[cfg(not(unix))]
        {
            self.ctrl_c.recv().await;
            tracing::info!("Received Ctrl-C");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_listener_waits_for_a_signal() {
        let listener = TerminationListener::install().unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(50), listener.recv()).await;
        assert!(pending.is_err());
    }
}
