//! Termination signals and the sources that deliver them.
//!
//! The supervisor never touches process signals directly. It asks a
//! [`SignalSource`] for a [`SignalListener`] covering the configured
//! [`Signal`]s and cancels the shared token when the listener yields.
//! [`OsSignals`] listens to the real process signals, [`ManualSignals`] lets
//! tests (or an embedding application) raise them by hand.

mod manual;

use std::{fmt, io};

use async_trait::async_trait;

pub use manual::ManualSignals;

/// A process termination request the supervisor can watch for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT`, or Ctrl-C on every platform.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGHUP`.
    Hangup,
    /// `SIGQUIT`.
    Quit,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
    /// Any other raw signal number.
    Other(i32),
}

impl Signal {
    #[cfg(unix)]
    pub(crate) fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Self::Interrupt => SignalKind::interrupt(),
            Self::Terminate => SignalKind::terminate(),
            Self::Hangup => SignalKind::hangup(),
            Self::Quit => SignalKind::quit(),
            Self::User1 => SignalKind::user_defined1(),
            Self::User2 => SignalKind::user_defined2(),
            Self::Other(raw) => SignalKind::from_raw(raw),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
            Self::Hangup => write!(f, "SIGHUP"),
            Self::Quit => write!(f, "SIGQUIT"),
            Self::User1 => write!(f, "SIGUSR1"),
            Self::User2 => write!(f, "SIGUSR2"),
            Self::Other(raw) => write!(f, "signal {raw}"),
        }
    }
}

/// Turns termination requests into a single event.
///
/// `listen` registers interest in `signals` immediately, so nothing delivered
/// after it returns can be missed. Signals that cannot be watched are skipped;
/// an error means none of them could be.
pub trait SignalSource: Send + Sync + 'static {
    fn listen(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalListener>>;
}

/// Registered interest in a set of signals.
#[async_trait]
pub trait SignalListener: Send {
    /// Waits for the next delivery of one of the registered signals.
    async fn recv(&mut self) -> Signal;
}

/// Delivers real process signals through `tokio::signal`.
///
/// Tokio installs one process-wide handler per signal the first time it is
/// listened for and keeps it for the lifetime of the process. Dropping the
/// listener stops delivery to the supervisor, but the signal stays caught:
/// after a run ends, a later `SIGTERM` no longer kills the process by default.
/// Listening again for the same signal works.
///
/// On non-unix platforms only [`Signal::Interrupt`] (Ctrl-C) can be observed;
/// every other signal simply never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSignals;

impl SignalSource for OsSignals {
    #[cfg(unix)]
    fn listen(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalListener>> {
        use tokio::signal::unix::signal;

        let mut listeners = Vec::with_capacity(signals.len());
        let mut last_err = None;
        for sig in signals {
            match signal(sig.kind()) {
                Ok(listener) => listeners.push((*sig, listener)),
                Err(err) => {
                    tracing::warn!(signal = %sig, error = %err, "cannot listen for signal, skipping");
                    last_err = Some(err);
                }
            }
        }
        if listeners.is_empty() {
            return Err(last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "no signals to listen for")
            }));
        }
        Ok(Box::new(UnixListener { listeners }))
    }

    #[cfg(not(unix))]
    fn listen(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalListener>> {
        Ok(Box::new(CtrlCListener {
            enabled: signals.contains(&Signal::Interrupt),
        }))
    }
}

#[cfg(unix)]
struct UnixListener {
    listeners: Vec<(Signal, tokio::signal::unix::Signal)>,
}

#[cfg(unix)]
#[async_trait]
impl SignalListener for UnixListener {
    async fn recv(&mut self) -> Signal {
        use std::task::Poll;

        std::future::poll_fn(|cx| {
            for (sig, listener) in self.listeners.iter_mut() {
                if let Poll::Ready(Some(())) = listener.poll_recv(cx) {
                    return Poll::Ready(*sig);
                }
            }
            Poll::Pending
        })
        .await
    }
}

#[cfg(not(unix))]
struct CtrlCListener {
    enabled: bool,
}

#[cfg(not(unix))]
#[async_trait]
impl SignalListener for CtrlCListener {
    async fn recv(&mut self) -> Signal {
        if self.enabled && tokio::signal::ctrl_c().await.is_ok() {
            return Signal::Interrupt;
        }
        std::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(Signal::Interrupt.to_string(), "SIGINT");
        assert_eq!(Signal::Hangup.to_string(), "SIGHUP");
        assert_eq!(Signal::Other(42).to_string(), "signal 42");
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_kinds() {
        assert_eq!(Signal::Interrupt.kind().as_raw_value(), 2);
        assert_eq!(Signal::Hangup.kind().as_raw_value(), 1);
        assert_eq!(Signal::Terminate.kind().as_raw_value(), 15);
        assert_eq!(Signal::Other(10).kind().as_raw_value(), 10);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_os_signals_stay_pending_without_delivery() {
        let mut listener = OsSignals.listen(&[Signal::Quit]).unwrap();
        let res = tokio::time::timeout(Duration::from_millis(20), listener.recv()).await;
        assert!(res.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_os_signals_resolve_on_delivery() {
        let mut listener = OsSignals.listen(&[Signal::User2]).unwrap();
        unsafe {
            libc::raise(libc::SIGUSR2);
        }
        let sig = tokio::time::timeout(Duration::from_secs(5), listener.recv())
            .await
            .unwrap();
        assert_eq!(sig, Signal::User2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unregistrable_signal_is_skipped() {
        let mut listener = OsSignals
            .listen(&[Signal::Other(libc::SIGKILL), Signal::User1])
            .unwrap();
        unsafe {
            libc::raise(libc::SIGUSR1);
        }
        let sig = tokio::time::timeout(Duration::from_secs(5), listener.recv())
            .await
            .unwrap();
        assert_eq!(sig, Signal::User1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nothing_registrable_is_an_error() {
        let res = OsSignals.listen(&[Signal::Other(libc::SIGKILL), Signal::Other(libc::SIGSTOP)]);
        assert!(res.is_err());
        assert!(OsSignals.listen(&[]).is_err());
    }
}
