use std::io;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Signal, SignalListener, SignalSource};

const CAPACITY: usize = 16;

/// A [`SignalSource`] driven by hand instead of by the operating system.
///
/// Clones share the same delivery channel, so one clone can be handed to the
/// supervisor while another raises signals. Only listeners that exist when a
/// signal is raised receive it; the supervisor starts listening as soon as
/// its `run` future is first polled.
#[derive(Debug, Clone)]
pub struct ManualSignals {
    tx: broadcast::Sender<Signal>,
}

impl ManualSignals {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    /// Delivers `signal` to every live listener.
    ///
    /// Returns the number of listeners that received it.
    pub fn raise(&self, signal: Signal) -> usize {
        self.tx.send(signal).unwrap_or(0)
    }
}

impl Default for ManualSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ManualSignals {
    fn listen(&self, signals: &[Signal]) -> io::Result<Box<dyn SignalListener>> {
        Ok(Box::new(ManualListener {
            rx: self.tx.subscribe(),
            signals: signals.to_vec(),
        }))
    }
}

struct ManualListener {
    rx: broadcast::Receiver<Signal>,
    signals: Vec<Signal>,
}

#[async_trait]
impl SignalListener for ManualListener {
    async fn recv(&mut self) -> Signal {
        loop {
            match self.rx.recv().await {
                Ok(sig) if self.signals.contains(&sig) => return sig,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => std::future::pending().await,
            }
        }
    }
}
