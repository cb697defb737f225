use std::{fmt, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::signal::{OsSignals, Signal, SignalSource};

/// How long to wait for every task to stop once shutdown began, when no
/// timeout is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Signals watched when none are configured.
pub const DEFAULT_SIGNALS: [Signal; 3] = [Signal::Interrupt, Signal::Terminate, Signal::Hangup];

/// Tunables for one supervised run.
///
/// The zero value is usable as is: a zero `timeout` means [`DEFAULT_TIMEOUT`]
/// (never "no timeout"), an empty `signals` list means [`DEFAULT_SIGNALS`] and
/// a missing `signal_source` means [`OsSignals`].
#[derive(Clone, Default)]
pub struct Config {
    /// Time allowed for all tasks to return after the shared token is cancelled.
    pub timeout: Duration,
    /// Optional token to derive the run's token from, to cancel the group externally.
    pub cancellation_token: Option<CancellationToken>,
    /// Termination signals that cancel the run.
    pub signals: Vec<Signal>,
    /// Where termination signals come from.
    pub signal_source: Option<Arc<dyn SignalSource>>,
}

impl Config {
    /// Replaces every unset field with its default.
    pub fn resolve(self) -> ResolvedConfig {
        ResolvedConfig {
            timeout: if self.timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                self.timeout
            },
            base_token: self.cancellation_token.unwrap_or_default(),
            signals: if self.signals.is_empty() {
                DEFAULT_SIGNALS.to_vec()
            } else {
                self.signals
            },
            signal_source: self.signal_source.unwrap_or_else(|| Arc::new(OsSignals)),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("timeout", &self.timeout)
            .field("cancellation_token", &self.cancellation_token)
            .field("signals", &self.signals)
            .field("signal_source", &self.signal_source.as_ref().map(|_| ".."))
            .finish()
    }
}

/// A [`Config`] with every default applied.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub timeout: Duration,
    pub base_token: CancellationToken,
    pub signals: Vec<Signal>,
    pub signal_source: Arc<dyn SignalSource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ManualSignals;

    #[test]
    fn test_zero_value_resolves_to_defaults() {
        let resolved = Config::default().resolve();
        assert_eq!(resolved.timeout, DEFAULT_TIMEOUT);
        assert_eq!(resolved.signals, DEFAULT_SIGNALS.to_vec());
        assert!(!resolved.base_token.is_cancelled());
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let base = CancellationToken::new();
        let resolved = Config {
            timeout: Duration::from_millis(10),
            cancellation_token: Some(base.clone()),
            signals: vec![Signal::Quit],
            signal_source: Some(Arc::new(ManualSignals::new())),
        }
        .resolve();

        assert_eq!(resolved.timeout, Duration::from_millis(10));
        assert_eq!(resolved.signals, vec![Signal::Quit]);
        base.cancel();
        assert!(resolved.base_token.is_cancelled());
    }
}
