use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::SessionRegistry;
use crate::{RegistryError, Result, SessionTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    /// How often the whole registry is swept
    pub sweep_interval: Duration,
    /// Sessions idle for longer than this are closed
    pub idle_threshold: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(10),
            idle_threshold: Duration::from_secs(30),
        }
    }
}

impl ReaperConfig {
    pub fn new(sweep_interval: Duration, idle_threshold: Duration) -> Result<Self> {
        let config = Self {
            sweep_interval,
            idle_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(RegistryError::InvalidConfig(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        if self.idle_threshold.is_zero() {
            return Err(RegistryError::InvalidConfig(
                "idle threshold must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Background task that periodically evicts idle sessions.
///
/// Stops when [`Reaper::shutdown`] is called or its cancellation token fires.
/// Dropping the handle without shutting down leaves the task running until
/// the runtime exits.
pub struct Reaper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Reaper {
    pub fn spawn<T: SessionTransport>(
        registry: Arc<SessionRegistry<T>>,
        config: ReaperConfig,
    ) -> Result<Self> {
        Self::spawn_with_token(registry, config, CancellationToken::new())
    }

    /// Spawn under an existing token, typically a child of the server's
    /// shutdown token.
    pub fn spawn_with_token<T: SessionTransport>(
        registry: Arc<SessionRegistry<T>>,
        config: ReaperConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        config.validate()?;

        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            // First sweep one full period after start.
            let mut ticker =
                tokio::time::interval_at(Instant::now() + config.sweep_interval, config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                sweep_interval = ?config.sweep_interval,
                idle_threshold = ?config.idle_threshold,
                "session reaper started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let expired = registry.sweep(config.idle_threshold).await;
                        if expired.is_empty() {
                            debug!("reaper sweep: nothing idle");
                        } else {
                            info!(count = expired.len(), "reaper closed idle sessions");
                        }
                    }
                }
            }

            debug!("session reaper stopped");
        });

        Ok(Self { cancel, handle })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop sweeping and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::FakeTransport;
    use std::sync::atomic::Ordering;
    use tokio::time::sleep;

    fn config() -> ReaperConfig {
        ReaperConfig::new(Duration::from_secs(10), Duration::from_secs(30)).unwrap()
    }

    #[test]
    fn test_zero_durations_rejected() {
        assert!(ReaperConfig::new(Duration::ZERO, Duration::from_secs(1)).is_err());
        assert!(ReaperConfig::new(Duration::from_secs(1), Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_removed_on_next_tick() {
        let registry = Arc::new(SessionRegistry::new());
        let transport = Arc::new(FakeTransport::default());
        registry.insert("s1", transport.clone()).await.unwrap();

        let reaper = Reaper::spawn(registry.clone(), config()).unwrap();

        // Ticks at 10s, 20s, 30s: idle never exceeds 30s yet.
        sleep(Duration::from_secs(31)).await;
        assert_eq!(registry.len().await, 1);

        // Tick at 40s sees 40s of idleness.
        sleep(Duration::from_secs(10)).await;
        assert!(registry.is_empty().await);
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);

        reaper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_session_alive() {
        let registry = Arc::new(SessionRegistry::new());
        registry
            .insert("busy", Arc::new(FakeTransport::default()))
            .await
            .unwrap();
        let reaper = Reaper::spawn(registry.clone(), config()).unwrap();

        for _ in 0..6 {
            sleep(Duration::from_secs(15)).await;
            registry.touch("busy").await.unwrap();
        }

        assert_eq!(registry.len().await, 1);
        reaper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_reaper_stops_sweeping() {
        let registry = Arc::new(SessionRegistry::new());
        registry
            .insert("s1", Arc::new(FakeTransport::default()))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let reaper =
            Reaper::spawn_with_token(registry.clone(), config(), cancel.child_token()).unwrap();
        cancel.cancel();
        sleep(Duration::from_secs(1)).await;
        assert!(!reaper.is_running());

        sleep(Duration::from_secs(120)).await;
        assert_eq!(registry.len().await, 1);
    }
}
