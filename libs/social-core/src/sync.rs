use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backoff::BackoffConfig;
use crate::error::SocialResult;

/// Shared flag raised for the duration of a message send. The conversation
/// poller skips a round while it is up, so a stale refresh cannot
/// interleave with an optimistic local append.
#[derive(Clone, Default)]
pub struct SendGuard {
    in_flight: Arc<AtomicBool>,
}

impl SendGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Raise the flag until the returned token is dropped.
    pub fn begin(&self) -> SendInFlight {
        self.in_flight.store(true, Ordering::Release);
        SendInFlight {
            flag: Arc::clone(&self.in_flight),
        }
    }
}

pub struct SendInFlight {
    flag: Arc<AtomicBool>,
}

impl Drop for SendInFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Fixed-interval refresh task. One per screen, independent intervals;
/// dropping the handle cancels the task (screen dismissal). Individual
/// in-flight refreshes are not cancelable mid-call.
pub struct Poller {
    name: String,
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn<F, Fut>(
        name: impl Into<String>,
        interval: Duration,
        guard: Option<SendGuard>,
        refresh: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = SocialResult<()>> + Send + 'static,
    {
        Self::spawn_with_backoff(name, interval, guard, BackoffConfig::poll_default(), refresh)
    }

    pub fn spawn_with_backoff<F, Fut>(
        name: impl Into<String>,
        interval: Duration,
        guard: Option<SendGuard>,
        backoff: BackoffConfig,
        mut refresh: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = SocialResult<()>> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut failed_rounds: u32 = 0;

            loop {
                ticker.tick().await;

                if let Some(guard) = &guard {
                    if guard.in_flight() {
                        tracing::debug!(
                            component = "sync",
                            poller = %task_name,
                            "send in flight, skipping poll round"
                        );
                        continue;
                    }
                }

                match refresh().await {
                    Ok(()) => failed_rounds = 0,
                    Err(error) => {
                        let delay = backoff.delay(failed_rounds);
                        failed_rounds = failed_rounds.saturating_add(1);
                        tracing::warn!(
                            component = "sync",
                            poller = %task_name,
                            %error,
                            failed_rounds,
                            delay_ms = delay.as_millis() as u64,
                            "refresh round failed, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        });

        Self { name, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shutdown(self) {
        tracing::debug!(component = "sync", poller = %self.name, "poller shut down");
        // Drop impl aborts the task.
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
