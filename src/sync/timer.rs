//! Repeating auto-sync timer.
//!
//! At most one timer task exists per [`AutoSyncTimer`]; arming a new one
//! aborts the previous task first.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Default)]
pub struct AutoSyncTimer {
    task: Option<JoinHandle<()>>,
    period: Option<Duration>,
    cancellations: u64,
}

impl AutoSyncTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts calling `tick` every `period`, first after one full period.
    ///
    /// Replaces any timer that is already running.
    pub fn arm<F, Fut>(&mut self, period: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            // Ticks missed while the runtime was busy are not replayed in a burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });

        tracing::debug!(?period, "Auto-sync timer armed");
        self.task = Some(task);
        self.period = Some(period);
    }

    /// Stops the running timer. Returns false if none was armed.
    pub fn cancel(&mut self) -> bool {
        self.period = None;
        match self.task.take() {
            Some(task) => {
                task.abort();
                self.cancellations += 1;
                tracing::debug!("Auto-sync timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// How many armed timers have been torn down so far.
    pub fn cancellations(&self) -> u64 {
        self.cancellations
    }
}

impl Drop for AutoSyncTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
