//! Recurring countdown task owned by a live session.

use std::fmt;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Returned by a tick callback to keep or stop the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Handle to a periodic callback running on the tokio runtime.
///
/// The first call happens one `period` after `start`. The task is aborted by
/// [`SessionTimer::dispose`] and on drop, so no callback runs once the owner
/// is gone.
pub struct SessionTimer {
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl SessionTimer {
    /// Spawn the schedule. A zero period is raised to one millisecond.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn start<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if on_tick() == TickControl::Stop {
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
            period,
        }
    }

    /// True while the schedule has neither stopped itself nor been disposed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the schedule. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTimer")
            .field("period", &self.period)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_timer(stop_after: u32) -> (SessionTimer, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let timer = SessionTimer::start(Duration::from_secs(1), move || {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= stop_after {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        });
        (timer, count)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let (_timer, count) = counting_timer(u32::MAX);
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (timer, count) = counting_timer(u32::MAX);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_further_ticks() {
        let (mut timer, count) = counting_timer(u32::MAX);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        timer.dispose();
        timer.dispose();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_the_task() {
        let (timer, count) = counting_timer(u32::MAX);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        drop(timer);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_stop_the_schedule() {
        let (timer, count) = counting_timer(2);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!timer.is_active());
    }
}
