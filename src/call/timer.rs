//! Call Timer
//!
//! Elapsed-time projection for a connected call plus the periodic ticker
//! that refreshes it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::runtime::{sleep, spawn_task};

/// Elapsed seconds since the call was accepted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallTimer {
    started_at: Option<DateTime<Utc>>,
    elapsed_secs: u64,
    running: bool,
}

impl CallTimer {
    /// Start counting from `at`. A timer only ever starts once per session.
    pub fn start(&mut self, at: DateTime<Utc>) {
        if self.started_at.is_some() {
            return;
        }
        self.started_at = Some(at);
        self.elapsed_secs = 0;
        self.running = true;
    }

    /// Recompute the elapsed value. Frozen once stopped.
    pub fn tick(&mut self, now: DateTime<Utc>) -> u64 {
        if let (true, Some(started)) = (self.running, self.started_at) {
            self.elapsed_secs = seconds_between(started, now);
        }
        self.elapsed_secs
    }

    /// Take a final reading and stop advancing
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if self.running {
            self.tick(now);
            self.running = false;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }
}

/// Whole seconds between two instants, never negative
fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_seconds().max(0) as u64
}

/// Format seconds as `HH:MM:SS`
pub fn format_elapsed(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Background task bound to one call session.
///
/// Cancelled explicitly or when dropped, so a ticker never outlives the
/// controller's reference to it.
#[derive(Debug)]
pub struct Ticker {
    session_id: Uuid,
    token: CancellationToken,
}

impl Ticker {
    /// Call `on_tick` every `interval` until it returns `false` or the ticker is cancelled
    pub fn spawn<F>(session_id: Uuid, interval: Duration, on_tick: F) -> Self
    where
        F: FnMut(Uuid) -> bool + Send + 'static,
    {
        let token = CancellationToken::new();
        spawn_task(run_ticker(session_id, interval, token.clone(), on_tick));
        Self { session_id, token }
    }

    /// Fire `on_fire` once after `delay` unless cancelled first
    pub fn once<F>(session_id: Uuid, delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce(Uuid) + Send + 'static,
    {
        let mut on_fire = Some(on_fire);
        Self::spawn(session_id, delay, move |id| {
            if let Some(fire) = on_fire.take() {
                fire(id);
            }
            false
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_ticker<F>(session_id: Uuid, interval: Duration, token: CancellationToken, mut on_tick: F)
where
    F: FnMut(Uuid) -> bool + Send + 'static,
{
    loop {
        let cancelled = token.cancelled().fuse();
        let delay = sleep(interval).fuse();
        futures::pin_mut!(cancelled, delay);

        futures::select! {
            _ = cancelled => break,
            _ = delay => {
                if token.is_cancelled() || !on_tick(session_id) {
                    break;
                }
            }
        }
    }
    tracing::trace!(session = %session_id, "Ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(9), "00:00:09");
        assert_eq!(format_elapsed(61), "00:01:01");
        assert_eq!(format_elapsed(3600), "01:00:00");
        assert_eq!(format_elapsed(36_000 + 59 * 60 + 59), "10:59:59");
    }

    #[test]
    fn test_timer_counts_from_start() {
        let mut timer = CallTimer::default();
        timer.start(at(0));

        assert_eq!(timer.elapsed_secs(), 0);
        assert_eq!(timer.tick(at(1)), 1);
        assert_eq!(timer.tick(at(2)), 2);
        assert!(timer.is_running());
    }

    #[test]
    fn test_timer_freezes_after_stop() {
        let mut timer = CallTimer::default();
        timer.start(at(0));
        timer.tick(at(4));
        timer.stop(at(5));

        assert!(!timer.is_running());
        assert_eq!(timer.tick(at(60)), 5);
    }

    #[test]
    fn test_timer_start_only_once() {
        let mut timer = CallTimer::default();
        timer.start(at(0));
        timer.start(at(10));

        assert_eq!(timer.tick(at(12)), 12);
    }

    #[test]
    fn test_timer_never_negative() {
        let mut timer = CallTimer::default();
        timer.start(at(10));

        assert_eq!(timer.tick(at(5)), 0);
    }

    #[test]
    fn test_timer_tick_without_start() {
        let mut timer = CallTimer::default();
        assert_eq!(timer.tick(at(30)), 0);

        timer.start(at(0));
        timer.reset();
        assert_eq!(timer, CallTimer::default());
    }

    #[tokio::test]
    async fn test_ticker_stops_when_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let ticker = Ticker::spawn(Uuid::new_v4(), Duration::from_millis(10), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        ticker.cancel();
        assert!(ticker.is_cancelled());
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_cancel = count.load(Ordering::SeqCst);
        assert!(after_cancel >= 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_ticker_cancelled_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let ticker = Ticker::spawn(Uuid::new_v4(), Duration::from_millis(30), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        drop(ticker);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_once_fires_a_single_time() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let session = Uuid::new_v4();
        let _timeout = Ticker::once(session, Duration::from_millis(10), move |id| {
            assert_eq!(id, session);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
