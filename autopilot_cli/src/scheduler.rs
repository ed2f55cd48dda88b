use std::future;
use std::time::Duration;

use core_sim::{TickReport, World};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Cancellable repeating tick. Stopping drops the interval, so no tick can
/// fire after [`TickScheduler::stop`] returns.
#[derive(Debug)]
pub struct TickScheduler {
    period: Duration,
    interval: Option<Interval>,
}

impl TickScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Returns `false` if already running; the existing cadence is kept.
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        tracing::info!(
            target: "supply_autopilot::cli",
            period_ms = self.period.as_millis() as u64,
            "scheduler.started"
        );
        true
    }

    pub fn stop(&mut self) -> bool {
        let was_running = self.interval.take().is_some();
        if was_running {
            tracing::info!(target: "supply_autopilot::cli", "scheduler.stopped");
        }
        was_running
    }

    /// Resolves at the next period boundary. Pends forever while stopped, so
    /// it can sit in a `select!` next to other event sources.
    pub async fn next_tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}

/// Runs `ticks` scheduled ticks against `world`, handing each report to
/// `on_tick`. Leaves the scheduler stopped.
pub async fn run_scheduled<F>(
    world: &mut World,
    scheduler: &mut TickScheduler,
    ticks: u32,
    mut on_tick: F,
) where
    F: FnMut(&World, &TickReport),
{
    scheduler.start();
    for _ in 0..ticks {
        scheduler.next_tick().await;
        let report = world.tick();
        on_tick(world, &report);
    }
    scheduler.stop();
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(1200);

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_period() {
        let mut scheduler = TickScheduler::new(PERIOD);
        assert!(scheduler.start());
        assert!(!scheduler.start());
        let started = Instant::now();
        scheduler.next_tick().await;
        assert!(started.elapsed() >= PERIOD);
        assert!(started.elapsed() < PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_never_fires() {
        let mut scheduler = TickScheduler::new(PERIOD);
        scheduler.start();
        assert!(scheduler.stop());
        assert!(!scheduler.is_running());
        let waited = tokio::time::timeout(PERIOD * 10, scheduler.next_tick()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn run_scheduled_applies_each_tick_once() {
        let mut world = World::new(20251212);
        let mut scheduler = TickScheduler::new(PERIOD);
        let mut days = Vec::new();
        let started = Instant::now();
        run_scheduled(&mut world, &mut scheduler, 3, |_, report| days.push(report.day)).await;
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(world.day(), 3);
        assert!(started.elapsed() >= PERIOD * 3);
        assert!(!scheduler.is_running());
    }
}
