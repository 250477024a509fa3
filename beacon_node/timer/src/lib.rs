//! C6: drives once-per-second housekeeping, independent of the per-slot schedule.
//!
//! The ticker itself is generic over a [`SecondTickHandler`] so that this crate stays a leaf: it
//! knows how to sleep, measure drift, and report a `ticks_delay` gauge, but nothing about what a
//! "missing block" or a "request manager" is. The `network` crate supplies the handler that
//! polls the quarantine and dispatches backfill requests (C2).

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use task_executor::TaskExecutor;

static TICKS_DELAY: LazyLock<metrics::Result<metrics::Histogram>> = LazyLock::new(|| {
    metrics::try_create_histogram(
        "timer_ticks_delay_seconds",
        "Difference between the requested and actual wakeup time of the second ticker, \
         a proxy for event-loop starvation",
    )
});

/// Implemented by whatever wants to run once per second. `handle_tick` must not block; any
/// genuine I/O (e.g. issuing fetches) should be spawned onto the executor rather than awaited
/// inline, so that a slow tick never delays the next one's scheduling.
pub trait SecondTickHandler: Send + Sync {
    fn handle_tick(&self, executor: &TaskExecutor);
}

/// Spawns the second-ticker loop onto `executor`. Runs until the executor's exit signal fires.
pub fn spawn_second_ticker<H: SecondTickHandler + 'static>(executor: TaskExecutor, handler: Arc<H>) {
    let tick_executor = executor.clone();
    executor.spawn_cancellable(
        async move {
            let tick_interval = Duration::from_secs(1);
            loop {
                let wakeup_requested_at = Instant::now();
                tokio::time::sleep(tick_interval).await;
                let delay = Instant::now()
                    .saturating_duration_since(wakeup_requested_at)
                    .saturating_sub(tick_interval);

                if let Ok(histogram) = &*TICKS_DELAY {
                    histogram.observe(delay.as_secs_f64());
                }
                if delay > Duration::from_millis(500) {
                    tracing::warn!(?delay, "second ticker fired late, event loop may be starved");
                }

                handler.handle_tick(&tick_executor);
            }
        },
        "second_ticker",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler(AtomicUsize);

    impl SecondTickHandler for CountingHandler {
        fn handle_tick(&self, _executor: &TaskExecutor) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn ticks_at_least_once_per_second() {
        let handle = tokio::runtime::Handle::current();
        let (executor, _exit_trigger, _shutdown_rx) = task_executor::build(handle);
        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));
        spawn_second_ticker(executor, handler.clone());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert!(handler.0.load(Ordering::SeqCst) >= 1);
    }
}
