//! Periodic Worker
//!
//! Owns one background loop. `stop()` signals the loop and waits for it,
//! so a tick that is already running always completes.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct Worker {
    name: &'static str,
    running: Mutex<Option<Running>>,
}

impl Worker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Mutex::new(None),
        }
    }

    /// Spawns the loop, calling `tick` once per `period`.
    ///
    /// The first tick fires one full period after start. The loop ends when
    /// `tick` returns `false` or `stop()` is called. Starting a worker that
    /// is already running is a no-op.
    pub fn start<F, Fut>(&self, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("{} worker already running", self.name);
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let name = self.name;

        let handle = tokio::spawn(async move {
            info!("Starting {} worker with interval of {:?}", name, period);

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if !tick().await {
                            debug!("{} worker finished", name);
                            break;
                        }
                    }
                }
            }

            info!("{} worker stopped", name);
        });

        *running = Some(Running { shutdown, handle });
    }

    /// Signals the loop to exit and waits for the in-flight tick.
    /// Stopping an idle worker is a no-op.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(Running { shutdown, handle }) = running {
            let _ = shutdown.send(true);
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_worker_ticks_until_stopped() {
        let worker = Worker::new("test");
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        worker.start(Duration::from_millis(20), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }
        });
        assert!(worker.is_running());

        tokio::time::sleep(Duration::from_millis(110)).await;
        worker.stop().await;
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several ticks, saw {}", seen);
        assert!(!worker.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let worker = Worker::new("idle");
        worker.stop().await;
        worker.start(Duration::from_secs(60), || async { true });
        worker.stop().await;
        worker.stop().await;
        assert!(!worker.is_running());
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_tick() {
        let worker = Worker::new("slow");
        let done = Arc::new(AtomicUsize::new(0));
        let flag = done.clone();

        worker.start(Duration::from_millis(10), move || {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(80)).await;
                flag.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        worker.stop().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tick_returning_false_ends_loop() {
        let worker = Worker::new("once");
        worker.start(Duration::from_millis(10), || async { false });

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!worker.is_running());
    }
}
