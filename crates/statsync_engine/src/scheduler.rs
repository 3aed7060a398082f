//! Debounced flush scheduling.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Callback invoked once per window with the distinct set of keys fired
/// during that window.
pub type BatchCallback = Arc<dyn Fn(Vec<String>) + Send + Sync>;

#[derive(Default)]
struct Batch {
    keys: BTreeSet<String>,
    deadline: Option<Instant>,
    armed: bool,
}

struct SchedulerInner {
    window: Duration,
    callback: BatchCallback,
    batch: Mutex<Batch>,
}

/// Coalesces flush requests arriving within a rolling window into a single
/// downstream invocation carrying the distinct set of requested keys.
///
/// [`fire`](FlushScheduler::fire) extends the window deadline for the
/// pending batch; at expiry the callback receives the accumulated keys
/// once and the batch resets. A zero window short-circuits the delay while
/// keeping delivery asynchronous.
///
/// Must be created inside a tokio runtime; expiry runs on a spawned task.
pub struct FlushScheduler {
    inner: Arc<SchedulerInner>,
}

impl FlushScheduler {
    /// Creates a scheduler with the given window and callback.
    pub fn new(window: Duration, callback: BatchCallback) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                window,
                callback,
                batch: Mutex::new(Batch::default()),
            }),
        }
    }

    /// Adds a key to the pending batch and extends the window.
    ///
    /// Arms the expiry task if no batch is pending.
    pub fn fire(&self, key: &str) {
        let mut batch = self.inner.batch.lock();
        batch.keys.insert(key.to_string());
        batch.deadline = Some(Instant::now() + self.inner.window);
        if batch.armed {
            return;
        }
        batch.armed = true;
        drop(batch);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                let deadline = match inner.batch.lock().deadline {
                    Some(deadline) => deadline,
                    None => break,
                };
                tokio::time::sleep_until(deadline).await;

                let keys = {
                    let mut batch = inner.batch.lock();
                    if let Some(deadline) = batch.deadline {
                        if Instant::now() < deadline {
                            // A later fire extended the window.
                            continue;
                        }
                    }
                    batch.armed = false;
                    batch.deadline = None;
                    std::mem::take(&mut batch.keys)
                };

                if !keys.is_empty() {
                    (inner.callback)(keys.into_iter().collect());
                }
                break;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn channel_scheduler(
        window: Duration,
    ) -> (FlushScheduler, mpsc::UnboundedReceiver<Vec<String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = FlushScheduler::new(
            window,
            Arc::new(move |keys| {
                tx.send(keys).unwrap();
            }),
        );
        (scheduler, rx)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn coalesces_fires_within_one_window() {
        let (scheduler, mut rx) = channel_scheduler(Duration::from_secs(60));

        scheduler.fire("a");
        scheduler.fire("b");
        scheduler.fire("a");

        settle().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(61)).await;
        let keys = rx.recv().await.unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fire_extends_the_window() {
        let (scheduler, mut rx) = channel_scheduler(Duration::from_secs(60));

        scheduler.fire("a");
        tokio::time::advance(Duration::from_secs(30)).await;
        scheduler.fire("b");

        // Past the original deadline, but the second fire moved it.
        tokio::time::advance(Duration::from_secs(31)).await;
        settle().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(30)).await;
        let keys = rx.recv().await.unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_resets_after_expiry() {
        let (scheduler, mut rx) = channel_scheduler(Duration::from_secs(10));

        scheduler.fire("a");
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(rx.recv().await.unwrap(), vec!["a".to_string()]);

        scheduler.fire("b");
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(rx.recv().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn zero_window_short_circuits() {
        let (scheduler, mut rx) = channel_scheduler(Duration::ZERO);

        scheduler.fire("a");
        let keys = rx.recv().await.unwrap();
        assert_eq!(keys, vec!["a".to_string()]);
    }
}
