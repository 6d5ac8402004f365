use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Mutex, PoisonError};

type SharedFuture<T> = Shared<BoxFuture<'static, T>>;

/// De-duplicates concurrent executions of the same operation.
///
/// The first caller of [`run()`](Self::run) starts the operation; anyone who
/// calls `run()` while it is still pending awaits the *same* future and
/// receives a clone of its output. Once the operation completes the slot is
/// cleared, so the next call starts a fresh execution.
///
/// The output must be [`Clone`] because every waiter gets its own copy. For
/// fallible operations use a cloneable error type (an error *kind*, not a
/// full error tree).
///
/// # Examples
///
/// ```
/// use jukebox_asyncutils::SingleFlight;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let flight: SingleFlight<u32> = SingleFlight::new();
/// let (a, b) = tokio::join!(
///     flight.run(|| async {
///         tokio::task::yield_now().await;
///         1
///     }),
///     flight.run(|| async { 2 }),
/// );
/// // The second closure never ran; both callers share the first result.
/// assert_eq!((a, b), (1, 1));
/// # }
/// ```
pub struct SingleFlight<T: Clone> {
    current: Mutex<Option<SharedFuture<T>>>,
}
impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { current: Mutex::new(None) }
    }
}
impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight execution, or start one with `start` if nothing is
    /// currently running. `start` is only invoked when this call becomes the
    /// leader.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let started = start().boxed().shared();
                    *slot = Some(started.clone());
                    started
                },
            }
        };
        let output = shared.clone().await;
        // Only clear the slot if it still holds *our* execution; a newer one
        // may already have been started by a caller that arrived after we
        // finished.
        let mut slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }
        output
    }

    /// Returns `true` while an execution is pending.
    pub fn is_running(&self) -> bool {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counted(counter: &Arc<AtomicUsize>, delay: Duration) -> impl Future<Output = usize> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(delay).await;
            n
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_execution() {
        let flight = SingleFlight::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let (a, b, c) = tokio::join!(
            flight.run(|| counted(&counter, Duration::from_secs(2))),
            flight.run(|| counted(&counter, Duration::from_secs(2))),
            flight.run(|| counted(&counter, Duration::from_secs(2))),
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!((a, b, c), (1, 1, 1));
        assert!(!flight.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_calls_execute_again() {
        let flight = SingleFlight::new();
        let counter = Arc::new(AtomicUsize::new(0));
        assert_eq!(flight.run(|| counted(&counter, Duration::from_millis(10))).await, 1);
        assert_eq!(flight.run(|| counted(&counter, Duration::from_millis(10))).await, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_shared_too() {
        let flight: SingleFlight<Result<u8, String>> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flight.run(|| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Err("nope".to_string())
            }),
            flight.run(|| async { Ok(7) }),
        );
        assert_eq!(a, Err("nope".to_string()));
        assert_eq!(b, Err("nope".to_string()));
    }
}
