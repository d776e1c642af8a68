//! Single-initialisation cell with error retry (`spec.md` §4.E).
//!
//! Every client variant that needs a handful of connection objects
//! (typed/dynamic/discovery clients, REST config) built from the same
//! underlying connection repeats the double-check read/write-lock idiom
//! the teacher's older iterations wrote out by hand per object
//! (`spec.md` §9 "Lazy connection objects"). This factors it into one
//! primitive so the three client variants (`clients` module) just compose
//! four of these instead of re-deriving the locking each time.

use tokio::sync::Mutex;

/// A thread-safe cell that runs its initialiser at most once across all
/// concurrent callers, provided that initialiser eventually succeeds.
///
/// If the initialiser fails, the error is returned to the caller and the
/// cell is left empty — the next caller (or a retry by the same caller)
/// will attempt initialisation again.
pub struct LazyCell<T> {
    inner: Mutex<Option<T>>,
}

impl<T> Default for LazyCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyCell<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Builds a cell already holding `value`, skipping initialisation.
    pub fn new_set(value: T) -> Self {
        Self {
            inner: Mutex::new(Some(value)),
        }
    }

    /// Returns the cached value, or runs `init` to produce and cache one.
    ///
    /// Concurrent callers serialise on the same lock: the first caller runs
    /// `init`, and every other caller simply waits for it and then observes
    /// the same value (or the same retry opportunity, on error).
    pub async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<T, E>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut guard = self.inner.lock().await;
        if let Some(value) = guard.as_ref() {
            return Ok(value.clone());
        }
        let value = init().await?;
        *guard = Some(value.clone());
        Ok(value)
    }

    /// Reports whether a successful value is currently cached.
    pub async fn is_set(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Returns the cached value without ever running an initialiser.
    pub async fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn init_runs_once_and_is_cached() {
        let cell: LazyCell<u32> = LazyCell::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            let v = cell
                .get_or_try_init(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<u32, &'static str>(42)
                })
                .await
                .unwrap();
            assert_eq!(v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cell.is_set().await);
    }

    #[tokio::test]
    async fn failed_init_is_not_cached_and_retries() {
        let cell: LazyCell<u32> = LazyCell::new();
        let attempt = Arc::new(AtomicUsize::new(0));
        {
            let attempt = attempt.clone();
            let err = cell
                .get_or_try_init(|| async move {
                    attempt.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, &'static str>("boom")
                })
                .await
                .unwrap_err();
            assert_eq!(err, "boom");
        }
        assert!(!cell.is_set().await);
        let v = {
            let attempt = attempt.clone();
            cell.get_or_try_init(|| async move {
                attempt.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, &'static str>(7)
            })
            .await
            .unwrap()
        };
        assert_eq!(v, 7);
        assert_eq!(attempt.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_observe_single_init() {
        let cell = Arc::new(LazyCell::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cell = cell.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cell.get_or_try_init(|| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    Ok::<u32, &'static str>(1)
                })
                .await
                .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
