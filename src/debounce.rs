//! Debounce helper
//!
//! Delays a callback until a quiet period has passed since the last call.
//! With `immediate`, the callback fires on the leading edge instead and the
//! quiet period only re-arms it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Default quiet period
pub const DEFAULT_WAIT: Duration = Duration::from_millis(300);

type Callback<A> = Box<dyn Fn(A) + Send + Sync>;

struct Inner<A> {
    func: Callback<A>,
    wait: Duration,
    immediate: bool,
    /// Bumped on every call and cancel; a timer only fires while it still
    /// holds the latest generation.
    generation: AtomicU64,
    pending: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A debounced callable. Clones share the same timer.
pub struct Debouncer<A> {
    inner: Arc<Inner<A>>,
    runtime: Handle,
}

impl<A> Clone for Debouncer<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            runtime: self.runtime.clone(),
        }
    }
}

impl<A: Send + 'static> Debouncer<A> {
    /// Debounce `func` on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new<F>(wait: Duration, immediate: bool, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_handle(Handle::current(), wait, immediate, func)
    }

    /// Debounce `func`, scheduling timers on `runtime`
    pub fn with_handle<F>(runtime: Handle, wait: Duration, immediate: bool, func: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                func: Box::new(func),
                wait,
                immediate,
                generation: AtomicU64::new(0),
                pending: Mutex::new(None),
            }),
            runtime,
        }
    }

    /// Register a call.
    ///
    /// Trailing mode runs `func(args)` once `wait` passes without another
    /// call. Leading mode runs it right away when no timer is armed and
    /// drops the arguments otherwise; either way the timer is re-armed.
    pub fn call(&self, args: A) {
        let mut pending = lock(&self.inner.pending);

        let call_now = self.inner.immediate && pending.is_none();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (trailing, leading) = if self.inner.immediate {
            (None, call_now.then_some(args))
        } else {
            (Some(args), None)
        };

        let inner = Arc::clone(&self.inner);
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(inner.wait).await;
            {
                let mut pending = lock(&inner.pending);
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                *pending = None;
            }
            if let Some(args) = trailing {
                (inner.func)(args);
            }
        }));
        drop(pending);

        // Outside the lock so the callback may call back into the debouncer
        if let Some(args) = leading {
            (self.inner.func)(args);
        }
    }

    /// Discard any pending invocation and reset the leading edge
    pub fn cancel(&self) {
        let mut pending = lock(&self.inner.pending);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// True while a timer is armed
    pub fn is_pending(&self) -> bool {
        lock(&self.inner.pending).is_some()
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }
}
