use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Abstracts wall-clock time so session and node timeouts can be driven
/// deterministically in tests instead of racing real `tokio::time::sleep`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Returns a future that resolves once `duration` has elapsed on this
    /// clock.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// The default clock, backed by the Tokio runtime's real timers.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

struct Waiter {
    deadline: Instant,
    notify: Arc<Notify>,
}

struct VirtualClockInner {
    now: Instant,
    waiters: Vec<Waiter>,
}

/// A clock whose time only moves when [`VirtualClock::advance`] is called,
/// for tests that need to assert on timeout behavior without sleeping in
/// real time.
pub struct VirtualClock {
    inner: Mutex<VirtualClockInner>,
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(VirtualClockInner {
                now: Instant::now(),
                waiters: Vec::new(),
            }),
        })
    }

    /// Moves time forward and wakes every pending sleeper whose deadline has
    /// now passed.
    pub fn advance(&self, duration: Duration) {
        let due = {
            let mut inner = self.inner.lock().unwrap();
            inner.now += duration;
            let now = inner.now;
            let mut due = Vec::new();
            inner.waiters.retain(|w| {
                if w.deadline <= now {
                    due.push(Arc::clone(&w.notify));
                    false
                } else {
                    true
                }
            });
            due
        };

        for notify in due {
            notify.notify_one();
        }
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.inner.lock().unwrap().now
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let notify = Arc::new(Notify::new());
        {
            let mut inner = self.inner.lock().unwrap();
            let deadline = inner.now + duration;
            inner.waiters.push(Waiter {
                deadline,
                notify: Arc::clone(&notify),
            });
        }

        Box::pin(async move {
            notify.notified().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_resolves_only_after_advance_covers_the_duration() {
        let clock = VirtualClock::new();
        let mut sleeper = clock.sleep(Duration::from_secs(10));

        assert!(futures_now_or_never(&mut sleeper).is_none());

        clock.advance(Duration::from_secs(5));
        assert!(futures_now_or_never(&mut sleeper).is_none());

        clock.advance(Duration::from_secs(5));
        assert!(futures_now_or_never(&mut sleeper).is_some());
    }

    fn futures_now_or_never<F: Future<Output = ()> + Unpin>(future: &mut F) -> Option<()> {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);

        let waker = unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) };
        let mut cx = Context::from_waker(&waker);
        match Pin::new(future).poll(&mut cx) {
            Poll::Ready(()) => Some(()),
            Poll::Pending => None,
        }
    }
}
