use std::fmt;
use std::sync::{Arc, Mutex};

/// Where a load is in its lifetime. A handle fires its callbacks exactly once,
/// on the Pending -> Complete or Pending -> Cancelled transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HandleStatus {
    Pending,
    Complete,
    Cancelled,
}

type CompleteCallback = Box<dyn FnOnce() + Send>;

struct HandleState {
    status: HandleStatus,
    callbacks: Vec<CompleteCallback>,
}

/// Shared token representing one in-flight batch load. The loader constructs
/// one per dispatched request and signals it with [`LoadHandle::complete`];
/// callers and the retention core observe it through [`LoadHandle::bind_complete`].
///
/// Callbacks receive no payload. Whoever binds one is expected to hold its own
/// context record (the core's trampoline captures a `LoadInfo`).
pub struct LoadHandle {
    id: u64,
    state: Mutex<HandleState>,
}

impl LoadHandle {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(LoadHandle {
            id,
            state: Mutex::new(HandleState {
                status: HandleStatus::Pending,
                callbacks: Vec::default(),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> HandleStatus {
        self.state.lock().unwrap().status
    }

    pub fn is_complete(&self) -> bool {
        self.status() == HandleStatus::Complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == HandleStatus::Cancelled
    }

    /// Registers a callback that fires exactly once, on completion or
    /// cancellation. If the handle already fired, the callback is invoked
    /// immediately on the calling thread.
    pub fn bind_complete<F: FnOnce() + Send + 'static>(
        &self,
        callback: F,
    ) {
        {
            let mut state = self.state.lock().unwrap();
            if state.status == HandleStatus::Pending {
                state.callbacks.push(Box::new(callback));
                return;
            }
        }

        // Already fired, run the straggler outside the lock
        callback();
    }

    /// Loader-side: marks the load finished and fires pending callbacks on
    /// the calling thread. A second call is a no-op.
    pub fn complete(&self) {
        self.fire(HandleStatus::Complete);
    }

    /// Best-effort cancellation. Pending callbacks still fire once, per the
    /// completion contract; a cancel racing a complete resolves to whichever
    /// transitions first.
    pub fn cancel(&self) {
        self.fire(HandleStatus::Cancelled);
    }

    fn fire(
        &self,
        status: HandleStatus,
    ) {
        let callbacks = {
            let mut state = self.state.lock().unwrap();
            if state.status != HandleStatus::Pending {
                log::debug!(
                    "load handle {} already {:?}, ignoring {:?}",
                    self.id,
                    state.status,
                    status
                );
                return;
            }
            state.status = status;
            std::mem::take(&mut state.callbacks)
        };

        log::debug!("load handle {} fired {:?}", self.id, status);

        // Callbacks are invoked outside the lock so they may bind further
        // callbacks or query the handle
        for callback in callbacks {
            callback();
        }
    }
}

impl fmt::Debug for LoadHandle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("LoadHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn callbacks_fire_once_on_complete() {
        let handle = LoadHandle::new(1);
        let fired = Arc::new(AtomicU32::new(0));

        let fired_clone = fired.clone();
        handle.bind_complete(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!handle.is_complete());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        handle.complete();
        assert!(handle.is_complete());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // Double-complete is ignored
        handle.complete();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bind_after_complete_fires_immediately() {
        let handle = LoadHandle::new(2);
        handle.complete();

        let fired = Arc::new(AtomicU32::new(0));
        let fired_clone = fired.clone();
        handle.bind_complete(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_fires_callbacks_and_sticks() {
        let handle = LoadHandle::new(3);
        let fired = Arc::new(AtomicU32::new(0));

        let fired_clone = fired.clone();
        handle.bind_complete(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A complete after cancel does not re-fire or change state
        handle.complete();
        assert!(handle.is_cancelled());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn multiple_callbacks_all_fire() {
        let handle = LoadHandle::new(4);
        let fired = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let fired_clone = fired.clone();
            handle.bind_complete(move || {
                fired_clone.fetch_add(1, Ordering::SeqCst);
            });
        }

        handle.complete();
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }
}
