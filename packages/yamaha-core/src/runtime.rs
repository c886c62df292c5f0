//! Background task spawning.
//!
//! Device monitors, event listeners and UPnP renewals are all started through
//! a [`TaskSpawner`]. [`TokioSpawner`] captures the runtime handle at
//! bootstrap, so services can start tasks from code that is not itself
//! running on the runtime (host callbacks, blocking threads).

use std::future::Future;

/// Starts detached background work.
///
/// Spawned tasks are not joined. They end when their own
/// [`CancellationToken`](tokio_util::sync::CancellationToken) fires.
pub trait TaskSpawner: Send + Sync {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Spawner bound to the Tokio runtime it was created on.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Binds to the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics outside a Tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
