//! Listener registration and synchronous dispatch

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MonitorError, Result};
use crate::event::{EventKind, FileEvent, Subscription};

/// Callback invoked with every matching event
///
/// Returning an error (or panicking) counts as a listener failure, handled
/// according to the monitor's [`FailurePolicy`].
pub type Listener = Arc<dyn Fn(&FileEvent) -> anyhow::Result<()> + Send + Sync>;

/// What to do when a listener fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure, keep invoking the remaining listeners and finish the pass
    #[default]
    Isolate,

    /// Stop at the first failure and abort the current pass
    Abort,
}

/// A listener failure captured under [`FailurePolicy::Isolate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// Kind of the event being dispatched
    pub kind: EventKind,

    /// File the event was about
    pub path: PathBuf,

    /// Position of the listener in the kind's registration order
    pub listener: usize,

    /// Error message, or panic payload
    pub message: String,
}

/// Ordered listener lists, one per concrete event kind
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: [Vec<Listener>; 3],
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener to one kind, or to every kind for [`Subscription::All`]
    ///
    /// `All` is expanded now; listeners added to a kind later are not
    /// affected by earlier `All` registrations.
    pub fn register(&mut self, subscription: Subscription, listener: Listener) {
        match subscription {
            Subscription::Kind(kind) => self.listeners[kind.index()].push(listener),
            Subscription::All => {
                for kind in EventKind::ALL {
                    self.listeners[kind.index()].push(Arc::clone(&listener));
                }
            }
        }
    }

    /// Register by kind name (`created`, `deleted`, `updated` or `all`)
    pub fn register_named(&mut self, name: &str, listener: Listener) -> Result<()> {
        let subscription: Subscription = name.parse()?;
        self.register(subscription, listener);
        Ok(())
    }

    /// Number of listeners that will receive events of `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners[kind.index()].len()
    }

    /// Check if no listener is registered for any kind
    pub fn is_empty(&self) -> bool {
        self.listeners.iter().all(Vec::is_empty)
    }

    /// Invoke every listener registered for `event.kind`, in registration order
    ///
    /// Under `Isolate` all failures are returned; under `Abort` the first
    /// failure is returned as [`MonitorError::Listener`].
    pub fn dispatch(&self, event: &FileEvent, policy: FailurePolicy) -> Result<Vec<ListenerFailure>> {
        let mut failures = Vec::new();

        for (index, listener) in self.listeners[event.kind.index()].iter().enumerate() {
            let error = match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(payload) => anyhow::anyhow!("listener panicked: {}", panic_message(payload.as_ref())),
            };

            if policy == FailurePolicy::Abort {
                return Err(MonitorError::Listener {
                    kind: event.kind,
                    path: event.path.clone(),
                    source: error,
                });
            }

            warn!(
                "Listener {} failed on {} event for {}: {:#}",
                index,
                event.kind,
                event.path.display(),
                error
            );
            failures.push(ListenerFailure {
                kind: event.kind,
                path: event.path.clone(),
                listener: index,
                message: format!("{:#}", error),
            });
        }

        Ok(failures)
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            map.entry(&kind.as_str(), &self.listener_count(kind));
        }
        map.finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
