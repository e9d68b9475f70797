use super::ChannelEvent;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

pub type Listener = Arc<dyn Fn(&ChannelEvent) + Send + Sync + 'static>;

/// Unique handle of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

struct ListenerEntry {
    callback: Listener,
    active: AtomicBool,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    entries: Mutex<BTreeMap<ListenerId, Arc<ListenerEntry>>>,
}

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<ListenerId, Arc<ListenerEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, callback: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let entry = Arc::new(ListenerEntry {
            callback,
            active: AtomicBool::new(true),
        });
        self.lock().insert(id, entry);
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        match self.lock().remove(&id) {
            Some(entry) => {
                entry.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Vec<(ListenerId, Arc<ListenerEntry>)> {
        self.lock()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect()
    }

    /// Invokes `recipients`, skipping any removed since the event was
    /// published. A panicking listener is logged and skipped.
    fn deliver(event: &ChannelEvent, recipients: Vec<(ListenerId, Arc<ListenerEntry>)>) {
        for (id, entry) in recipients {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            let callback = &entry.callback;
            if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                tracing::error!(
                    listener = id.as_u64(),
                    "Listener panicked while handling '{}': {}",
                    event.kind(),
                    panic_message(panic.as_ref())
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Fans channel events out to registered listeners.
///
/// Events are queued and delivered by one dispatcher task, so listeners see
/// them in publish order and never run while a connection lock is held.
pub struct MessageRouter {
    registry: Arc<ListenerRegistry>,
    tx: mpsc::UnboundedSender<Dispatch>,
}

/// An event with the listeners registered when it was published
struct Dispatch {
    event: ChannelEvent,
    recipients: Vec<(ListenerId, Arc<ListenerEntry>)>,
}

impl MessageRouter {
    /// Creates the router and spawns its dispatcher task. The task ends when
    /// the router is dropped.
    pub fn spawn() -> Self {
        let registry = Arc::new(ListenerRegistry::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<Dispatch>();

        tokio::spawn(async move {
            while let Some(Dispatch { event, recipients }) = rx.recv().await {
                ListenerRegistry::deliver(&event, recipients);
            }
            tracing::debug!("Dispatcher task finished");
        });

        Self { registry, tx }
    }

    /// Queues an event for delivery to the listeners registered right now.
    /// Listeners added later never see it.
    pub fn publish(&self, event: ChannelEvent) {
        let recipients = self.registry.snapshot();
        if self.tx.send(Dispatch { event, recipients }).is_err() {
            tracing::debug!("Dispatcher stopped, event dropped");
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        let id = self.registry.insert(Arc::new(callback));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener
/// registered; call [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: ListenerId,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes the listener. No event is delivered to it afterwards.
    /// Returns false if it was already removed.
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.lock().contains_key(&self.id))
    }
}
