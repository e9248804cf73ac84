use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use log::trace;
use parking_lot::RwLock;

use fedra_shared::{FederateHandle, LogicalTime, Notification};

/// One-way outbound channel to a single federate.
///
/// Implementations must enqueue without blocking; the coordination server
/// calls `send` while holding federation or object locks and one slow
/// federate must never stall the others. Delivery is fire-and-forget and
/// order-preserving per destination.
pub trait Session<T: LogicalTime>: Send + Sync {
    fn send(&self, notification: Notification<T>);
}

/// An `mpsc` sender is the stock session: an unbounded, non-blocking,
/// order-preserving queue drained by the transport layer.
impl<T: LogicalTime> Session<T> for Sender<Notification<T>> {
    fn send(&self, notification: Notification<T>) {
        // a disconnected federate simply stops consuming its queue
        if Sender::send(self, notification).is_err() {
            trace!("dropping notification for disconnected session");
        }
    }
}

// SessionRegistry

/// Handle-to-session map shared by the time engine and every object instance
/// of one federation.
///
/// Lookup takes a short read lock; registration and resignation take the
/// write lock outside of any engine or object critical section.
pub struct SessionRegistry<T: LogicalTime> {
    sessions: RwLock<HashMap<FederateHandle, Arc<dyn Session<T>>>>,
}

impl<T: LogicalTime> SessionRegistry<T> {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, federate: FederateHandle, session: Arc<dyn Session<T>>) {
        self.sessions.write().insert(federate, session);
    }

    pub fn remove(&self, federate: &FederateHandle) {
        self.sessions.write().remove(federate);
    }

    pub fn contains(&self, federate: &FederateHandle) -> bool {
        self.sessions.read().contains_key(federate)
    }

    pub fn get(&self, federate: &FederateHandle) -> Option<Arc<dyn Session<T>>> {
        self.sessions.read().get(federate).cloned()
    }

    /// Enqueues a notification for one federate. A resigned federate is a
    /// benign no-op.
    pub fn send(&self, federate: &FederateHandle, notification: Notification<T>) {
        if let Some(session) = self.sessions.read().get(federate) {
            session.send(notification);
        } else {
            trace!("dropping notification for resigned federate {:?}", federate);
        }
    }
}

impl<T: LogicalTime> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
