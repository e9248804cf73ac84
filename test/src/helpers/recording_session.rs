use std::sync::Mutex;

use fedra_server::Session;
use fedra_shared::{Integer64Time, Notification};

/// A session that records every notification it receives, for asserting on
/// exactly what the server sent and in what order.
pub struct RecordingSession {
    notifications: Mutex<Vec<Notification<Integer64Time>>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Drains and returns everything recorded so far, in send order.
    pub fn take(&self) -> Vec<Notification<Integer64Time>> {
        std::mem::take(&mut self.notifications.lock().unwrap())
    }

    pub fn last(&self) -> Option<Notification<Integer64Time>> {
        self.notifications.lock().unwrap().last().cloned()
    }

    pub fn contains(&self, notification: &Notification<Integer64Time>) -> bool {
        self.notifications.lock().unwrap().contains(notification)
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session<Integer64Time> for RecordingSession {
    fn send(&self, notification: Notification<Integer64Time>) {
        self.notifications.lock().unwrap().push(notification);
    }
}
