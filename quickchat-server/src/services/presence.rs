//! In-memory presence registry.
//!
//! Maps each user to at most one live push channel. Registration overwrites
//! (last connection wins); unregistration removes the entry only while the
//! closing handle is still the registered one, so a disconnect that races a
//! reconnect cannot erase the newer channel. Process state only: every user
//! appears offline after a restart until they reconnect.

use std::collections::HashMap;
use std::sync::Mutex;

use shared::PushEvent;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

struct Connection {
    handle_id: Uuid,
    sender: mpsc::Sender<PushEvent>,
}

/// Registry of live push channels, keyed by user id.
#[derive(Debug)]
pub struct PresenceRegistry {
    capacity: usize,
    inner: Mutex<HashMap<Uuid, Connection>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("handle_id", &self.handle_id)
            .finish_non_exhaustive()
    }
}

impl PresenceRegistry {
    /// Creates a registry whose channels buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a push channel for `user_id`, superseding any prior one,
    /// and broadcasts the updated online set to every connected channel.
    ///
    /// Returns the handle id identifying this registration and the receiving
    /// end the transport drains.
    pub fn register(&self, user_id: Uuid) -> (Uuid, mpsc::Receiver<PushEvent>) {
        let handle_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.capacity);

        {
            let mut map = self.inner.lock().expect("presence lock poisoned");
            map.insert(user_id, Connection { handle_id, sender });
        }
        debug!(%user_id, %handle_id, "registered push channel");
        metrics::gauge!("presence_online_users").set(self.online_count());

        self.broadcast_presence();
        (handle_id, receiver)
    }

    /// Removes whichever entry currently maps to `handle_id`, if any, and
    /// broadcasts the updated online set. A stale handle (already superseded
    /// by a reconnect) is a no-op.
    pub fn unregister(&self, handle_id: Uuid) {
        let removed = {
            let mut map = self.inner.lock().expect("presence lock poisoned");
            let user_id = map
                .iter()
                .find(|(_, conn)| conn.handle_id == handle_id)
                .map(|(user_id, _)| *user_id);
            user_id.map(|user_id| {
                map.remove(&user_id);
                user_id
            })
        };

        if let Some(user_id) = removed {
            debug!(%user_id, %handle_id, "unregistered push channel");
            metrics::gauge!("presence_online_users").set(self.online_count());
            self.broadcast_presence();
        }
    }

    /// The sender for a user's live channel, when one is registered.
    #[must_use]
    pub fn lookup(&self, user_id: Uuid) -> Option<mpsc::Sender<PushEvent>> {
        let map = self.inner.lock().expect("presence lock poisoned");
        map.get(&user_id).map(|conn| conn.sender.clone())
    }

    /// Best-effort push: never blocks and never fails the caller. Returns
    /// whether the event was handed to a live channel.
    pub fn push(&self, user_id: Uuid, event: PushEvent) -> bool {
        let Some(sender) = self.lookup(user_id) else {
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(%user_id, event = event.name(), "push channel full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Snapshot of users with an open push channel.
    #[must_use]
    pub fn online_users(&self) -> Vec<Uuid> {
        let map = self.inner.lock().expect("presence lock poisoned");
        map.keys().copied().collect()
    }

    fn online_count(&self) -> f64 {
        let map = self.inner.lock().expect("presence lock poisoned");
        let len = u32::try_from(map.len()).unwrap_or(u32::MAX);
        f64::from(len)
    }

    fn broadcast_presence(&self) {
        let (online, senders) = {
            let map = self.inner.lock().expect("presence lock poisoned");
            let online: Vec<Uuid> = map.keys().copied().collect();
            let senders: Vec<mpsc::Sender<PushEvent>> =
                map.values().map(|conn| conn.sender.clone()).collect();
            (online, senders)
        };

        for sender in senders {
            let _ = sender.try_send(PushEvent::Presence {
                online: online.clone(),
            });
        }
    }
}
