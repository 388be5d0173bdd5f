//! Presence tracking for connected clients
//!
//! A client may hold several sockets under the same id (tab reloads, quick
//! reconnects). The arena only hears about the first enter and the last leave.
//! The enter/leave callbacks run while the client's entry is locked, so the
//! arena receives transitions in the same order the registry made them.

use dashmap::{mapref::entry::Entry, DashMap};

/// Reference-counted set of present client ids
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    connections: DashMap<String, usize>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. `on_first` runs under the entry lock when it
    /// is the client's first; returns whether it was.
    pub fn register_with(&self, client_id: &str, on_first: impl FnOnce()) -> bool {
        let mut count = self.connections.entry(client_id.to_string()).or_insert(0);
        *count += 1;
        let first = *count == 1;
        if first {
            on_first();
        }
        first
    }

    /// Drop a connection. `on_last` runs under the entry lock when it was the
    /// client's last; returns whether it was.
    pub fn unregister_with(&self, client_id: &str, on_last: impl FnOnce()) -> bool {
        match self.connections.entry(client_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let remaining = entry.get().saturating_sub(1);
                *entry.get_mut() = remaining;
                if remaining > 0 {
                    return false;
                }
                on_last();
                entry.remove();
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn is_present(&self, client_id: &str) -> bool {
        self.connections.contains_key(client_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn first_enter_and_last_leave_only() {
        let presence = PresenceRegistry::new();
        let mut calls = 0;
        assert!(presence.register_with("a", || calls += 1));
        assert!(!presence.register_with("a", || calls += 1));
        assert_eq!(calls, 1);
        assert_eq!(presence.len(), 1);

        assert!(!presence.unregister_with("a", || calls += 1));
        assert!(presence.is_present("a"));
        assert!(presence.unregister_with("a", || calls += 1));
        assert_eq!(calls, 2);
        assert!(!presence.is_present("a"));
        assert!(presence.is_empty());
    }

    #[test]
    fn unknown_leave_is_ignored() {
        let presence = PresenceRegistry::new();
        assert!(!presence.unregister_with("ghost", || panic!("no leave for unknown id")));
    }

    #[test]
    fn racing_reconnects_report_alternating_transitions() {
        let presence = Arc::new(PresenceRegistry::new());
        let events = Arc::new(Mutex::new(Vec::new()));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let presence = presence.clone();
                let events = events.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        presence.register_with("a", || events.lock().push("enter"));
                        presence.unregister_with("a", || events.lock().push("leave"));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // Replaying the transitions in order must never leave a connected
        // client absent or enter a client twice
        let events = events.lock();
        assert!(!events.is_empty());
        for (i, event) in events.iter().enumerate() {
            let expected = if i % 2 == 0 { "enter" } else { "leave" };
            assert_eq!(*event, expected, "transition {i} out of order");
        }
        assert_eq!(events.last(), Some(&"leave"));
        assert!(!presence.is_present("a"));
    }
}
