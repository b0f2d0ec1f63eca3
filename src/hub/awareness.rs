use std::collections::{HashMap, HashSet};

use super::protocol::{AwarenessEntry, AwarenessUpdate, HubMessage, AWARENESS_NULL_STATE};
use super::session::DocumentSession;

/// Per-session awareness table: ephemeral presence state keyed by client id,
/// resolved last-writer-wins by the clock embedded in each delta.
///
/// Clocks are remembered even after a client's state is evicted so a stale
/// delta arriving after a removal cannot resurrect the old state.
pub struct AwarenessStates {
    states: HashMap<u64, String>,
    clocks: HashMap<u64, u32>,
    owners: HashMap<String, HashSet<u64>>,
}

impl AwarenessStates {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            clocks: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Number of client ids with live state.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state_of(&self, client_id: u64) -> Option<&str> {
        self.states.get(&client_id).map(|s| s.as_str())
    }

    /// Apply a set of deltas attributed to `connection_id` and return exactly
    /// the entries that changed, in the order they applied. Concurrent updates
    /// to the same client id are resolved by clock comparison, not arrival
    /// order; a removal at an equal clock beats a live state.
    pub fn apply(&mut self, connection_id: &str, update: AwarenessUpdate) -> Vec<AwarenessEntry> {
        let mut changed = Vec::new();
        for entry in update.clients {
            let applies = match self.clocks.get(&entry.client_id) {
                None => true,
                Some(&current) => {
                    entry.clock > current
                        || (entry.clock == current
                            && entry.is_removal()
                            && self.states.contains_key(&entry.client_id))
                }
            };
            if !applies {
                continue;
            }
            self.clocks.insert(entry.client_id, entry.clock);
            if entry.is_removal() {
                self.states.remove(&entry.client_id);
                self.release(entry.client_id);
            } else {
                self.states.insert(entry.client_id, entry.state.clone());
                self.claim(connection_id, entry.client_id);
            }
            changed.push(entry);
        }
        changed
    }

    /// Evict every client id owned by a disconnecting connection and return
    /// the removal deltas to broadcast. A client id that reconnected under a
    /// different connection in the meantime is no longer owned here and stays
    /// untouched.
    pub fn remove_connection(&mut self, connection_id: &str) -> Vec<AwarenessEntry> {
        let Some(owned) = self.owners.remove(connection_id) else {
            return Vec::new();
        };
        let mut ids: Vec<u64> = owned.into_iter().collect();
        ids.sort_unstable();

        let mut removed = Vec::new();
        for client_id in ids {
            if self.states.remove(&client_id).is_some() {
                let clock = self.clocks.get(&client_id).copied().unwrap_or(0) + 1;
                self.clocks.insert(client_id, clock);
                removed.push(AwarenessEntry {
                    client_id,
                    clock,
                    state: AWARENESS_NULL_STATE.to_string(),
                });
            }
        }
        removed
    }

    /// Full snapshot of all live states, sent to newly attached connections.
    pub fn snapshot(&self) -> AwarenessUpdate {
        let mut clients: Vec<AwarenessEntry> = self
            .states
            .iter()
            .map(|(&client_id, state)| AwarenessEntry {
                client_id,
                clock: self.clocks.get(&client_id).copied().unwrap_or(0),
                state: state.clone(),
            })
            .collect();
        clients.sort_unstable_by_key(|e| e.client_id);
        AwarenessUpdate { clients }
    }

    // The most recent connection to update a client id owns it.
    fn claim(&mut self, connection_id: &str, client_id: u64) {
        self.release(client_id);
        self.owners
            .entry(connection_id.to_string())
            .or_default()
            .insert(client_id);
    }

    fn release(&mut self, client_id: u64) {
        self.owners.retain(|_, owned| {
            owned.remove(&client_id);
            !owned.is_empty()
        });
    }
}

impl Default for AwarenessStates {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSession {
    /// Apply an awareness delta set and return the encoded broadcast covering
    /// exactly the changed client ids, or None when nothing changed.
    pub fn apply_awareness(&self, connection_id: &str, update: AwarenessUpdate) -> Option<Vec<u8>> {
        let mut inner = self.lock();
        let changed = inner.awareness.apply(connection_id, update);
        if changed.is_empty() {
            return None;
        }
        Some(HubMessage::Awareness(AwarenessUpdate { clients: changed }).encode())
    }

    /// Garbage-collect the awareness entries owned by a disconnecting
    /// connection. Returns the encoded removal broadcast, or None when the
    /// connection owned no client ids.
    pub fn awareness_disconnect(&self, connection_id: &str) -> Option<Vec<u8>> {
        let mut inner = self.lock();
        let removed = inner.awareness.remove_connection(connection_id);
        if removed.is_empty() {
            return None;
        }
        Some(HubMessage::Awareness(AwarenessUpdate { clients: removed }).encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(client_id: u64, clock: u32, state: &str) -> AwarenessEntry {
        AwarenessEntry {
            client_id,
            clock,
            state: state.to_string(),
        }
    }

    fn update(entries: Vec<AwarenessEntry>) -> AwarenessUpdate {
        AwarenessUpdate { clients: entries }
    }

    #[test]
    fn later_clock_wins_regardless_of_order() {
        let deltas = vec![
            entry(1, 1, r#"{"cursor":0}"#),
            entry(1, 3, r#"{"cursor":9}"#),
            entry(1, 2, r#"{"cursor":5}"#),
            entry(2, 1, r#"{"name":"b"}"#),
        ];

        // Apply the same delta set in two different orders; the final mapping
        // must be identical because clocks are strictly ordered per client.
        let mut forward = AwarenessStates::new();
        for delta in &deltas {
            forward.apply("conn-a", update(vec![delta.clone()]));
        }

        let mut reversed = AwarenessStates::new();
        for delta in deltas.iter().rev() {
            reversed.apply("conn-a", update(vec![delta.clone()]));
        }

        assert_eq!(forward.state_of(1), Some(r#"{"cursor":9}"#));
        assert_eq!(forward.snapshot(), reversed.snapshot());
    }

    #[test]
    fn stale_delta_is_not_a_change() {
        let mut states = AwarenessStates::new();
        states.apply("conn-a", update(vec![entry(1, 5, r#"{"cursor":3}"#)]));

        let changed = states.apply("conn-a", update(vec![entry(1, 4, r#"{"cursor":1}"#)]));
        assert!(changed.is_empty());
        assert_eq!(states.state_of(1), Some(r#"{"cursor":3}"#));
    }

    #[test]
    fn removal_at_equal_clock_wins() {
        let mut states = AwarenessStates::new();
        states.apply("conn-a", update(vec![entry(1, 2, r#"{"cursor":3}"#)]));

        let changed = states.apply("conn-a", update(vec![entry(1, 2, AWARENESS_NULL_STATE)]));
        assert_eq!(changed.len(), 1);
        assert_eq!(states.state_of(1), None);
    }

    #[test]
    fn disconnect_evicts_owned_ids_and_reports_them_removed() {
        let mut states = AwarenessStates::new();
        states.apply("conn-a", update(vec![entry(3, 1, r#"{"u":"a"}"#)]));
        states.apply("conn-a", update(vec![entry(7, 1, r#"{"u":"a2"}"#)]));
        states.apply("conn-b", update(vec![entry(9, 1, r#"{"u":"b"}"#)]));

        let removed = states.remove_connection("conn-a");
        let removed_ids: Vec<u64> = removed.iter().map(|e| e.client_id).collect();
        assert_eq!(removed_ids, vec![3, 7]);
        assert!(removed.iter().all(|e| e.is_removal()));
        // Removal clocks must advance past the evicted state's clock.
        assert!(removed.iter().all(|e| e.clock == 2));

        let snapshot = states.snapshot();
        let live_ids: Vec<u64> = snapshot.clients.iter().map(|e| e.client_id).collect();
        assert_eq!(live_ids, vec![9]);
    }

    #[test]
    fn reconnected_client_survives_stale_owner_disconnect() {
        let mut states = AwarenessStates::new();
        states.apply("conn-old", update(vec![entry(5, 1, r#"{"u":"x"}"#)]));
        // Same client id reappears under a fresh connection.
        states.apply("conn-new", update(vec![entry(5, 2, r#"{"u":"x"}"#)]));

        let removed = states.remove_connection("conn-old");
        assert!(removed.is_empty());
        assert_eq!(states.state_of(5), Some(r#"{"u":"x"}"#));
    }

    #[test]
    fn session_broadcast_covers_only_changed_ids() {
        let session = DocumentSession::new("room");
        let first = session.apply_awareness("conn-a", update(vec![entry(1, 1, r#"{"c":1}"#)]));
        assert!(first.is_some());

        // Re-applying the identical delta changes nothing and must not
        // produce a broadcast.
        let second = session.apply_awareness("conn-a", update(vec![entry(1, 1, r#"{"c":1}"#)]));
        assert!(second.is_none());
    }
}
