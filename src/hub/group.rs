use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info};

use crate::models::{LobbySnapshot, LobbyUser};

/// Status of a group member. At most one user per group holds Host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    Host,
    Active,
    Inactive,
}

impl UserState {
    /// Display status used by the lobby snapshot.
    pub fn as_status(&self) -> &'static str {
        match self {
            UserState::Host => "host",
            UserState::Active => "online",
            UserState::Inactive => "offline",
        }
    }
}

/// One logical user within a group, regardless of how many connections that
/// user has opened over time. Only the most recent connection id is kept.
#[derive(Debug, Clone)]
pub struct GroupUser {
    pub conn_id: String,
    pub user: String,
    pub state: UserState,
}

/// A named collaboration group: the membership table and the single-host
/// state machine. Membership mutations are linearized behind one mutex so the
/// election check-and-set and the connection-gated offline transition are
/// atomic with respect to each other.
///
/// Users are never removed from a group; a user who left stays Inactive so a
/// later return picks up the same entry.
pub struct GroupContext {
    name: String,
    users: Mutex<HashMap<String, GroupUser>>,
}

impl GroupContext {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    /// Register a user on connect, or adopt the new connection id when the
    /// user is already known. An Inactive user coming back becomes Active
    /// again; a Host reconnecting keeps the host role.
    pub fn register_or_update_user(&self, user: &str, conn_id: &str) {
        let mut users = self.lock();
        match users.get_mut(user) {
            Some(existing) => {
                existing.conn_id = conn_id.to_string();
                if existing.state == UserState::Inactive {
                    existing.state = UserState::Active;
                }
                debug!("User {} rejoined group {} on {}", user, self.name, conn_id);
            }
            None => {
                users.insert(
                    user.to_string(),
                    GroupUser {
                        conn_id: conn_id.to_string(),
                        user: user.to_string(),
                        state: UserState::Active,
                    },
                );
                info!("User {} joined group {}", user, self.name);
            }
        }
    }

    /// Host election: first-come-first-served, no preemption. Succeeds iff no
    /// user currently holds Host or the requester already does (idempotent
    /// re-affirmation). Returns false, with no state change, when a different
    /// user holds Host or the requester is unknown to the group.
    pub fn host(&self, user: &str) -> bool {
        let mut users = self.lock();
        let current_host = users
            .values()
            .find(|u| u.state == UserState::Host)
            .map(|u| u.user.clone());

        match current_host {
            Some(holder) if holder != user => {
                debug!(
                    "Host request for {} in group {} denied, {} already hosts",
                    user, self.name, holder
                );
                false
            }
            _ => match users.get_mut(user) {
                Some(requester) => {
                    requester.state = UserState::Host;
                    info!("User {} now hosts group {}", user, self.name);
                    true
                }
                None => false,
            },
        }
    }

    /// Mark a user offline, but only when the stored connection id still
    /// matches: a stale disconnect event racing a fresh reconnect under a new
    /// connection id must not flip the user to Inactive. No replacement host
    /// is elected; the group may stay hostless until someone calls host again.
    pub fn offline(&self, user: &str, conn_id: &str) {
        let mut users = self.lock();
        if let Some(existing) = users.get_mut(user) {
            if existing.conn_id == conn_id {
                existing.state = UserState::Inactive;
                info!("User {} went offline in group {}", user, self.name);
            }
        }
    }

    /// Serializable lobby view listing every user ever seen in this group,
    /// Inactive entries included.
    pub fn snapshot(&self) -> LobbySnapshot {
        let users = self.lock();
        let mut listed: Vec<LobbyUser> = users
            .values()
            .map(|u| LobbyUser {
                connection_id: u.conn_id.clone(),
                name: u.user.clone(),
                status: u.state.as_status().to_string(),
            })
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        LobbySnapshot::new(listed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, GroupUser>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn state_of(&self, user: &str) -> Option<UserState> {
        self.lock().get(user).map(|u| u.state)
    }
}

/// Registry of collaboration groups, created lazily on first reference and
/// kept for the process lifetime.
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<GroupContext>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Idempotent: concurrent calls with the same name observe the same
    /// group instance.
    pub fn get_or_create(&self, name: &str) -> Arc<GroupContext> {
        {
            let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
            if let Some(group) = groups.get(name) {
                return group.clone();
            }
        }
        let mut groups = self.groups.write().unwrap_or_else(|e| e.into_inner());
        groups
            .entry(name.to_string())
            .or_insert_with(|| {
                info!("Creating group: {}", name);
                Arc::new(GroupContext::new(name))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<GroupContext>> {
        let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
        groups.get(name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<GroupContext>> {
        let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
        groups.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let groups = self.groups.read().unwrap_or_else(|e| e.into_inner());
        groups.len()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_with(users: &[(&str, &str)]) -> GroupContext {
        let group = GroupContext::new("demo");
        for (user, conn) in users {
            group.register_or_update_user(user, conn);
        }
        group
    }

    #[test]
    fn host_election_is_first_come_first_served() {
        let group = group_with(&[("alice", "c1"), ("bob", "c2")]);

        assert!(group.host("alice"));
        assert!(!group.host("bob"));
        assert_eq!(group.state_of("alice"), Some(UserState::Host));
        assert_eq!(group.state_of("bob"), Some(UserState::Active));
    }

    #[test]
    fn host_election_is_idempotent() {
        let group = group_with(&[("alice", "c1")]);

        assert!(group.host("alice"));
        assert!(group.host("alice"));
        assert!(group.host("alice"));

        let hosts = group
            .lock()
            .values()
            .filter(|u| u.state == UserState::Host)
            .count();
        assert_eq!(hosts, 1);
    }

    #[test]
    fn at_most_one_host_after_any_sequence() {
        let group = group_with(&[("alice", "c1"), ("bob", "c2"), ("carol", "c3")]);

        group.host("bob");
        group.host("alice");
        group.host("carol");
        group.host("bob");

        let hosts = group
            .lock()
            .values()
            .filter(|u| u.state == UserState::Host)
            .count();
        assert_eq!(hosts, 1);
        assert_eq!(group.state_of("bob"), Some(UserState::Host));
    }

    #[test]
    fn unknown_user_cannot_win_election() {
        let group = group_with(&[("alice", "c1")]);
        assert!(!group.host("mallory"));
        assert_eq!(group.user_count(), 1);
    }

    #[test]
    fn offline_requires_matching_connection_id() {
        let group = group_with(&[("alice", "c1")]);
        assert!(group.host("alice"));

        // Alice reconnects under a new connection id, then the stale
        // disconnect for the old id arrives. Her status must not flip.
        group.register_or_update_user("alice", "c2");
        group.offline("alice", "c1");
        assert_eq!(group.state_of("alice"), Some(UserState::Host));

        group.offline("alice", "c2");
        assert_eq!(group.state_of("alice"), Some(UserState::Inactive));
    }

    #[test]
    fn offline_host_leaves_group_hostless() {
        let group = group_with(&[("alice", "c1"), ("bob", "c2")]);
        assert!(group.host("alice"));

        group.offline("alice", "c1");
        // No automatic failover: bob is not promoted, but a fresh election
        // now succeeds.
        assert_eq!(group.state_of("bob"), Some(UserState::Active));
        assert!(group.host("bob"));
    }

    #[test]
    fn inactive_user_reactivates_on_new_connection() {
        let group = group_with(&[("alice", "c1")]);
        group.offline("alice", "c1");
        assert_eq!(group.state_of("alice"), Some(UserState::Inactive));

        group.register_or_update_user("alice", "c9");
        assert_eq!(group.state_of("alice"), Some(UserState::Active));
    }

    #[test]
    fn snapshot_lists_every_user_ever_seen() {
        let group = group_with(&[("alice", "c1"), ("bob", "c2"), ("carol", "c3")]);
        group.host("alice");
        group.offline("bob", "c2");

        let snapshot = group.snapshot();
        assert_eq!(snapshot.kind, "lobby");
        assert_eq!(snapshot.users.len(), 3);

        let by_name: HashMap<&str, &str> = snapshot
            .users
            .iter()
            .map(|u| (u.name.as_str(), u.status.as_str()))
            .collect();
        assert_eq!(by_name["alice"], "host");
        assert_eq!(by_name["bob"], "offline");
        assert_eq!(by_name["carol"], "online");
    }

    #[test]
    fn registry_returns_same_group_for_same_name() {
        let registry = GroupRegistry::new();
        let a = registry.get_or_create("standup");
        let b = registry.get_or_create("standup");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }
}
