use std::sync::Arc;

use tracing::{debug, info, warn};

use super::connections::{ConnCtx, ConnectionRegistry};
use super::group::GroupRegistry;
use super::protocol::HubMessage;
use super::session::{DocumentSession, SessionRegistry};
use super::transport::Transport;

/// Top-level router for all inbound transport events.
///
/// Owns the core registries, constructed once at process start, and drains
/// the outbound messages each apply produces: replies go back to the
/// originating connection, broadcasts fan out to every connection attached
/// to the session.
pub struct MessageDispatcher {
    connections: ConnectionRegistry,
    sessions: SessionRegistry,
    groups: GroupRegistry,
    transport: Arc<dyn Transport>,
}

impl MessageDispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            sessions: SessionRegistry::new(),
            groups: GroupRegistry::new(),
            transport,
        }
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    /// Connection-opened event: register the connection, reflect the user in
    /// the group membership, attach to the group's document session and bring
    /// the new connection up to date (initial sync + awareness snapshot, sent
    /// to that connection only).
    pub fn on_connected(&self, connection_id: &str, user: &str, group: &str) {
        info!("{} connected (user {}, group {})", connection_id, user, group);

        self.connections.register(
            connection_id,
            ConnCtx {
                user: user.to_string(),
                group: group.to_string(),
            },
        );

        let group_ctx = self.groups.get_or_create(group);
        group_ctx.register_or_update_user(user, connection_id);

        let session = self.sessions.get_or_create(group);
        for payload in session.attach(connection_id) {
            self.transport.send_to_connection(connection_id, payload);
        }
    }

    /// Connection-closed event: detach from the session, garbage-collect the
    /// awareness entries this connection owned (with a removal broadcast to
    /// the remaining connections) and drop the registration.
    ///
    /// Group membership is untouched here: `offline` is an explicit
    /// out-of-band signal, not an automatic effect of a transport disconnect.
    pub fn on_disconnected(&self, connection_id: &str) {
        info!("{} disconnected", connection_id);

        if let Some(ctx) = self.connections.get(connection_id) {
            if let Some(session) = self.sessions.get(&ctx.group) {
                session.detach(connection_id);
                if let Some(removal) = session.awareness_disconnect(connection_id) {
                    self.broadcast(&session, removal);
                }
            }
        }
        self.connections.unregister(connection_id);
    }

    /// Data event: demultiplex one opaque payload by its leading type tag and
    /// route it to the sync or awareness relay. Unknown tags are ignored;
    /// decode and apply failures are logged and never fatal, so every other
    /// connection keeps being served.
    pub fn on_data(&self, connection_id: &str, payload: &[u8]) {
        let Some(ctx) = self.connections.get(connection_id) else {
            warn!("Data event for unknown connection {}", connection_id);
            return;
        };
        let session = self.sessions.get_or_create(&ctx.group);

        match HubMessage::decode(payload) {
            Ok(Some(HubMessage::Sync(message))) => match session.apply_sync(message) {
                Ok(outcome) => {
                    if let Some(reply) = outcome.reply {
                        self.transport.send_to_connection(connection_id, reply);
                    }
                    if let Some(broadcast) = outcome.broadcast {
                        self.broadcast(&session, broadcast);
                    }
                }
                Err(e) => {
                    warn!("Failed to apply sync message from {}: {}", connection_id, e);
                }
            },
            Ok(Some(HubMessage::Awareness(update))) => {
                if let Some(broadcast) = session.apply_awareness(connection_id, update) {
                    self.broadcast(&session, broadcast);
                }
            }
            Ok(None) => {
                debug!("Ignoring unknown message type from {}", connection_id);
            }
            Err(e) => {
                warn!("Malformed message from {}: {}", connection_id, e);
            }
        }
    }

    /// Send one payload to every connection attached to the session, the
    /// originator included. Sends are fire-and-forget; one failing delivery
    /// never aborts the rest of the fan-out.
    fn broadcast(&self, session: &DocumentSession, payload: Vec<u8>) {
        for connection_id in session.connections() {
            self.transport
                .send_to_connection(&connection_id, payload.clone());
        }
    }
}
