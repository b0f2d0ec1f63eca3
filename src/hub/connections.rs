use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

/// Transport context of one live connection: who it belongs to and which
/// group (and therefore which document session) it is bound to.
#[derive(Clone, Debug)]
pub struct ConnCtx {
    pub user: String,
    pub group: String,
}

/// Registry of live connections. No logic beyond lifecycle bookkeeping: the
/// dispatcher registers on connect, unregisters on disconnect, and looks up
/// the context to attribute inbound data events.
///
/// Idle eviction bounds contexts for connections whose disconnect event
/// never arrives.
pub struct ConnectionRegistry {
    cache: Cache<String, ConnCtx>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(3 * 60 * 60))
                .build(),
        }
    }

    pub fn register(&self, connection_id: &str, ctx: ConnCtx) {
        debug!(
            "Registering connection {} (user {}, group {})",
            connection_id, ctx.user, ctx.group
        );
        self.cache.insert(connection_id.to_string(), ctx);
    }

    pub fn unregister(&self, connection_id: &str) {
        self.cache.invalidate(connection_id);
    }

    pub fn get(&self, connection_id: &str) -> Option<ConnCtx> {
        self.cache.get(connection_id)
    }

    pub fn len(&self) -> u64 {
        // Entry count is eventually consistent; run pending maintenance so
        // diagnostics observe recent removals.
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
