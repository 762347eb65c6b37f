//! Real-time message distribution: connection registry, channel membership,
//! message fan-out and the WebSocket gateway that drives them.

pub mod events;
pub mod fanout;
pub mod membership;
pub mod registry;
pub mod server;
pub mod session;

use std::sync::Arc;

use fanout::MessageIngest;
use membership::MembershipIndex;
use registry::{ConnectionRegistry, Outbound};
use session::GatewaySession;

/// The broker: one membership index, one registry, one ingest entry point.
/// Store in `AppState` behind an `Arc`.
pub struct Hub {
    index: Arc<MembershipIndex>,
    registry: Arc<ConnectionRegistry>,
    ingest: MessageIngest,
}

impl Hub {
    pub fn new(outbound_queue_capacity: usize) -> Self {
        let index = Arc::new(MembershipIndex::new());
        let registry = Arc::new(ConnectionRegistry::new(index.clone(), outbound_queue_capacity));
        let ingest = MessageIngest::new(index.clone(), registry.clone());
        Self {
            index,
            registry,
            ingest,
        }
    }

    /// Register a new connection and hand back its session and outbound queue.
    pub fn connect(&self) -> (GatewaySession, Outbound) {
        let (connection_id, outbound) = self.registry.register();
        let session = GatewaySession::new(connection_id, self.index.clone(), self.registry.clone());
        (session, outbound)
    }

    pub fn ingest(&self) -> &MessageIngest {
        &self.ingest
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn index(&self) -> &MembershipIndex {
        &self.index
    }
}
