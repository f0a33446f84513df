//! Networking: transport boundary, snapshot codec, replication policy
//!
//! Snapshots are self-contained and unsequenced. Whatever arrives last is
//! applied; loss and reordering need no recovery layer.

pub mod local;
pub mod replication;
pub mod snapshot;
pub mod transport;

pub use local::{LinkConditions, LocalEndpoint, LocalNetwork};
pub use replication::{Applied, ApplyPolicy, ReplicationStats, Replicator};
pub use snapshot::{GameSnapshot, PeerRequests, WireBall, WirePlayer};
pub use transport::{LinkState, Transport, TransportError, TransportEvent};
