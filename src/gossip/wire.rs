//! Snapshot wire codec
//!
//! Gossip snapshots travel as CBOR: a self-describing binary encoding
//! that keeps field names and types with the data, so a peer on the same
//! gossip version decodes exactly the map that was encoded. Version
//! screening happens before decoding; see
//! [`MembershipDelegate::deliver_remote_state`](super::transport::MembershipDelegate::deliver_remote_state).

use thiserror::Error;

use super::types::NodeInfoMap;

/// Errors raised while encoding or decoding gossip snapshots
#[derive(Error, Debug, PartialEq)]
pub enum WireError {
    #[error("failed to encode gossip snapshot: {0}")]
    Encode(String),

    #[error("failed to decode gossip snapshot: {0}")]
    Decode(String),

    #[error("gossip version mismatch: local {local}, remote {remote}")]
    VersionMismatch { local: String, remote: String },
}

pub type WireResult<T> = Result<T, WireError>;

/// Encode a node-map snapshot for transmission
pub fn to_bytes(state: &NodeInfoMap) -> WireResult<Vec<u8>> {
    serde_cbor::to_vec(state).map_err(|err| WireError::Encode(err.to_string()))
}

/// Decode a node-map snapshot received from a peer
pub fn from_bytes(buf: &[u8]) -> WireResult<NodeInfoMap> {
    serde_cbor::from_slice(buf).map_err(|err| WireError::Decode(err.to_string()))
}
