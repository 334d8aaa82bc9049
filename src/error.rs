//! Error types for the bridge core.
//!
//! Transport-level failures disconnect the channel but never crash the
//! process; caller-facing request APIs degrade to timeouts/defaults instead
//! of propagating these into application code.

use thiserror::Error;

/// Errors that can occur in the synchronization core.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Channel unreachable after all connection attempts
    #[error("Connection failed after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// `connect` was called while a channel was already up
    #[error("Channel is already connected")]
    AlreadyConnected,

    /// A message could not be serialized for the wire
    #[error("Failed to encode message: {source}")]
    Encode {
        #[source]
        source: bincode::Error,
    },

    /// A frame payload could not be deserialized
    #[error("Failed to decode frame: {source}")]
    Decode {
        #[source]
        source: bincode::Error,
    },

    /// A frame exceeded the configured payload cap
    #[error("Frame too large: {len} bytes exceeds cap of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// Two nodes in one snapshot claimed the same id, which would make the
    /// reference graph ambiguous on the host side
    #[error("Duplicate node id '{id}' in snapshot")]
    DuplicateId { id: String },

    /// A snapshot's reference graph points at an id with no node
    #[error("Snapshot has no node with id '{id}'")]
    MissingNode { id: String },

    /// A tree walk crossed the maximum parent-to-descendant distance.
    ///
    /// Raised eagerly, never silently truncated: the remote host cannot
    /// safely parse arbitrarily deep recursive structures, and a partial
    /// tree is worse than a loud failure.
    #[error("Tree depth {depth} exceeds maximum {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },
}
