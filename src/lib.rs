//! Synchronization core for a declarative UI whose rendering happens in a
//! separate host process.
//!
//! The crate keeps a mutable element graph and a remote renderer in step
//! over a local duplex byte-stream channel: it flattens the graph into an
//! identity-stable snapshot, frames messages onto the wire, correlates
//! asynchronous responses with blocking callers, and coalesces
//! mutation-triggered re-renders so the channel is never flooded. It does
//! not render anything itself, and it does not interpret the widget
//! vocabulary it carries.
//!
//! Entry point: [`UiBridge`].

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod transport;
pub mod tree;
pub mod value;

pub use bridge::{Chrome, UiBridge};
pub use config::{BridgeConfig, RenderMode};
pub use error::BridgeError;
pub use protocol::{EventKind, Message, Node, Patch, UiEvent};
pub use tree::{Element, Snapshot};
pub use value::Value;
