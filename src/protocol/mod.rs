//! Wire protocol: the message union exchanged with the render host and the
//! node/patch/event types it carries.
//!
//! Messages are one-way. Request/response correlation is layered on top via
//! the `request_id` carried inside query payloads, never by the transport.

pub mod event;
pub mod node;
pub mod patch;

use serde::{Deserialize, Serialize};

pub use event::{EventKind, UiEvent};
pub use node::{Modifier, NestedNode, Node};
pub use patch::{Patch, Slot};

use crate::value::Value;

/// Status bar metadata sent alongside every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBarConfig {
    pub visible: bool,
    pub text: Option<String>,
}

/// Window metadata; `None` fields leave the host's current value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub resizable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotkey {
    pub key: String,
    pub modifiers: Vec<String>,
    /// Event string the host reports when the hotkey fires.
    pub event: String,
}

/// The unit exchanged over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Full snapshot as a flat node list.
    FlatRender {
        nodes: Vec<Node>,
        root_id: String,
        status_bar: StatusBarConfig,
        window: Option<WindowConfig>,
        menu: Option<Value>,
        hotkeys: Vec<Hotkey>,
        fonts: Vec<String>,
    },
    /// Legacy nested-tree equivalent of `FlatRender`.
    Render {
        root: NestedNode,
        status_bar: StatusBarConfig,
        window: Option<WindowConfig>,
    },
    /// Incremental update against the previous snapshot.
    ApplyPatch {
        patches: Vec<Patch>,
        status_bar: StatusBarConfig,
        window: Option<WindowConfig>,
    },
    /// Tells the host to terminate gracefully. No payload.
    Quit,
    /// Inbound user interaction; `event` is an opaque string decoded by
    /// the dispatcher.
    Event { node_id: String, event: String },

    ClipboardQuery {
        request_id: String,
    },
    ClipboardResponse {
        request_id: String,
        text: Option<String>,
    },
    FileDialogQuery {
        request_id: String,
        options: Value,
    },
    FileDialogResponse {
        request_id: String,
        paths: Vec<String>,
    },
    PreferenceQuery {
        request_id: String,
        key: String,
    },
    PreferenceResponse {
        request_id: String,
        value: Value,
    },
    ServiceQuery {
        request_id: String,
        service: String,
        payload: Value,
    },
    ServiceResponse {
        request_id: String,
        result: Value,
    },
}

impl Message {
    /// Short tag for logging; never sent on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::FlatRender { .. } => "flatRender",
            Message::Render { .. } => "render",
            Message::ApplyPatch { .. } => "patch",
            Message::Quit => "quit",
            Message::Event { .. } => "event",
            Message::ClipboardQuery { .. } => "clipboardQuery",
            Message::ClipboardResponse { .. } => "clipboardResponse",
            Message::FileDialogQuery { .. } => "fileDialogQuery",
            Message::FileDialogResponse { .. } => "fileDialogResponse",
            Message::PreferenceQuery { .. } => "preferenceQuery",
            Message::PreferenceResponse { .. } => "preferenceResponse",
            Message::ServiceQuery { .. } => "serviceQuery",
            Message::ServiceResponse { .. } => "serviceResponse",
        }
    }
}
