//! Inbound interaction events.
//!
//! The host sends events as `{node_id, event}` with an opaque string.
//! The string carries a small prefix grammar ("change:...", "pan:start:..."),
//! which is decoded exactly once here into a structured variant so nothing
//! downstream re-parses strings.

use tracing::trace;

/// One user interaction delivered to an application handler.
#[derive(Debug, Clone, PartialEq)]
pub struct UiEvent {
    pub node_id: String,
    pub kind: EventKind,
    /// The original wire string, kept for logging and for handlers that
    /// speak a vocabulary the core was not taught.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A value-producing control changed; payload is the new value string.
    Change(String),
    PanStart { x: f64, y: f64 },
    PanMove { x: f64, y: f64 },
    PanEnd { x: f64, y: f64 },
    Tap,
    Submit,
    /// Anything the core does not recognize, preserved verbatim.
    Custom(String),
}

impl EventKind {
    /// Decodes the wire string. Unrecognized or malformed inputs come back
    /// as `Custom` rather than an error; the event vocabulary belongs to
    /// the widget layer and may grow without the core knowing.
    pub fn parse(raw: &str) -> Self {
        if let Some(value) = raw.strip_prefix("change:") {
            return EventKind::Change(value.to_string());
        }
        if let Some(rest) = raw.strip_prefix("pan:start:") {
            if let Some((x, y)) = parse_point(rest) {
                return EventKind::PanStart { x, y };
            }
        }
        if let Some(rest) = raw.strip_prefix("pan:move:") {
            if let Some((x, y)) = parse_point(rest) {
                return EventKind::PanMove { x, y };
            }
        }
        if let Some(rest) = raw.strip_prefix("pan:end:") {
            if let Some((x, y)) = parse_point(rest) {
                return EventKind::PanEnd { x, y };
            }
        }
        match raw {
            "tap" => EventKind::Tap,
            "submit" => EventKind::Submit,
            _ => {
                trace!(event = raw, "unrecognized event string, passing through");
                EventKind::Custom(raw.to_string())
            }
        }
    }
}

fn parse_point(rest: &str) -> Option<(f64, f64)> {
    let (x, y) = rest.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}
