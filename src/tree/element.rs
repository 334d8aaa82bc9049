//! Source-side UI element graph.
//!
//! Built fresh on every render pass by the application's scene function,
//! flattened into a [`Snapshot`](crate::tree::flatten::Snapshot), then
//! discarded. Stable identity across rebuilds comes from `identity`
//! (explicitly assigned) or from the structural path at flatten time.

use std::collections::BTreeMap;

use crate::protocol::Modifier;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: String,
    pub props: BTreeMap<String, Value>,
    pub modifiers: Vec<Modifier>,
    pub animation: Option<BTreeMap<String, Value>>,
    /// Assigned once; survives graph rebuilds when set by the caller or by
    /// an explicit identity-assignment pass.
    pub identity: Option<String>,
    pub children: Vec<Element>,
    pub background: Option<Box<Element>>,
    pub overlay: Option<Box<Element>>,
    pub context_menu: Vec<Element>,
}

impl Element {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            props: BTreeMap::new(),
            modifiers: Vec::new(),
            animation: None,
            identity: None,
            children: Vec::new(),
            background: None,
            overlay: None,
            context_menu: Vec::new(),
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Attaches the animation context the host applies when this node's
    /// properties change.
    pub fn animation(mut self, context: BTreeMap<String, Value>) -> Self {
        self.animation = Some(context);
        self
    }

    pub fn identity(mut self, id: impl Into<String>) -> Self {
        self.identity = Some(id.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn background(mut self, background: Element) -> Self {
        self.background = Some(Box::new(background));
        self
    }

    pub fn overlay(mut self, overlay: Element) -> Self {
        self.overlay = Some(Box::new(overlay));
        self
    }

    pub fn context_menu_item(mut self, item: Element) -> Self {
        self.context_menu.push(item);
        self
    }
}
