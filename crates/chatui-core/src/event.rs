use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::message::{ButtonSpec, InputKind};
use crate::node::ComponentNode;
use crate::value::Value;

/// Raw inbound input, matched against the registered input captures.
#[derive(Clone, Debug, PartialEq)]
pub struct RawInput {
    pub kind: InputKind,
    pub text: Option<String>,
    pub payload: Value,
}

impl RawInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Text,
            text: Some(text.into()),
            payload: Value::unit(),
        }
    }

    pub fn new(kind: InputKind, payload: impl Into<Value>) -> Self {
        Self {
            kind,
            text: None,
            payload: payload.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum EventKind {
    ButtonActivated { button: ButtonSpec },
    TextInputReceived { input: RawInput },
    Custom { name: String, payload: Value },
    NodeMutated,
}

pub struct Event {
    kind: EventKind,
    sender: Rc<ComponentNode>,
    stopped: Cell<bool>,
}

impl Event {
    pub fn new(kind: EventKind, sender: Rc<ComponentNode>) -> Self {
        Self {
            kind,
            sender,
            stopped: Cell::new(false),
        }
    }

    pub fn button(sender: Rc<ComponentNode>, button: ButtonSpec) -> Self {
        Self::new(EventKind::ButtonActivated { button }, sender)
    }

    pub fn input(sender: Rc<ComponentNode>, input: RawInput) -> Self {
        Self::new(EventKind::TextInputReceived { input }, sender)
    }

    pub fn custom(sender: Rc<ComponentNode>, name: impl Into<String>, payload: Value) -> Self {
        Self::new(
            EventKind::Custom {
                name: name.into(),
                payload,
            },
            sender,
        )
    }

    pub fn node_mutated(sender: Rc<ComponentNode>) -> Self {
        Self::new(EventKind::NodeMutated, sender)
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn sender(&self) -> &Rc<ComponentNode> {
        &self.sender
    }

    /// Whether this event was sent by `node` itself rather than a descendant.
    pub fn is_from(&self, node: &ComponentNode) -> bool {
        self.sender.id() == node.id()
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self.kind, EventKind::NodeMutated)
    }

    pub fn custom_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Custom { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("sender", &self.sender.chained_key())
            .field("stopped", &self.stopped.get())
            .finish()
    }
}
