//! Back-stack of screens, each with its own history of local states.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use async_trait::async_trait;

use crate::component::{Component, Element, MessageFlags, NodeKind};
use crate::node::{ComponentNode, RenderKey, Scope};
use crate::value::Value;
use crate::Props;

pub type EntryId = u64;

#[derive(Clone, Debug)]
pub struct NavigationEntry {
    pub id: EntryId,
    pub screen: Element,
    /// Never empty.
    pub states: Vec<Value>,
}

impl NavigationEntry {
    pub fn state(&self) -> Value {
        self.states.last().cloned().unwrap_or_default()
    }
}

/// Snapshot of one entry, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntrySummary {
    pub id: EntryId,
    pub route: Option<String>,
    pub states: usize,
}

struct NavigatorInner {
    entries: RefCell<Vec<NavigationEntry>>,
    next_id: Cell<EntryId>,
    container: RefCell<Weak<ComponentNode>>,
}

#[derive(Clone)]
pub struct Navigator {
    inner: Rc<NavigatorInner>,
}

impl Navigator {
    pub fn new(start: Element) -> Self {
        Self::with_state(start, Value::unit())
    }

    pub fn with_state(start: Element, state: Value) -> Self {
        Self {
            inner: Rc::new(NavigatorInner {
                entries: RefCell::new(vec![NavigationEntry {
                    id: 1,
                    screen: start,
                    states: vec![state],
                }]),
                next_id: Cell::new(2),
                container: RefCell::new(Weak::new()),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    pub fn entries(&self) -> Vec<NavigationEntry> {
        self.inner.entries.borrow().clone()
    }

    pub fn stack(&self) -> Vec<EntrySummary> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|entry| EntrySummary {
                id: entry.id,
                route: self.route_of(entry),
                states: entry.states.len(),
            })
            .collect()
    }

    pub fn current_state(&self) -> Value {
        self.inner
            .entries
            .borrow()
            .last()
            .map(NavigationEntry::state)
            .unwrap_or_default()
    }

    /// Pushes `screen` as a new entry holding one state.
    pub fn push(&self, screen: Element) {
        self.navigate(Some(screen), None, false);
    }

    /// Pushes a local state onto the current entry, keeping its screen mounted.
    pub fn push_state(&self, state: impl Into<Value>) {
        self.navigate(None, Some(state.into()), false);
    }

    /// With `to`, pushes a new entry (replacing the top one if `replace`). With only
    /// `state`, pushes (or replaces) a local state of the current entry. Does nothing
    /// when both are `None`.
    pub fn navigate(&self, to: Option<Element>, state: Option<Value>, replace: bool) {
        {
            let mut entries = self.inner.entries.borrow_mut();
            match (to, state) {
                (None, None) => return,
                (Some(screen), state) => {
                    if replace {
                        entries.pop();
                    }
                    let id = self.inner.next_id.get();
                    self.inner.next_id.set(id + 1);
                    entries.push(NavigationEntry {
                        id,
                        screen,
                        states: vec![state.unwrap_or_default()],
                    });
                }
                (None, Some(state)) => {
                    let Some(top) = entries.last_mut() else {
                        return;
                    };
                    if replace && top.states.len() > 1 {
                        top.states.pop();
                    } else if replace {
                        top.states.clear();
                    }
                    top.states.push(state);
                }
            }
        }
        self.invalidate_container();
    }

    /// Pops one local state if the top entry has several, else pops the top entry.
    /// Never pops the last state of the last entry; returns whether anything changed.
    pub fn back(&self) -> bool {
        let changed = {
            let mut entries = self.inner.entries.borrow_mut();
            let entry_count = entries.len();
            match entries.last_mut() {
                Some(top) if top.states.len() > 1 => {
                    top.states.pop();
                    true
                }
                Some(_) if entry_count > 1 => {
                    entries.pop();
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.invalidate_container();
        }
        changed
    }

    /// Truncates the stack to the topmost entry declaring `route`.
    pub fn back_to(&self, route: &str) -> bool {
        self.back_with(Some(route), None)
    }

    /// Truncates the current entry's history to the latest occurrence of `state`.
    pub fn back_to_state(&self, state: &Value) -> bool {
        self.back_with(None, Some(state))
    }

    /// Combined form of [`back`](Self::back), [`back_to`](Self::back_to) and
    /// [`back_to_state`](Self::back_to_state). Nothing changes unless every target is found.
    pub fn back_with(&self, route: Option<&str>, state: Option<&Value>) -> bool {
        if route.is_none() && state.is_none() {
            return self.back();
        }

        let entry_index = {
            let entries = self.inner.entries.borrow();
            match route {
                Some(route) => entries
                    .iter()
                    .rposition(|entry| self.route_of(entry).as_deref() == Some(route)),
                None => entries.len().checked_sub(1),
            }
        };
        let Some(entry_index) = entry_index else {
            return false;
        };

        let state_index = match state {
            Some(state) => {
                let entries = self.inner.entries.borrow();
                match entries[entry_index].states.iter().rposition(|s| s == state) {
                    Some(index) => Some(index),
                    None => return false,
                }
            }
            None => None,
        };

        {
            let mut entries = self.inner.entries.borrow_mut();
            entries.truncate(entry_index + 1);
            if let (Some(index), Some(top)) = (state_index, entries.last_mut()) {
                top.states.truncate(index + 1);
            }
        }
        self.invalidate_container();
        true
    }

    /// Pops until [`back`](Self::back) reports nothing left to pop.
    pub fn reset(&self) {
        while self.back() {}
    }

    pub(crate) fn attach(&self, container: &Rc<ComponentNode>) {
        *self.inner.container.borrow_mut() = Rc::downgrade(container);
    }

    fn invalidate_container(&self) {
        let container = self.inner.container.borrow().upgrade();
        match container {
            Some(container) => container.invalidate(),
            None => log::debug!("navigation changed before the stack was mounted"),
        }
    }

    /// Route declared by the entry's screen, or else by any still-mounted node of it.
    fn route_of(&self, entry: &NavigationEntry) -> Option<String> {
        if let Some(route) = entry.screen.component().route() {
            return Some(route.to_owned());
        }
        let container = self.inner.container.borrow().upgrade()?;
        let frame = container.child(&RenderKey::Explicit(entry.id.to_string()))?;
        find_route(&frame)
    }
}

fn find_route(node: &Rc<ComponentNode>) -> Option<String> {
    node.route()
        .or_else(|| node.children().iter().find_map(find_route))
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("stack", &self.stack())
            .finish()
    }
}

/// Root of a session tree: one [`ScreenFrame`] per navigation entry, only the top one
/// visible.
#[derive(Clone, Props)]
pub struct NavigationStack {
    #[prop(skip)]
    navigator: Navigator,
}

impl NavigationStack {
    pub fn new(navigator: Navigator) -> Self {
        Self { navigator }
    }
}

#[async_trait(?Send)]
impl Component for NavigationStack {
    fn kind(&self) -> NodeKind {
        NodeKind::Group(MessageFlags::default())
    }

    async fn setup(&self, scope: &Scope) -> anyhow::Result<()> {
        self.navigator.attach(scope.node());
        Ok(())
    }

    fn render(&self, _scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let entries = self.navigator.entries();
        let top = entries.len().saturating_sub(1);
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let state = entry.state();
                Element::new(ScreenFrame {
                    entry: entry.id,
                    state,
                })
                .with_key(entry.id)
                .with_visible(index == top)
                .with_child(entry.screen)
            })
            .collect())
    }
}

/// Hosts the screen of one navigation entry and exposes its current local state as the
/// `state` prop, read through [`Scope::screen_state`].
#[derive(Clone, Debug, PartialEq, Props)]
pub struct ScreenFrame {
    pub entry: EntryId,
    pub state: Value,
}

impl ScreenFrame {
    pub const STATE_PROP: &'static str = "state";
}

impl Component for ScreenFrame {}

#[cfg(test)]
#[path = "tests/navigator_tests.rs"]
mod tests;
