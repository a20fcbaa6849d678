//! Per-session queue consumer.
//!
//! The dispatcher pops one item, then keeps draining without yielding: mutation
//! notifications collect their nodes into a modified set, external events bubble up the
//! tree. Once the queue is empty it runs one render pass over the modified set, so any
//! burst of writes collapses into a single screen diff. A queued reset turns that pass
//! into a full re-render handed to the sink as a reset.
//!
//! Every render of a started session goes through here, so no two passes ever reconcile
//! the same tree at once.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::hash::HashMap;
use crate::context::{QueueItem, RenderContext};
use crate::diff::ScreenAction;
use crate::error::SessionError;
use crate::event::{Event, EventKind, RawInput};
use crate::message::{ButtonSpec, InputSpec, MessageSpec};
use crate::node::{ComponentNode, NodeId};
use crate::renderer::Renderer;

/// Receives the output of render passes.
#[async_trait(?Send)]
pub trait ScreenSink {
    /// Replace everything shown so far with `screen`.
    async fn reset(&self, screen: Vec<MessageSpec>);

    /// Apply `actions`; `screen` is the full list they lead to.
    async fn update(&self, screen: Vec<MessageSpec>, actions: Vec<ScreenAction>);
}

/// Refreshes session-wide context values before each render pass.
#[async_trait(?Send)]
pub trait ContextProvider {
    async fn refresh(&self, context: &RenderContext) -> anyhow::Result<()>;
}

/// What one drained batch did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub events: usize,
    pub mutations: usize,
    pub modified: usize,
    pub rendered: bool,
    pub actions: usize,
    pub reset: bool,
    pub stopped: bool,
}

#[derive(Default)]
struct Batch {
    events: usize,
    mutations: usize,
    modified: IndexMap<NodeId, Rc<ComponentNode>>,
    force: Option<Rc<ComponentNode>>,
    reset: bool,
    stopped: bool,
}

pub struct Dispatcher {
    context: RenderContext,
    renderer: Rc<Renderer>,
    sink: Rc<dyn ScreenSink>,
    provider: RefCell<Option<Rc<dyn ContextProvider>>>,
    receiver: RefCell<Option<UnboundedReceiver<QueueItem>>>,
    buttons: RefCell<HashMap<String, ButtonSpec>>,
    inputs: RefCell<Vec<InputSpec>>,
    handled: Cell<u64>,
    stopped: Cell<bool>,
}

impl Dispatcher {
    pub fn new(
        renderer: Rc<Renderer>,
        receiver: UnboundedReceiver<QueueItem>,
        sink: Rc<dyn ScreenSink>,
    ) -> Self {
        Self {
            context: renderer.context().clone(),
            renderer,
            sink,
            provider: RefCell::new(None),
            receiver: RefCell::new(Some(receiver)),
            buttons: RefCell::new(HashMap::new()),
            inputs: RefCell::new(Vec::new()),
            handled: Cell::new(0),
            stopped: Cell::new(false),
        }
    }

    pub fn set_provider(&self, provider: Rc<dyn ContextProvider>) {
        *self.provider.borrow_mut() = Some(provider);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Consumes the queue until a stop request or until every sender is gone.
    pub async fn run(&self) -> Result<(), SessionError> {
        if self.stopped.get() {
            return Err(SessionError::Stopped);
        }
        let mut receiver = self
            .receiver
            .borrow_mut()
            .take()
            .ok_or(SessionError::AlreadyStarted)?;
        while let Some(item) = receiver.recv().await {
            let report = self.process(item, &mut receiver).await;
            if report.stopped {
                break;
            }
        }
        self.stopped.set(true);
        Ok(())
    }

    /// Handles everything queued right now, without waiting for more.
    /// Returns `None` when the queue was empty or [`run`](Self::run) owns it.
    pub async fn drain_pending(&self) -> Option<DispatchReport> {
        let mut receiver = self.receiver.borrow_mut().take()?;
        let report = match receiver.try_recv() {
            Ok(item) => Some(self.process(item, &mut receiver).await),
            Err(_) => None,
        };
        *self.receiver.borrow_mut() = Some(receiver);
        if report.as_ref().is_some_and(|report| report.stopped) {
            self.stopped.set(true);
        }
        report
    }

    /// Asks the consumer to exit once every earlier item is handled.
    pub fn stop(&self) {
        self.context.push(QueueItem::Stop);
    }

    /// Queues a full re-render that reaches the sink as a reset.
    pub fn request_reset(&self) {
        self.context.push(QueueItem::Reset);
    }

    /// Resolves a button id against the last rendered screen and queues its activation.
    pub fn push_button(&self, id: &str) -> bool {
        let button = self.buttons.borrow().get(id).cloned();
        let Some((node, button)) = button.and_then(|button| Some((button.node()?, button))) else {
            log::warn!("unknown button id {id}");
            return false;
        };
        self.context.emit(Event::button(node, button));
        true
    }

    /// Queues `input` for the first registered capture accepting its kind.
    pub fn push_input(&self, input: RawInput) -> bool {
        let node = self
            .inputs
            .borrow()
            .iter()
            .filter(|capture| capture.accepts(input.kind))
            .find_map(InputSpec::node);
        match node {
            Some(node) => {
                self.context.emit(Event::input(node, input));
                true
            }
            None => {
                log::debug!("no input capture accepts {:?}", input.kind);
                false
            }
        }
    }

    pub fn button(&self, id: &str) -> Option<ButtonSpec> {
        self.buttons.borrow().get(id).cloned()
    }

    pub fn button_ids(&self) -> Vec<String> {
        self.buttons.borrow().keys().cloned().collect()
    }

    /// Rebuilds the button and input registries from a freshly rendered screen.
    pub fn register(&self, screen: &[MessageSpec]) {
        let mut buttons = self.buttons.borrow_mut();
        let mut inputs = self.inputs.borrow_mut();
        buttons.clear();
        inputs.clear();
        for message in screen {
            for button in message.buttons() {
                buttons.insert(button.id.clone(), button.clone());
            }
            inputs.extend(message.inputs.iter().cloned());
        }
    }

    pub async fn refresh_context(&self) {
        let provider = self.provider.borrow().clone();
        if let Some(provider) = provider {
            if let Err(err) = provider.refresh(&self.context).await {
                log::error!("context provider failed: {err:#}");
            }
        }
    }

    async fn process(
        &self,
        first: QueueItem,
        receiver: &mut UnboundedReceiver<QueueItem>,
    ) -> DispatchReport {
        let started = Instant::now();
        let mut batch = Batch::default();
        let mut next = Some(first);
        while let Some(item) = next {
            match item {
                QueueItem::Stop => batch.stopped = true,
                QueueItem::Reset if batch.stopped => {
                    log::debug!("dropping reset queued after stop");
                }
                QueueItem::Reset => batch.reset = true,
                // Mutations caused by earlier items still render; new events do not.
                QueueItem::Event(event) if batch.stopped && !event.is_mutation() => {
                    log::debug!("dropping event queued after stop: {event:?}");
                }
                QueueItem::Event(event) => self.handle(event, &mut batch).await,
            }
            self.drive_tasks().await;
            next = receiver.try_recv().ok();
        }
        log::debug!(
            "handled {} events and {} mutations in {:?}",
            batch.events,
            batch.mutations,
            started.elapsed()
        );
        self.flush(batch).await
    }

    async fn handle(&self, event: Event, batch: &mut Batch) {
        if event.is_mutation() {
            batch.mutations += 1;
            let node = event.sender().clone();
            if !node.is_mounted() || batch.modified.contains_key(&node.id()) {
                return;
            }
            let changed = node.store().snapshot_and_detect_change();
            if node.take_dirty() || changed {
                batch.modified.insert(node.id(), node);
            }
            return;
        }

        batch.events += 1;
        if let EventKind::ButtonActivated { .. } = event.kind() {
            let sender = event.sender().clone();
            batch.modified.insert(sender.id(), sender.clone());
            batch.force = Some(sender);
        }
        let count = self.handled.get();
        self.handled.set(count + 1);
        log::debug!("handle event {count}: {event:?}");
        propagate(&event).await;
    }

    /// Runs background tasks until none are left, including those they spawn.
    pub(crate) async fn drive_tasks(&self) {
        while self.context.has_tasks() {
            join_all(self.context.take_tasks()).await;
        }
    }

    async fn flush(&self, batch: Batch) -> DispatchReport {
        let mut report = DispatchReport {
            events: batch.events,
            mutations: batch.mutations,
            modified: batch.modified.len(),
            rendered: false,
            actions: 0,
            reset: batch.reset,
            stopped: batch.stopped,
        };
        if batch.reset {
            self.refresh_context().await;
            let screen = self.renderer.render_full().await;
            self.drive_tasks().await;
            self.register(&screen);
            report.rendered = true;
            self.sink.reset(screen).await;
            return report;
        }
        if batch.modified.is_empty() {
            return report;
        }

        self.refresh_context().await;
        let nodes: Vec<_> = batch.modified.into_values().collect();
        let output = self.renderer.render(&nodes, batch.force.as_ref()).await;
        // Prop writes made while reconciling may have started async watchers.
        self.drive_tasks().await;
        self.register(&output.screen);
        report.rendered = true;
        report.actions = output.actions.len();
        self.sink.update(output.screen, output.actions).await;
        report
    }
}

/// Calls `on_event` from the sender up to the root until a handler stops propagation.
/// A failing handler is logged and the event keeps bubbling.
pub async fn propagate(event: &Event) {
    let mut current = Some(event.sender().clone());
    while let Some(node) = current {
        if event.is_propagation_stopped() {
            break;
        }
        let component = node.component();
        let scope = node.scope();
        if let Err(err) = component.on_event(&scope, event).await {
            log::error!(
                "event handler of {:?} failed: {err:#}",
                node.chained_key()
            );
        }
        current = node.parent();
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
