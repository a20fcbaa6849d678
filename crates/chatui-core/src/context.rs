//! Per-session state shared by every node of one tree.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::hash::HashMap;
use crate::config::EngineConfig;
use crate::event::Event;
use crate::navigator::Navigator;
use crate::value::Value;

/// Item of the session queue.
pub enum QueueItem {
    Event(Event),
    /// Re-render the whole tree and hand it to the sink as a reset.
    Reset,
    /// Ends the consumer once every earlier item has been handled.
    Stop,
}

struct ContextInner {
    config: EngineConfig,
    queue: UnboundedSender<QueueItem>,
    tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    render_cycle: Cell<u64>,
    values: RefCell<HashMap<String, Value>>,
    navigator: RefCell<Option<Navigator>>,
}

#[derive(Clone)]
pub struct RenderContext {
    inner: Rc<ContextInner>,
}

impl RenderContext {
    pub fn new(config: EngineConfig) -> (Self, UnboundedReceiver<QueueItem>) {
        let (queue, receiver) = mpsc::unbounded_channel();
        let context = Self {
            inner: Rc::new(ContextInner {
                config,
                queue,
                tasks: RefCell::new(Vec::new()),
                render_cycle: Cell::new(0),
                values: RefCell::new(HashMap::new()),
                navigator: RefCell::new(None),
            }),
        };
        (context, receiver)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn emit(&self, event: Event) {
        self.push(QueueItem::Event(event));
    }

    pub(crate) fn push(&self, item: QueueItem) -> bool {
        if self.inner.queue.send(item).is_err() {
            log::debug!("session queue closed; item dropped");
            return false;
        }
        true
    }

    /// Queues a background task. The dispatcher drives it after the current item or
    /// render pass.
    pub fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.inner.tasks.borrow_mut().push(task);
    }

    pub fn take_tasks(&self) -> Vec<LocalBoxFuture<'static, ()>> {
        std::mem::take(&mut *self.inner.tasks.borrow_mut())
    }

    pub fn has_tasks(&self) -> bool {
        !self.inner.tasks.borrow().is_empty()
    }

    pub fn render_cycle(&self) -> u64 {
        self.inner.render_cycle.get()
    }

    pub(crate) fn next_render_cycle(&self) -> u64 {
        let cycle = self.inner.render_cycle.get() + 1;
        self.inner.render_cycle.set(cycle);
        cycle
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.inner.values.borrow().get(name).cloned()
    }

    pub fn set_value(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .values
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    pub fn navigator(&self) -> Option<Navigator> {
        self.inner.navigator.borrow().clone()
    }

    pub(crate) fn set_navigator(&self, navigator: Navigator) {
        *self.inner.navigator.borrow_mut() = Some(navigator);
    }
}
