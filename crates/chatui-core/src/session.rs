use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio::task::JoinHandle;

use crate::component::Element;
use crate::config::EngineConfig;
use crate::context::RenderContext;
use crate::dispatcher::{ContextProvider, DispatchReport, Dispatcher, ScreenSink};
use crate::error::SessionError;
use crate::event::RawInput;
use crate::message::MessageSpec;
use crate::navigator::{NavigationStack, Navigator};
use crate::renderer::Renderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Created,
    Started,
    Stopped,
}

/// One user conversation: its tree, queue, navigator and the sink its screens go to.
pub struct Session {
    context: RenderContext,
    navigator: Navigator,
    renderer: Rc<Renderer>,
    dispatcher: Rc<Dispatcher>,
    sink: Rc<dyn ScreenSink>,
    phase: Cell<Phase>,
    task: RefCell<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(start: Element, sink: Rc<dyn ScreenSink>, config: EngineConfig) -> Self {
        let (context, receiver) = RenderContext::new(config);
        let navigator = Navigator::new(start);
        context.set_navigator(navigator.clone());
        let renderer = Rc::new(Renderer::new(context.clone()));
        let dispatcher = Rc::new(Dispatcher::new(renderer.clone(), receiver, sink.clone()));
        Self {
            context,
            navigator,
            renderer,
            dispatcher,
            sink,
            phase: Cell::new(Phase::Created),
            task: RefCell::new(None),
        }
    }

    pub fn with_provider(self, provider: Rc<dyn ContextProvider>) -> Self {
        self.dispatcher.set_provider(provider);
        self
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn renderer(&self) -> &Rc<Renderer> {
        &self.renderer
    }

    pub fn dispatcher(&self) -> &Rc<Dispatcher> {
        &self.dispatcher
    }

    pub fn screen(&self) -> Vec<MessageSpec> {
        self.renderer.screen()
    }

    pub fn is_started(&self) -> bool {
        self.phase.get() == Phase::Started
    }

    /// Mounts the navigation stack. With `display`, the initial screen goes to the sink
    /// as a reset.
    pub async fn start(&self, display: bool) -> Result<Vec<MessageSpec>, SessionError> {
        match self.phase.get() {
            Phase::Created => {}
            Phase::Started => return Err(SessionError::AlreadyStarted),
            Phase::Stopped => return Err(SessionError::Stopped),
        }
        self.phase.set(Phase::Started);
        self.dispatcher.refresh_context().await;
        let root = Element::new(NavigationStack::new(self.navigator.clone()));
        let output = self.renderer.mount(root).await;
        self.dispatcher.drive_tasks().await;
        self.dispatcher.register(&output.screen);
        log::info!("session started with {} messages", output.screen.len());
        if display {
            self.sink.reset(output.screen.clone()).await;
        }
        Ok(output.screen)
    }

    /// Consumes the queue until [`stop`](Self::stop).
    pub async fn run(&self) -> Result<(), SessionError> {
        // A stopping session still drains up to its stop marker.
        match self.phase.get() {
            Phase::Created => Err(SessionError::NotStarted),
            Phase::Started | Phase::Stopped => self.dispatcher.run().await,
        }
    }

    /// Runs the queue consumer on the current `LocalSet`.
    pub fn spawn(self: &Rc<Self>) -> Result<(), SessionError> {
        match self.phase.get() {
            Phase::Created => return Err(SessionError::NotStarted),
            Phase::Stopped => return Err(SessionError::Stopped),
            Phase::Started => {}
        }
        if self.task.borrow().is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        let session = self.clone();
        let task = tokio::task::spawn_local(async move {
            if let Err(err) = session.run().await {
                log::error!("session loop ended: {err}");
            }
        });
        *self.task.borrow_mut() = Some(task);
        Ok(())
    }

    /// Lets every queued item finish, then ends the consumer and unmounts the tree.
    pub async fn stop(&self) {
        if self.phase.replace(Phase::Stopped) == Phase::Stopped {
            return;
        }
        self.dispatcher.stop();
        let task = self.task.borrow_mut().take();
        match task {
            Some(task) => {
                if let Err(err) = task.await {
                    log::error!("session loop failed: {err}");
                }
            }
            None => {
                while let Some(report) = self.dispatcher.drain_pending().await {
                    if report.stopped {
                        break;
                    }
                }
            }
        }
        self.renderer.clear().await;
        log::info!("session stopped");
    }

    /// Queues a full re-render that reaches the sink as a reset.
    ///
    /// Without a running consumer loop the queue is drained right away and its report
    /// returned; otherwise the loop picks the reset up and this returns `None`.
    pub async fn reset_screen(&self) -> Result<Option<DispatchReport>, SessionError> {
        self.ensure_started()?;
        self.dispatcher.request_reset();
        Ok(self.drain().await)
    }

    pub fn back(&self) -> bool {
        self.navigator.back()
    }

    /// Queues a re-render of the whole tree.
    pub fn refresh(&self) -> Result<(), SessionError> {
        self.ensure_started()?;
        if let Some(root) = self.renderer.root() {
            root.invalidate();
        }
        Ok(())
    }

    pub fn push_button(&self, id: &str) -> bool {
        self.is_started() && self.dispatcher.push_button(id)
    }

    pub fn push_input(&self, input: RawInput) -> bool {
        self.is_started() && self.dispatcher.push_input(input)
    }

    /// Handles whatever is queued, when no consumer loop is running.
    pub async fn drain(&self) -> Option<DispatchReport> {
        // A spawned loop owns the queue even before its first poll.
        if self.task.borrow().is_some() {
            return None;
        }
        self.dispatcher.drain_pending().await
    }

    fn ensure_started(&self) -> Result<(), SessionError> {
        match self.phase.get() {
            Phase::Created => Err(SessionError::NotStarted),
            Phase::Started => Ok(()),
            Phase::Stopped => Err(SessionError::Stopped),
        }
    }
}
