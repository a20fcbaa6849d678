use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use chatui_core::{
    Component, Event, EventKind, InputKind, InputSpec, NodeView, Props, RawInput, Scope,
};
use futures::future::LocalBoxFuture;

pub type InputHandler = Rc<dyn Fn(Scope, RawInput) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

/// Captures raw inbound input of the given kinds while it is on screen.
#[derive(Clone, Props)]
pub struct MessageInput {
    pub kinds: Vec<InputKind>,
    #[prop(skip)]
    on_input: Option<InputHandler>,
}

impl MessageInput {
    pub fn new() -> Self {
        Self::accepting(vec![InputKind::Any])
    }

    pub fn accepting(kinds: Vec<InputKind>) -> Self {
        Self {
            kinds,
            on_input: None,
        }
    }

    pub fn on_input<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Scope, RawInput) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.on_input = Some(Rc::new(move |scope, input| Box::pin(handler(scope, input))));
        self
    }
}

impl Default for MessageInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Component for MessageInput {
    async fn on_event(&self, scope: &Scope, event: &Event) -> anyhow::Result<()> {
        let EventKind::TextInputReceived { input } = event.kind() else {
            return Ok(());
        };
        match &self.on_input {
            Some(handler) if event.is_from(scope.node()) => {
                handler(scope.clone(), input.clone()).await
            }
            _ => Ok(()),
        }
    }

    fn render_inputs(&self, view: &NodeView<'_>) -> Vec<InputSpec> {
        vec![InputSpec::for_node(view.node(), self.kinds.clone())]
    }
}
