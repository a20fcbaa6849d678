//! Button widget implementation

use std::future::Future;
use std::rc::Rc;

use async_trait::async_trait;
use chatui_core::{ButtonSpec, Component, Event, EventKind, Keyboard, NodeView, Props, Scope};
use futures::future::LocalBoxFuture;

use crate::symbols;

pub type ClickHandler =
    Rc<dyn Fn(Scope, ButtonSpec) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

pub(crate) fn click_handler<F, Fut>(handler: F) -> ClickHandler
where
    F: Fn(Scope, ButtonSpec) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<()>> + 'static,
{
    Rc::new(move |scope, button| Box::pin(handler(scope, button)))
}

/// One keyboard button labelled with the text of its children. Contributes no message
/// text of its own.
#[derive(Clone, Default, Props)]
pub struct Button {
    pub url: Option<String>,
    #[prop(skip)]
    on_click: Option<ClickHandler>,
}

impl Button {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns the button into a link; link buttons never produce activations.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn on_click<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Scope, ButtonSpec) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.on_click = Some(click_handler(handler));
        self
    }
}

#[async_trait(?Send)]
impl Component for Button {
    async fn on_event(&self, scope: &Scope, event: &Event) -> anyhow::Result<()> {
        let EventKind::ButtonActivated { button } = event.kind() else {
            return Ok(());
        };
        match &self.on_click {
            Some(handler) if event.is_from(scope.node()) => {
                handler(scope.clone(), button.clone()).await
            }
            _ => Ok(()),
        }
    }

    fn render_text(&self, _view: &NodeView<'_>) -> String {
        String::new()
    }

    fn render_keyboard(&self, view: &NodeView<'_>) -> Keyboard {
        let label = symbols::keyboard_label(&view.children_text());
        let button = ButtonSpec::for_node(view.node(), label);
        let button = match &self.url {
            Some(url) => button.with_url(url.clone()),
            None => button,
        };
        vec![vec![button]]
    }
}
