//! Buttons that drive the session's navigation stack

use std::future::Future;
use std::rc::Rc;

use anyhow::anyhow;
use chatui_core::{ButtonSpec, Component, Element, Navigator, Props, Scope, Value};

use super::button::{click_handler, Button, ClickHandler};

pub type ScreenFactory = Rc<dyn Fn() -> Element>;

fn navigator(scope: &Scope) -> anyhow::Result<Navigator> {
    scope
        .navigator()
        .ok_or_else(|| anyhow!("navigation button rendered outside a session"))
}

/// Opens a new screen, or a new state of the current one when `to` is empty.
#[derive(Clone, Default, Props)]
pub struct Navigate {
    #[prop(skip)]
    to: Option<ScreenFactory>,
    pub state: Option<Value>,
    pub replace: bool,
    #[prop(skip)]
    on_click: Option<ClickHandler>,
}

impl Navigate {
    pub fn to<F>(screen: F) -> Self
    where
        F: Fn() -> Element + 'static,
    {
        Self {
            to: Some(Rc::new(screen)),
            ..Self::default()
        }
    }

    pub fn state(state: impl Into<Value>) -> Self {
        Self::default().with_state(state)
    }

    pub fn with_state(mut self, state: impl Into<Value>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Runs before the navigation happens.
    pub fn on_click<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Scope, ButtonSpec) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.on_click = Some(click_handler(handler));
        self
    }
}

impl Component for Navigate {
    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let navigator = navigator(scope)?;
        let to = self.to.clone();
        let state = self.state.clone();
        let replace = self.replace;
        let before = self.on_click.clone();
        let button = Button::new().on_click(move |scope, button| {
            let navigator = navigator.clone();
            let screen = to.as_ref().map(|factory| factory());
            let state = state.clone();
            let before = before.clone();
            async move {
                if let Some(before) = before {
                    before(scope, button).await?;
                }
                navigator.navigate(screen, state, replace);
                Ok(())
            }
        });
        Ok(vec![Element::new(button).with_children(scope.children())])
    }
}

/// Goes back one step, or to the named route and/or state when given.
#[derive(Clone, Default, Props)]
pub struct Back {
    pub to: Option<String>,
    pub state: Option<Value>,
    #[prop(skip)]
    on_click: Option<ClickHandler>,
}

impl Back {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(route: impl Into<String>) -> Self {
        Self {
            to: Some(route.into()),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: impl Into<Value>) -> Self {
        self.state = Some(state.into());
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

impl Component for Back {
    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let navigator = navigator(scope)?;
        let route = self.to.clone();
        let state = self.state.clone();
        let before = self.on_click.clone();
        let button = Button::new().on_click(move |scope, button| {
            let navigator = navigator.clone();
            let route = route.clone();
            let state = state.clone();
            let before = before.clone();
            async move {
                if let Some(before) = before {
                    before(scope, button).await?;
                }
                if !navigator.back_with(route.as_deref(), state.as_ref()) {
                    log::debug!("back navigation found no target");
                }
                Ok(())
            }
        });
        Ok(vec![Element::new(button).with_children(scope.children())])
    }
}
