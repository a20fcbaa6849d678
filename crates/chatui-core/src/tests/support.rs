use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::component::{Component, Element, MessageFlags, NodeKind};
use crate::config::EngineConfig;
use crate::context::{QueueItem, RenderContext};
use crate::node::{NodeView, Scope};
use crate::renderer::Renderer;
use crate::Props;

pub(crate) type Log = Rc<RefCell<Vec<String>>>;

pub(crate) fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

pub(crate) fn renderer() -> (Renderer, UnboundedReceiver<QueueItem>) {
    let (context, receiver) = RenderContext::new(EngineConfig::default());
    (Renderer::new(context), receiver)
}

/// Records every hook it goes through as "<hook> <name>".
#[derive(Clone, Props)]
pub(crate) struct Probe {
    pub name: String,
    pub text: String,
    pub screen: bool,
    #[prop(skip)]
    pub log: Log,
    #[prop(skip)]
    pub fail: Option<&'static str>,
}

impl Probe {
    pub fn new(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_owned(),
            text: name.to_owned(),
            screen: false,
            log: log.clone(),
            fail: None,
        }
    }

    pub fn screen(name: &str, log: &Log) -> Self {
        Self {
            screen: true,
            ..Self::new(name, log)
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_owned();
        self
    }

    pub fn failing(mut self, hook: &'static str) -> Self {
        self.fail = Some(hook);
        self
    }

    fn hook(&self, hook: &str) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("{hook} {}", self.name));
        if self.fail == Some(hook) {
            anyhow::bail!("{} broke in {hook}", self.name);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Component for Probe {
    fn kind(&self) -> NodeKind {
        if self.screen {
            NodeKind::Screen(MessageFlags::default())
        } else {
            NodeKind::Plain
        }
    }

    async fn setup(&self, _scope: &Scope) -> anyhow::Result<()> {
        self.hook("setup")
    }

    async fn mounted(&self, _scope: &Scope) -> anyhow::Result<()> {
        self.hook("mounted")
    }

    async fn updated(&self, _scope: &Scope) -> anyhow::Result<()> {
        self.hook("updated")
    }

    async fn unmounted(&self, _scope: &Scope) -> anyhow::Result<()> {
        self.hook("unmounted")
    }

    async fn activated(&self, _scope: &Scope) -> anyhow::Result<()> {
        self.hook("activated")
    }

    async fn deactivated(&self, _scope: &Scope) -> anyhow::Result<()> {
        self.hook("deactivated")
    }

    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        if self.fail == Some("render") {
            anyhow::bail!("{} cannot render", self.name);
        }
        Ok(scope.children())
    }

    fn render_text(&self, view: &NodeView<'_>) -> String {
        format!("{}{}", self.text, view.children_text())
    }
}

/// Screen whose children are probes keyed by the `keys` state slot.
#[derive(Clone, Props)]
pub(crate) struct KeyedList {
    pub initial: Vec<String>,
    #[prop(skip)]
    pub log: Log,
}

impl KeyedList {
    pub fn new(keys: &[&str], log: &Log) -> Self {
        Self {
            initial: keys.iter().map(|key| key.to_string()).collect(),
            log: log.clone(),
        }
    }
}

pub(crate) fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

#[async_trait(?Send)]
impl Component for KeyedList {
    fn kind(&self) -> NodeKind {
        NodeKind::Screen(MessageFlags::default())
    }

    async fn setup(&self, scope: &Scope) -> anyhow::Result<()> {
        scope.init("keys", self.initial.clone());
        Ok(())
    }

    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        let keys: Vec<String> = scope.get("keys")?;
        Ok(keys
            .iter()
            .map(|key| Element::new(Probe::new(key, &self.log)).with_key(key))
            .collect())
    }
}
