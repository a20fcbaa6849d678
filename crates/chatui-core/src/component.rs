use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;

use crate::event::Event;
use crate::message::{InputSpec, Keyboard, MediaRef, ParseMode};
use crate::node::{NodeView, Scope};
use crate::props::{PropSource, Props};

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn component_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Message flags a screen or group sets explicitly. `None` inherits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageFlags {
    pub parse_mode: Option<ParseMode>,
    pub disable_web_page_preview: Option<bool>,
    pub enable_notification: Option<bool>,
}

impl MessageFlags {
    /// Fills every unset flag from `outer`.
    pub fn or(&self, outer: &MessageFlags) -> MessageFlags {
        MessageFlags {
            parse_mode: self.parse_mode.or(outer.parse_mode),
            disable_web_page_preview: self
                .disable_web_page_preview
                .or(outer.disable_web_page_preview),
            enable_notification: self.enable_notification.or(outer.enable_notification),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Plain,
    /// Starts a new message in the collapsed screen list.
    Screen(MessageFlags),
    /// Groups screens and passes its flags down without producing a message.
    Group(MessageFlags),
}

impl NodeKind {
    pub fn is_screen(&self) -> bool {
        matches!(self, NodeKind::Screen(_))
    }

    pub fn flags(&self) -> Option<&MessageFlags> {
        match self {
            NodeKind::Plain => None,
            NodeKind::Screen(flags) | NodeKind::Group(flags) => Some(flags),
        }
    }
}

/// A widget. Instances are blueprints: immutable prop carriers rebuilt every render pass,
/// while persistent state lives in the node's [`ReactiveStore`](crate::ReactiveStore).
///
/// Every hook defaults to a no-op and the four aggregation hooks default to concatenating
/// the visible, non-screen children.
#[async_trait(?Send)]
pub trait Component: AsAny + PropSource {
    fn kind(&self) -> NodeKind {
        NodeKind::Plain
    }

    /// Route name used by back navigation.
    fn route(&self) -> Option<&str> {
        None
    }

    async fn setup(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn before_mount(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn mounted(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn before_update(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn updated(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn before_unmount(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn unmounted(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn activated(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    async fn deactivated(&self, _scope: &Scope) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called for every event bubbling through this node.
    async fn on_event(&self, _scope: &Scope, _event: &Event) -> anyhow::Result<()> {
        Ok(())
    }

    fn render(&self, scope: &Scope) -> anyhow::Result<Vec<Element>> {
        Ok(scope.children())
    }

    fn render_text(&self, view: &NodeView<'_>) -> String {
        view.children_text()
    }

    fn render_media(&self, view: &NodeView<'_>) -> Vec<MediaRef> {
        view.children_media()
    }

    fn render_keyboard(&self, view: &NodeView<'_>) -> Keyboard {
        view.children_keyboard()
    }

    fn render_inputs(&self, view: &NodeView<'_>) -> Vec<InputSpec> {
        view.children_inputs()
    }
}

/// Blueprint for one child: a component plus the props the renderer handles itself.
#[derive(Clone)]
pub struct Element {
    component: Rc<dyn Component>,
    key: Option<String>,
    visible: bool,
    when: bool,
    children: Vec<Element>,
}

impl Element {
    pub fn new(component: impl Component) -> Self {
        Self::from_rc(Rc::new(component))
    }

    pub fn from_rc(component: Rc<dyn Component>) -> Self {
        Self {
            component,
            key: None,
            visible: true,
            when: true,
            children: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl ToString) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// A blueprint with `when == false` is dropped before positional keys are assigned.
    pub fn with_when(mut self, when: bool) -> Self {
        self.when = when;
        self
    }

    pub fn with_child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn component(&self) -> &Rc<dyn Component> {
        &self.component
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.when
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn props(&self) -> Props {
        self.component.to_props()
    }

    pub fn variant(&self) -> TypeId {
        (*self.component).as_any().type_id()
    }

    pub fn same_variant(&self, other: &Element) -> bool {
        self.variant() == other.variant()
    }

    pub fn downcast<T: Component>(&self) -> Option<&T> {
        (*self.component).as_any().downcast_ref::<T>()
    }

    pub fn name(&self) -> &'static str {
        (*self.component).component_name()
    }
}

impl<C: Component> From<C> for Element {
    fn from(component: C) -> Self {
        Element::new(component)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("component", &self.name())
            .field("key", &self.key)
            .field("visible", &self.visible)
            .field("children", &self.children)
            .finish()
    }
}
