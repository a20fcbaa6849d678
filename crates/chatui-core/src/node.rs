use std::cell::{Cell, RefCell};
use std::fmt;
use std::fmt::Debug;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;

use crate::component::{Component, Element, MessageFlags, NodeKind};
use crate::config::EngineConfig;
use crate::context::RenderContext;
use crate::error::ReactiveError;
use crate::event::Event;
use crate::message::{InputSpec, Keyboard, MediaRef, MessageSpec, ParseMode};
use crate::navigator::{Navigator, ScreenFrame};
use crate::props::Props;
use crate::reactive::{ReactiveStore, SlotKey};
use crate::value::{DynValue, Value};

pub type NodeId = usize;

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of a child among its siblings: the explicit key, or its position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RenderKey {
    Explicit(String),
    Index(usize),
}

impl fmt::Display for RenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderKey::Explicit(key) => f.write_str(key),
            RenderKey::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A mounted component: the latest blueprint plus the state that survives re-renders.
///
/// Parents own their children; the parent link is weak.
pub struct ComponentNode {
    id: NodeId,
    key: Option<RenderKey>,
    chained_key: String,
    parent: Weak<ComponentNode>,
    this: Weak<ComponentNode>,
    element: RefCell<Element>,
    props: RefCell<Props>,
    children: RefCell<IndexMap<RenderKey, Rc<ComponentNode>>>,
    visible_children: RefCell<Vec<Rc<ComponentNode>>>,
    store: ReactiveStore,
    context: RenderContext,
    mounted: Cell<bool>,
    active: Cell<bool>,
    can_notify: Cell<bool>,
    dirty: Cell<bool>,
    render_cycle: Cell<u64>,
}

impl ComponentNode {
    pub(crate) fn new(
        element: Element,
        parent: Option<&Rc<ComponentNode>>,
        key: Option<RenderKey>,
        context: RenderContext,
    ) -> Rc<Self> {
        let chained_key = match (parent, &key) {
            (Some(parent), Some(key)) if !parent.chained_key.is_empty() => {
                format!("{}.{}", parent.chained_key, key)
            }
            (Some(_), Some(key)) => key.to_string(),
            _ => String::new(),
        };
        Rc::new_cyclic(|this: &Weak<ComponentNode>| {
            let store = ReactiveStore::new();
            let weak = this.clone();
            store.set_write_hook(move |_key: &SlotKey| {
                if let Some(node) = weak.upgrade() {
                    node.notify_modified();
                }
            });
            let tasks = context.clone();
            store.set_task_sink(move |task| tasks.spawn(task));
            Self {
                id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
                key,
                chained_key,
                parent: parent.map(Rc::downgrade).unwrap_or_default(),
                this: this.clone(),
                element: RefCell::new(element),
                props: RefCell::new(Props::new()),
                children: RefCell::new(IndexMap::new()),
                visible_children: RefCell::new(Vec::new()),
                store,
                context,
                mounted: Cell::new(false),
                active: Cell::new(false),
                can_notify: Cell::new(false),
                dirty: Cell::new(false),
                render_cycle: Cell::new(0),
            }
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> Option<&RenderKey> {
        self.key.as_ref()
    }

    /// Dot-joined keys from the root's child down to this node. Empty for the root.
    pub fn chained_key(&self) -> &str {
        &self.chained_key
    }

    pub fn parent(&self) -> Option<Rc<ComponentNode>> {
        self.parent.upgrade()
    }

    pub fn ancestors(&self) -> impl Iterator<Item = Rc<ComponentNode>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn is_descendant_of(&self, ancestor: &ComponentNode) -> bool {
        self.ancestors().any(|node| node.id == ancestor.id)
    }

    pub fn element(&self) -> Element {
        self.element.borrow().clone()
    }

    pub fn component(&self) -> Rc<dyn Component> {
        self.element.borrow().component().clone()
    }

    pub fn is<T: Component>(&self) -> bool {
        (*self.component()).as_any().is::<T>()
    }

    pub fn kind(&self) -> NodeKind {
        self.component().kind()
    }

    pub fn route(&self) -> Option<String> {
        self.component().route().map(str::to_owned)
    }

    pub fn store(&self) -> &ReactiveStore {
        &self.store
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn scope(self: &Rc<Self>) -> Scope {
        Scope { node: self.clone() }
    }

    pub fn children(&self) -> Vec<Rc<ComponentNode>> {
        self.children.borrow().values().cloned().collect()
    }

    pub fn child(&self, key: &RenderKey) -> Option<Rc<ComponentNode>> {
        self.children.borrow().get(key).cloned()
    }

    pub fn visible_children(&self) -> Vec<Rc<ComponentNode>> {
        self.visible_children.borrow().clone()
    }

    /// Own visibility flag, ignoring ancestors.
    pub fn is_shown(&self) -> bool {
        self.element.borrow().is_visible()
    }

    /// Own and inherited visibility.
    pub fn is_visible(&self) -> bool {
        self.is_shown() && self.ancestors().all(|node| node.is_shown())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Whether `activated` fired more recently than `deactivated`.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn render_cycle(&self) -> u64 {
        self.render_cycle.get()
    }

    /// Marks the node for re-render even if none of its slots changed.
    pub fn invalidate(&self) {
        self.dirty.set(true);
        self.notify_modified();
    }

    pub(crate) fn notify_modified(&self) {
        if !(self.mounted.get() && self.can_notify.get()) {
            return;
        }
        if let Some(node) = self.this.upgrade() {
            self.context.emit(Event::node_mutated(node));
        }
    }

    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.replace(false)
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.mounted.set(mounted);
    }

    pub(crate) fn set_active(&self, active: bool) -> bool {
        self.active.replace(active) != active
    }

    pub(crate) fn set_can_notify(&self, can_notify: bool) {
        self.can_notify.set(can_notify);
    }

    pub(crate) fn set_render_cycle(&self, cycle: u64) {
        self.render_cycle.set(cycle);
    }

    pub(crate) fn replace_element(&self, element: Element) -> Element {
        self.element.replace(element)
    }

    pub(crate) fn replace_props(&self, props: Props) -> Props {
        self.props.replace(props)
    }

    pub(crate) fn replace_children(
        &self,
        children: IndexMap<RenderKey, Rc<ComponentNode>>,
    ) -> IndexMap<RenderKey, Rc<ComponentNode>> {
        let previous = self.children.replace(children);
        self.refresh_visible_children();
        previous
    }

    pub(crate) fn take_children(&self) -> IndexMap<RenderKey, Rc<ComponentNode>> {
        self.visible_children.borrow_mut().clear();
        std::mem::take(&mut *self.children.borrow_mut())
    }

    pub(crate) fn refresh_visible_children(&self) {
        let visible = self
            .children
            .borrow()
            .values()
            .filter(|child| child.is_shown())
            .cloned()
            .collect();
        *self.visible_children.borrow_mut() = visible;
    }

    pub fn render_text(self: &Rc<Self>) -> String {
        self.component().render_text(&NodeView::new(self))
    }

    fn render_text_as(self: &Rc<Self>, parse_mode: ParseMode) -> String {
        self.component()
            .render_text(&NodeView::new(self).with_parse_mode(parse_mode))
    }

    pub fn render_media(self: &Rc<Self>) -> Vec<MediaRef> {
        self.component().render_media(&NodeView::new(self))
    }

    pub fn render_keyboard(self: &Rc<Self>) -> Keyboard {
        self.component().render_keyboard(&NodeView::new(self))
    }

    pub fn render_inputs(self: &Rc<Self>) -> Vec<InputSpec> {
        self.component().render_inputs(&NodeView::new(self))
    }

    /// Aggregates this screen root into a message. `flags` are already resolved down to
    /// this node.
    pub(crate) fn render_message(
        self: &Rc<Self>,
        flags: &MessageFlags,
        config: &EngineConfig,
    ) -> MessageSpec {
        let parse_mode = flags.parse_mode.unwrap_or(config.parse_mode);
        MessageSpec {
            key: self.chained_key.clone(),
            text: self.render_text_as(parse_mode),
            media: self.render_media(),
            keyboard: self.render_keyboard(),
            inputs: self.render_inputs(),
            parse_mode,
            disable_web_page_preview: flags
                .disable_web_page_preview
                .unwrap_or(config.disable_web_page_preview),
            enable_notification: flags
                .enable_notification
                .unwrap_or(config.enable_notification),
        }
    }
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode")
            .field("id", &self.id)
            .field("component", &self.element.borrow().name())
            .field("chained_key", &self.chained_key)
            .field("mounted", &self.mounted.get())
            .finish()
    }
}

/// Handle passed to lifecycle hooks, event handlers and `render`.
#[derive(Clone)]
pub struct Scope {
    node: Rc<ComponentNode>,
}

impl Scope {
    pub fn node(&self) -> &Rc<ComponentNode> {
        &self.node
    }

    pub fn store(&self) -> &ReactiveStore {
        &self.node.store
    }

    pub fn context(&self) -> &RenderContext {
        &self.node.context
    }

    pub fn chained_key(&self) -> &str {
        self.node.chained_key()
    }

    pub fn element(&self) -> Element {
        self.node.element()
    }

    /// Blueprint children passed to this component.
    pub fn children(&self) -> Vec<Element> {
        self.node.element.borrow().children().to_vec()
    }

    pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<T, ReactiveError> {
        self.node.store.get(name)
    }

    pub fn prop<T: Clone + 'static>(&self, name: &str) -> Result<T, ReactiveError> {
        self.node.store.prop(name)
    }

    pub fn set<T: DynValue + PartialEq + Debug>(&self, name: &str, value: T) -> bool {
        self.node.store.set(name, value)
    }

    /// Creates the slot with `value` unless it already exists.
    pub fn init<T: DynValue + PartialEq + Debug>(&self, name: &str, value: T) {
        if !self.node.store.contains(&SlotKey::state(name)) {
            self.node.store.set(name, value);
        }
    }

    pub fn invalidate(&self) {
        self.node.invalidate();
    }

    /// Queues a custom event that bubbles from this node.
    pub fn emit(&self, name: impl Into<String>, payload: impl Into<Value>) {
        self.node
            .context
            .emit(Event::custom(self.node.clone(), name, payload.into()));
    }

    pub fn navigator(&self) -> Option<Navigator> {
        self.node.context.navigator()
    }

    pub fn context_value<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.node.context.value(name).and_then(|value| value.get::<T>())
    }

    /// Top local state of the navigation entry this node belongs to.
    pub fn screen_state(&self) -> Option<Value> {
        std::iter::once(self.node.clone())
            .chain(self.node.ancestors())
            .find(|node| node.is::<ScreenFrame>())
            .and_then(|frame| frame.store.peek(&SlotKey::prop(ScreenFrame::STATE_PROP)))
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Rc::downgrade(&self.node))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scope").field(&self.node).finish()
    }
}

/// Non-owning [`Scope`], for callbacks that outlive a render pass.
#[derive(Clone, Default)]
pub struct WeakScope(Weak<ComponentNode>);

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.0
            .upgrade()
            .filter(|node| node.is_mounted())
            .map(|node| Scope { node })
    }
}

/// Read-only view given to the aggregation hooks.
pub struct NodeView<'a> {
    node: &'a Rc<ComponentNode>,
    parse_mode: ParseMode,
}

impl<'a> NodeView<'a> {
    /// View under the session's default parse mode.
    pub fn new(node: &'a Rc<ComponentNode>) -> Self {
        Self {
            node,
            parse_mode: node.context.config().parse_mode,
        }
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    /// Parse mode of the message this node's text ends up in.
    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    pub fn node(&self) -> &'a Rc<ComponentNode> {
        self.node
    }

    pub fn store(&self) -> &'a ReactiveStore {
        &self.node.store
    }

    pub fn chained_key(&self) -> &'a str {
        self.node.chained_key()
    }

    /// Visible children that belong to this message, i.e. excluding nested screens.
    pub fn children(&self) -> Vec<Rc<ComponentNode>> {
        self.node
            .visible_children()
            .into_iter()
            .filter(|child| !child.kind().is_screen())
            .collect()
    }

    pub fn children_text(&self) -> String {
        self.children()
            .iter()
            .map(|child| child.render_text_as(self.parse_mode))
            .collect()
    }

    pub fn children_media(&self) -> Vec<MediaRef> {
        self.children()
            .iter()
            .flat_map(|child| child.render_media())
            .collect()
    }

    pub fn children_keyboard(&self) -> Keyboard {
        self.children()
            .iter()
            .flat_map(|child| child.render_keyboard())
            .collect()
    }

    pub fn children_inputs(&self) -> Vec<InputSpec> {
        self.children()
            .iter()
            .flat_map(|child| child.render_inputs())
            .collect()
    }
}
