//! Tree reconciliation and screen-list collapse.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use futures::future::{join_all, LocalBoxFuture};
use indexmap::IndexMap;

use crate::hash::HashSet;
use crate::component::{Component, Element, MessageFlags};
use crate::config::EngineConfig;
use crate::context::RenderContext;
use crate::diff::{diff_screens, ScreenAction};
use crate::message::MessageSpec;
use crate::node::{ComponentNode, NodeId, RenderKey, Scope};
use crate::screens::ErrorPlaceholder;

const ERROR_KEY: &str = "error";

/// Result of a render pass: the full new screen list and the actions that turn the
/// previous list into it.
#[derive(Clone, Debug, Default)]
pub struct RenderOutput {
    pub screen: Vec<MessageSpec>,
    pub actions: Vec<ScreenAction>,
}

pub struct Renderer {
    context: RenderContext,
    root: RefCell<Option<Rc<ComponentNode>>>,
    screen: RefCell<Vec<MessageSpec>>,
}

impl Renderer {
    pub fn new(context: RenderContext) -> Self {
        Self {
            context,
            root: RefCell::new(None),
            screen: RefCell::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn root(&self) -> Option<Rc<ComponentNode>> {
        self.root.borrow().clone()
    }

    /// The message list produced by the last pass.
    pub fn screen(&self) -> Vec<MessageSpec> {
        self.screen.borrow().clone()
    }

    /// Mounts `element` as the root, unmounting any previous tree.
    pub async fn mount(&self, element: Element) -> RenderOutput {
        let previous = self.root.borrow_mut().take();
        if let Some(previous) = previous {
            self.unmount(previous).await;
        }
        let root = ComponentNode::new(element.clone(), None, None, self.context.clone());
        *self.root.borrow_mut() = Some(root.clone());
        let cycle = self.context.next_render_cycle();
        self.render_node(root, element, true, cycle).await;
        self.finish(None)
    }

    /// Re-renders the topmost nodes of `modified` and diffs the result against the
    /// previous screen list. `force` is the node whose message must be refreshed.
    pub async fn render(
        &self,
        modified: &[Rc<ComponentNode>],
        force: Option<&Rc<ComponentNode>>,
    ) -> RenderOutput {
        let started = Instant::now();
        let trees = topmost(modified);
        log::debug!(
            "rendering {} of {} modified nodes",
            trees.len(),
            modified.len()
        );
        join_all(trees.into_iter().map(|node| self.render_tree(node))).await;
        let output = self.finish(force);
        log::debug!(
            "render pass produced {} messages, {} actions in {:?}",
            output.screen.len(),
            output.actions.len(),
            started.elapsed()
        );
        output
    }

    /// Re-renders the whole tree and replaces the screen list without diffing.
    pub async fn render_full(&self) -> Vec<MessageSpec> {
        if let Some(root) = self.root() {
            self.render_tree(root).await;
        }
        let screen = self.collect_screen();
        *self.screen.borrow_mut() = screen.clone();
        screen
    }

    pub fn collect_screen(&self) -> Vec<MessageSpec> {
        let mut screen = Vec::new();
        if let Some(root) = self.root() {
            collect_messages(
                &root,
                &MessageFlags::default(),
                self.context.config(),
                &mut screen,
            );
        }
        screen
    }

    /// Unmounts the whole tree.
    pub async fn clear(&self) {
        let root = self.root.borrow_mut().take();
        if let Some(root) = root {
            self.unmount(root).await;
        }
        self.screen.borrow_mut().clear();
    }

    fn finish(&self, force: Option<&Rc<ComponentNode>>) -> RenderOutput {
        let screen = self.collect_screen();
        let previous = self.screen.replace(screen.clone());
        let force_key = force.and_then(|node| force_target(node, &previous));
        let actions = diff_screens(&previous, &screen, force_key.as_deref());
        RenderOutput { screen, actions }
    }

    async fn render_tree(&self, node: Rc<ComponentNode>) {
        let cycle = self.context.next_render_cycle();
        let element = node.element();
        self.render_node(node.clone(), element, false, cycle).await;
        if let Some(parent) = node.parent() {
            parent.refresh_visible_children();
        }
    }

    fn render_node(
        &self,
        node: Rc<ComponentNode>,
        element: Element,
        created: bool,
        cycle: u64,
    ) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {
            let shown = element.is_visible();
            node.replace_element(element.clone());
            node.set_render_cycle(cycle);
            node.take_dirty();
            if created {
                node.set_mounted(true);
            } else if !shown {
                // Hidden nodes keep their last output until shown again.
                self.deactivate(node).await;
                return;
            }

            let props = element.props();
            let previous = node.replace_props(props.clone());
            node.set_can_notify(false);
            for (name, value) in props.changed_since(&previous) {
                node.store().set_prop(name, value.clone());
            }

            let scope = node.scope();
            let component = element.component().clone();
            if let Err(err) = self.run_hooks(&node, &scope, &component, created, cycle).await {
                log::error!(
                    "{} at {:?} failed to render: {err:#}",
                    element.name(),
                    node.chained_key()
                );
                node.set_can_notify(true);
                if created {
                    node.store().snapshot_and_detect_change();
                }
                self.replace_with_error(&node, &err, cycle).await;
            }

            // Visible children finished first and activated themselves.
            if node.is_visible() && node.set_active(true) {
                let scope = node.scope();
                if let Err(err) = node.component().activated(&scope).await {
                    log::error!("activated of {:?} failed: {err:#}", node.chained_key());
                }
            }
        })
    }

    async fn run_hooks(
        &self,
        node: &Rc<ComponentNode>,
        scope: &Scope,
        component: &Rc<dyn Component>,
        created: bool,
        cycle: u64,
    ) -> anyhow::Result<()> {
        if created {
            component.setup(scope).await?;
            component.before_mount(scope).await?;
        } else {
            component.before_update(scope).await?;
        }

        let blueprints = component.render(scope)?;
        node.set_can_notify(true);
        if created {
            node.store().snapshot_and_detect_change();
        }
        self.reconcile(node, blueprints, cycle).await;

        if created {
            component.mounted(scope).await
        } else {
            component.updated(scope).await
        }
    }

    async fn reconcile(&self, node: &Rc<ComponentNode>, blueprints: Vec<Element>, cycle: u64) {
        let mut previous = node.take_children();
        let mut removed = Vec::new();
        let mut planned: Vec<(RenderKey, Element, Option<Rc<ComponentNode>>)> = Vec::new();

        // Positions count disabled blueprints too, so toggling `when` on one child
        // never shifts the keys of its later siblings.
        for (index, element) in blueprints.into_iter().enumerate() {
            if !element.is_enabled() {
                continue;
            }
            let mut key = element
                .key()
                .map(|key| RenderKey::Explicit(key.to_owned()))
                .unwrap_or(RenderKey::Index(index));
            if planned.iter().any(|(planned_key, _, _)| *planned_key == key) {
                log::warn!(
                    "duplicate child key {key} under {:?}; using its position",
                    node.chained_key()
                );
                key = RenderKey::Index(index);
            }
            let reused = match previous.shift_remove(&key) {
                Some(child) if child.element().same_variant(&element) => Some(child),
                Some(child) => {
                    removed.push(child);
                    None
                }
                None => None,
            };
            planned.push((key, element, reused));
        }
        removed.extend(previous.into_values());
        for child in removed {
            self.unmount(child).await;
        }

        let mut children = IndexMap::with_capacity(planned.len());
        let mut renders = Vec::with_capacity(planned.len());
        for (key, element, reused) in planned {
            let created = reused.is_none();
            let child = reused.unwrap_or_else(|| {
                ComponentNode::new(
                    element.clone(),
                    Some(node),
                    Some(key.clone()),
                    self.context.clone(),
                )
            });
            children.insert(key, child.clone());
            renders.push(self.render_node(child, element, created, cycle));
        }
        node.replace_children(children);
        join_all(renders).await;
        node.refresh_visible_children();
    }

    async fn replace_with_error(&self, node: &Rc<ComponentNode>, err: &anyhow::Error, cycle: u64) {
        for child in node.take_children().into_values() {
            self.unmount(child).await;
        }
        let message = if self.context.config().detailed_errors {
            format!("{err:#}")
        } else {
            String::from("something went wrong")
        };
        let element = Element::new(ErrorPlaceholder::new(message));
        let key = RenderKey::Explicit(ERROR_KEY.to_owned());
        let child = ComponentNode::new(
            element.clone(),
            Some(node),
            Some(key.clone()),
            self.context.clone(),
        );
        node.replace_children(IndexMap::from([(key, child.clone())]));
        self.render_node(child, element, true, cycle).await;
        node.refresh_visible_children();
    }

    /// before_unmount, children (post-order), unmounted.
    fn unmount(&self, node: Rc<ComponentNode>) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {
            let scope = node.scope();
            let component = node.component();
            node.set_can_notify(false);
            if let Err(err) = component.before_unmount(&scope).await {
                log::error!("before_unmount of {:?} failed: {err:#}", node.chained_key());
            }
            for child in node.take_children().into_values() {
                self.unmount(child).await;
            }
            if let Err(err) = component.unmounted(&scope).await {
                log::error!("unmounted of {:?} failed: {err:#}", node.chained_key());
            }
            node.set_mounted(false);
            node.store().clear();
        })
    }

    /// Fires `deactivated` over the active part of the subtree, children first.
    fn deactivate(&self, node: Rc<ComponentNode>) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {
            for child in node.children() {
                self.deactivate(child).await;
            }
            if node.set_active(false) {
                let scope = node.scope();
                if let Err(err) = node.component().deactivated(&scope).await {
                    log::error!("deactivated of {:?} failed: {err:#}", node.chained_key());
                }
            }
        })
    }
}

/// Mounted, visible nodes of `nodes` that have no ancestor in `nodes`.
pub fn topmost(nodes: &[Rc<ComponentNode>]) -> Vec<Rc<ComponentNode>> {
    let ids: HashSet<NodeId> = nodes.iter().map(|node| node.id()).collect();
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter(|node| node.is_mounted() && node.is_visible())
        .filter(|node| !node.ancestors().any(|ancestor| ids.contains(&ancestor.id())))
        .filter(|node| seen.insert(node.id()))
        .cloned()
        .collect()
}

/// Walks from `node` up to the first node that owns a message of `previous`.
fn force_target(node: &Rc<ComponentNode>, previous: &[MessageSpec]) -> Option<String> {
    std::iter::once(node.clone())
        .chain(node.ancestors())
        .find(|candidate| {
            previous
                .iter()
                .any(|message| message.key == candidate.chained_key())
        })
        .map(|candidate| candidate.chained_key().to_owned())
}

fn collect_messages(
    node: &Rc<ComponentNode>,
    inherited: &MessageFlags,
    config: &EngineConfig,
    out: &mut Vec<MessageSpec>,
) {
    let kind = node.kind();
    let flags = match kind.flags() {
        Some(own) => own.or(inherited),
        None => inherited.clone(),
    };
    if kind.is_screen() {
        out.push(node.render_message(&flags, config));
    }
    for child in node.visible_children() {
        collect_messages(&child, &flags, config, out);
    }
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
