//! Per-node dependency graph over named value slots.
//!
//! Every [`ComponentNode`](crate::ComponentNode) owns one [`ReactiveStore`]. Reads made while
//! an expression is evaluating are recorded as that expression's dependencies; a write that
//! changes a slot re-evaluates every dependent expression and either assigns the result to
//! the expression's target slot (computed values) or hands it to a watcher callback.
//!
//! One write is propagated as a single pass: every expression reachable from the written slot
//! is evaluated once, expressions over plain slots before expressions over computed slots.
//!
//! The recording stack lives inside the store, so subtrees rendering concurrently never share
//! a recording context.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use indexmap::IndexSet;

use crate::hash::HashMap;
use crate::error::ReactiveError;
use crate::value::{DynValue, Value};

pub type WatchId = u64;

/// Name of a slot. Props and state live in separate namespaces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKey {
    State(String),
    Prop(String),
}

impl SlotKey {
    pub fn state(name: impl Into<String>) -> Self {
        SlotKey::State(name.into())
    }

    pub fn prop(name: impl Into<String>) -> Self {
        SlotKey::Prop(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            SlotKey::State(name) | SlotKey::Prop(name) => name,
        }
    }

    pub fn is_prop(&self) -> bool {
        matches!(self, SlotKey::Prop(_))
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::State(name) => f.write_str(name),
            SlotKey::Prop(name) => write!(f, "${name}"),
        }
    }
}

type ReadFn = Rc<dyn Fn(&ReactiveStore) -> Result<Value, ReactiveError>>;
type SyncCallback = Rc<dyn Fn(&Value, Option<&Value>) -> anyhow::Result<()>>;
type AsyncCallback = Rc<dyn Fn(Value, Option<Value>) -> LocalBoxFuture<'static, anyhow::Result<()>>>;
type WriteHook = Rc<dyn Fn(&SlotKey)>;
type TaskSink = Rc<dyn Fn(LocalBoxFuture<'static, ()>)>;

#[derive(Clone)]
enum Reaction {
    Assign(SlotKey),
    Callback(SyncCallback),
    AsyncCallback(AsyncCallback),
}

struct WatchedExpression {
    read: ReadFn,
    deps: IndexSet<SlotKey>,
    value: Value,
    reaction: Reaction,
    /// 0 over plain slots, otherwise one above the deepest computed slot read.
    level: u32,
}

struct Slot {
    current: Value,
    previous: Option<Value>,
    is_new: bool,
    computed: Option<WatchId>,
    dependents: IndexSet<WatchId>,
}

impl Slot {
    fn new(value: Value) -> Self {
        Self {
            current: value,
            previous: None,
            is_new: true,
            computed: None,
            dependents: IndexSet::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteOrigin {
    User,
    Computed(WatchId),
}

#[derive(Default)]
pub struct ReactiveStore {
    slots: RefCell<HashMap<SlotKey, Slot>>,
    expressions: RefCell<HashMap<WatchId, WatchedExpression>>,
    recording: RefCell<Vec<IndexSet<SlotKey>>>,
    next_watch_id: Cell<WatchId>,
    write_hook: RefCell<Option<WriteHook>>,
    task_sink: RefCell<Option<TaskSink>>,
    pending_tasks: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    scheduled: RefCell<BTreeSet<(u32, WatchId)>>,
    propagating: Cell<bool>,
}

impl ReactiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the hook invoked after a state (non-prop) slot changes.
    pub fn set_write_hook(&self, hook: impl Fn(&SlotKey) + 'static) {
        *self.write_hook.borrow_mut() = Some(Rc::new(hook));
    }

    /// Routes asynchronous watcher callbacks to an executor instead of the local pending list.
    pub fn set_task_sink(&self, sink: impl Fn(LocalBoxFuture<'static, ()>) + 'static) {
        *self.task_sink.borrow_mut() = Some(Rc::new(sink));
    }

    /// Returns the current value of `key`, recording it as a dependency when an
    /// expression is being evaluated.
    pub fn read(&self, key: &SlotKey) -> Result<Value, ReactiveError> {
        self.record(key);
        self.peek(key)
            .ok_or_else(|| ReactiveError::MissingSlot { key: key.clone() })
    }

    /// Untracked read.
    pub fn peek(&self, key: &SlotKey) -> Option<Value> {
        self.slots
            .borrow()
            .get(key)
            .map(|slot| slot.current.clone())
    }

    pub fn contains(&self, key: &SlotKey) -> bool {
        self.slots.borrow().contains_key(key)
    }

    pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<T, ReactiveError> {
        self.read_typed(&SlotKey::state(name))
    }

    pub fn prop<T: Clone + 'static>(&self, name: &str) -> Result<T, ReactiveError> {
        self.read_typed(&SlotKey::prop(name))
    }

    fn read_typed<T: Clone + 'static>(&self, key: &SlotKey) -> Result<T, ReactiveError> {
        let value = self.read(key)?;
        value.get::<T>().ok_or_else(|| ReactiveError::TypeMismatch {
            key: key.clone(),
            expected: std::any::type_name::<T>(),
            found: value.type_name(),
        })
    }

    /// Runs `f` with dependency recording suspended.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let saved = std::mem::take(&mut *self.recording.borrow_mut());
        let result = f();
        *self.recording.borrow_mut() = saved;
        result
    }

    pub fn set<T: DynValue + PartialEq + fmt::Debug>(&self, name: &str, value: T) -> bool {
        self.write(SlotKey::state(name), Value::new(value))
    }

    pub fn set_prop(&self, name: &str, value: Value) -> bool {
        self.write(SlotKey::prop(name), value)
    }

    /// Writes `value` into `key`. Returns whether the slot changed.
    ///
    /// A write of an equal value is a no-op. A plain write to a slot bound by
    /// [`computed`](Self::computed) detaches the computed expression.
    pub fn write(&self, key: SlotKey, value: Value) -> bool {
        self.write_internal(key, value, WriteOrigin::User)
    }

    fn write_internal(&self, key: SlotKey, value: Value, origin: WriteOrigin) -> bool {
        let mut detached = None;
        let (changed, dependents) = {
            let mut slots = self.slots.borrow_mut();
            match slots.get_mut(&key) {
                Some(slot) => {
                    match origin {
                        WriteOrigin::User => detached = slot.computed.take(),
                        WriteOrigin::Computed(id) => {
                            detached = slot.computed.replace(id).filter(|previous| *previous != id);
                        }
                    }
                    if slot.current == value {
                        (false, Vec::new())
                    } else {
                        slot.current = value;
                        (true, slot.dependents.iter().copied().collect::<Vec<_>>())
                    }
                }
                None => {
                    let mut slot = Slot::new(value);
                    if let WriteOrigin::Computed(id) = origin {
                        slot.computed = Some(id);
                    }
                    slots.insert(key.clone(), slot);
                    (true, Vec::new())
                }
            }
        };

        if let Some(id) = detached {
            self.remove_expression(id);
        }
        if !changed {
            return false;
        }
        if !key.is_prop() {
            let hook = self.write_hook.borrow().clone();
            if let Some(hook) = hook {
                hook(&key);
            }
        }
        self.schedule(&dependents);
        self.propagate();
        true
    }

    /// Binds `target` to the result of `expr`, recomputed whenever a dependency changes.
    pub fn computed<T, F>(&self, target: &str, expr: F) -> Result<WatchId, ReactiveError>
    where
        T: DynValue + PartialEq + fmt::Debug,
        F: Fn(&ReactiveStore) -> Result<T, ReactiveError> + 'static,
    {
        let target = SlotKey::state(target);
        let (id, value) = self
            .register_expression(wrap_read(expr), Reaction::Assign(target.clone()))
            .map_err(|err| {
                log::error!("failed to create computed value {target}: {err}");
                err
            })?;
        self.write_internal(target, value, WriteOrigin::Computed(id));
        Ok(id)
    }

    /// Calls `callback(new, old)` whenever the result of `expr` is recomputed.
    /// With `immediate`, the callback also fires once with `(initial, None)`.
    pub fn watch<T, F, C>(&self, expr: F, callback: C, immediate: bool) -> Result<WatchId, ReactiveError>
    where
        T: DynValue + PartialEq + fmt::Debug + Clone,
        F: Fn(&ReactiveStore) -> Result<T, ReactiveError> + 'static,
        C: Fn(&T, Option<&T>) -> anyhow::Result<()> + 'static,
    {
        let callback: SyncCallback = Rc::new(move |new: &Value, old: Option<&Value>| {
            let new = new
                .downcast_ref::<T>()
                .ok_or_else(|| anyhow::anyhow!("watched value has unexpected type"))?;
            callback(new, old.and_then(|old| old.downcast_ref::<T>()))
        });
        let (id, value) = self
            .register_expression(wrap_read(expr), Reaction::Callback(callback.clone()))
            .map_err(|err| {
                log::error!("failed to create watcher: {err}");
                err
            })?;
        if immediate {
            if let Err(err) = callback(&value, None) {
                log::error!("watcher callback failed: {err:#}");
            }
        }
        Ok(id)
    }

    /// Like [`watch`](Self::watch) with an asynchronous callback. The callback runs on the
    /// task sink and never blocks the write that triggered it.
    pub fn watch_async<T, F, C, Fut>(
        &self,
        expr: F,
        callback: C,
        immediate: bool,
    ) -> Result<WatchId, ReactiveError>
    where
        T: DynValue + PartialEq + fmt::Debug + Clone,
        F: Fn(&ReactiveStore) -> Result<T, ReactiveError> + 'static,
        C: Fn(T, Option<T>) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let callback: AsyncCallback = Rc::new(move |new: Value, old: Option<Value>| {
            let typed = new
                .get::<T>()
                .map(|new| callback(new, old.and_then(|old| old.get::<T>())));
            Box::pin(async move {
                match typed {
                    Some(fut) => fut.await,
                    None => Err(anyhow::anyhow!("watched value has unexpected type")),
                }
            })
        });
        let (id, value) = self
            .register_expression(wrap_read(expr), Reaction::AsyncCallback(callback.clone()))
            .map_err(|err| {
                log::error!("failed to create watcher: {err}");
                err
            })?;
        if immediate {
            self.spawn_callback(&callback, value, None);
        }
        Ok(id)
    }

    pub fn unwatch(&self, id: WatchId) -> bool {
        self.remove_expression(id)
    }

    /// Compares every state slot with its value at the previous snapshot and takes a new
    /// snapshot. Slots never snapshotted before count as changed; props are ignored.
    pub fn snapshot_and_detect_change(&self) -> bool {
        let mut changed = false;
        for (_, slot) in self.slots.borrow_mut().iter_mut().filter(|(key, _)| !key.is_prop()) {
            if slot.is_new || slot.previous.as_ref() != Some(&slot.current) {
                slot.previous = Some(slot.current.clone());
                slot.is_new = false;
                changed = true;
            }
        }
        changed
    }

    /// Dependencies recorded by the last evaluation of expression `id`.
    pub fn dependencies(&self, id: WatchId) -> Vec<SlotKey> {
        self.expressions
            .borrow()
            .get(&id)
            .map(|expr| expr.deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Expressions currently depending on `key`.
    pub fn dependents(&self, key: &SlotKey) -> Vec<WatchId> {
        self.slots
            .borrow()
            .get(key)
            .map(|slot| slot.dependents.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn take_pending_tasks(&self) -> Vec<LocalBoxFuture<'static, ()>> {
        std::mem::take(&mut *self.pending_tasks.borrow_mut())
    }

    /// Drops all slots and expressions. Used when the owning node is destroyed.
    pub fn clear(&self) {
        let expressions = std::mem::take(&mut *self.expressions.borrow_mut());
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        self.write_hook.borrow_mut().take();
        self.scheduled.borrow_mut().clear();
        drop(expressions);
        drop(slots);
    }

    fn record(&self, key: &SlotKey) {
        if let Some(frame) = self.recording.borrow_mut().last_mut() {
            frame.insert(key.clone());
        }
    }

    fn evaluate(&self, read: &ReadFn) -> Result<(Value, IndexSet<SlotKey>), ReactiveError> {
        self.recording.borrow_mut().push(IndexSet::new());
        let result = read(self);
        let deps = self.recording.borrow_mut().pop().unwrap_or_default();
        result.map(|value| (value, deps))
    }

    fn register_expression(
        &self,
        read: ReadFn,
        reaction: Reaction,
    ) -> Result<(WatchId, Value), ReactiveError> {
        let (value, deps) = self.evaluate(&read)?;
        let level = self.level_of(&deps);
        let id = self.next_watch_id.get() + 1;
        self.next_watch_id.set(id);
        self.bind_dependencies(id, &deps);
        self.expressions.borrow_mut().insert(
            id,
            WatchedExpression {
                read,
                deps,
                value: value.clone(),
                reaction,
                level,
            },
        );
        Ok((id, value))
    }

    fn remove_expression(&self, id: WatchId) -> bool {
        let removed = self.expressions.borrow_mut().remove(&id);
        match removed {
            Some(expr) => {
                self.unbind_dependencies(id, &expr.deps);
                true
            }
            None => false,
        }
    }

    fn bind_dependencies(&self, id: WatchId, deps: &IndexSet<SlotKey>) {
        let mut slots = self.slots.borrow_mut();
        for key in deps {
            if let Some(slot) = slots.get_mut(key) {
                slot.dependents.insert(id);
            }
        }
    }

    fn unbind_dependencies(&self, id: WatchId, deps: &IndexSet<SlotKey>) {
        let mut slots = self.slots.borrow_mut();
        for key in deps {
            if let Some(slot) = slots.get_mut(key) {
                slot.dependents.shift_remove(&id);
            }
        }
    }

    fn level_of(&self, deps: &IndexSet<SlotKey>) -> u32 {
        let slots = self.slots.borrow();
        let expressions = self.expressions.borrow();
        deps.iter()
            .filter_map(|key| slots.get(key)?.computed)
            .filter_map(|id| expressions.get(&id).map(|expr| expr.level + 1))
            .max()
            .unwrap_or(0)
    }

    fn schedule(&self, ids: &[WatchId]) {
        let expressions = self.expressions.borrow();
        let mut scheduled = self.scheduled.borrow_mut();
        for id in ids {
            if let Some(expr) = expressions.get(id) {
                scheduled.insert((expr.level, *id));
            }
        }
    }

    /// Drains the scheduled set, lowest level first. Writes made while draining only
    /// schedule their dependents, so an expression reached along two paths runs once.
    fn propagate(&self) {
        if self.propagating.replace(true) {
            return;
        }
        loop {
            let next = self.scheduled.borrow_mut().pop_first();
            let Some((_, id)) = next else {
                break;
            };
            self.reevaluate(id);
        }
        self.propagating.set(false);
    }

    fn reevaluate(&self, id: WatchId) {
        let read = match self.expressions.borrow().get(&id) {
            Some(expr) => expr.read.clone(),
            None => return,
        };
        let (value, deps) = match self.evaluate(&read) {
            Ok(result) => result,
            Err(err) => {
                log::error!("watched expression {id} failed: {err}");
                return;
            }
        };
        let level = self.level_of(&deps);
        let (old_deps, old_value, reaction) = {
            let mut expressions = self.expressions.borrow_mut();
            let Some(expr) = expressions.get_mut(&id) else {
                return;
            };
            expr.level = level;
            let old_deps = std::mem::replace(&mut expr.deps, deps.clone());
            let old_value = std::mem::replace(&mut expr.value, value.clone());
            (old_deps, old_value, expr.reaction.clone())
        };
        self.unbind_dependencies(id, &old_deps);
        self.bind_dependencies(id, &deps);

        match reaction {
            Reaction::Assign(target) => {
                self.write_internal(target, value, WriteOrigin::Computed(id));
            }
            Reaction::Callback(callback) => {
                if let Err(err) = callback(&value, Some(&old_value)) {
                    log::error!("watcher callback failed: {err:#}");
                }
            }
            Reaction::AsyncCallback(callback) => {
                self.spawn_callback(&callback, value, Some(old_value));
            }
        }
    }

    fn spawn_callback(&self, callback: &AsyncCallback, new: Value, old: Option<Value>) {
        let fut = callback(new, old);
        let task: LocalBoxFuture<'static, ()> = Box::pin(async move {
            if let Err(err) = fut.await {
                log::error!("async watcher callback failed: {err:#}");
            }
        });
        let sink = self.task_sink.borrow().clone();
        match sink {
            Some(sink) => sink(task),
            None => self.pending_tasks.borrow_mut().push(task),
        }
    }
}

impl fmt::Debug for ReactiveStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.borrow();
        let mut keys: Vec<_> = slots.keys().collect();
        keys.sort();
        f.debug_struct("ReactiveStore")
            .field("slots", &keys)
            .field("expressions", &self.expressions.borrow().len())
            .finish()
    }
}

fn wrap_read<T, F>(expr: F) -> ReadFn
where
    T: DynValue + PartialEq + fmt::Debug,
    F: Fn(&ReactiveStore) -> Result<T, ReactiveError> + 'static,
{
    Rc::new(move |store: &ReactiveStore| expr(store).map(Value::new))
}

#[cfg(test)]
#[path = "tests/reactive_tests.rs"]
mod tests;
