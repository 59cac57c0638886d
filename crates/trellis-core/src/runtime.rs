//! Instances and the render scheduler.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use bitflags::bitflags;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use web_time::{Duration, Instant};

use crate::config::RuntimeConfig;
use crate::effects::PendingEffect;
use crate::error::{ErrorBoundary, LogBoundary, Phase, RuntimeError, panic_message};
use crate::hooks::Hooks;
use crate::render_api::RenderBackend;
use crate::slot::SlotStore;
use crate::state::DirtyQueue;
use crate::view::{ComponentNode, Descriptor, Element, ElementKind, RenderFn, Rendered};

new_key_type! {
    /// Identity of one live component instance.
    pub struct InstanceKey;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InstanceFlags: u8 {
        /// Rendered successfully at least once.
        const MOUNTED = 1 << 0;
        /// The latest render attempt failed; the previous output is shown.
        const FAILED = 1 << 1;
    }
}

type Path = SmallVec<[u32; 4]>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Position {
    Path(Path),
    Key(String),
}

/// How a parent tells its child instances apart between renders.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ChildId {
    position: Position,
    component: TypeId,
}

/// An instance's last output, with child instances in place of component calls.
#[derive(Debug, Default)]
enum Output {
    #[default]
    Empty,
    Text(String),
    Host {
        kind: ElementKind,
        children: Vec<Output>,
    },
    Child(InstanceKey),
}

struct Instance {
    name: &'static str,
    render: RenderFn,
    props: Rc<dyn Any>,
    slots: SlotStore,
    /// In output order.
    children: Vec<(ChildId, InstanceKey)>,
    output: Output,
    flags: InstanceFlags,
}

impl Instance {
    fn new(node: ComponentNode) -> Self {
        Self {
            name: node.name,
            render: node.render,
            props: node.props,
            slots: SlotStore::new(),
            children: Vec::new(),
            output: Output::Empty,
            flags: InstanceFlags::empty(),
        }
    }
}

/// Counters for one [`Runtime::tick`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub passes: usize,
    pub renders: usize,
    pub commits: usize,
    pub effects: usize,
    pub errors: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
struct Pass {
    rendered: HashSet<InstanceKey>,
    effects: Vec<PendingEffect>,
    renders: usize,
}

/// Reconciliation state while lowering one parent's output.
struct Lowering {
    previous: HashMap<ChildId, (usize, InstanceKey)>,
    next: Vec<(ChildId, InstanceKey)>,
}

/// Single-threaded render scheduler.
///
/// Setters mark instances dirty; nothing renders until [`Runtime::tick`],
/// so any number of updates between ticks costs one render per instance.
pub struct Runtime<B: RenderBackend> {
    instances: SlotMap<InstanceKey, Instance>,
    root: Option<InstanceKey>,
    queue: Rc<RefCell<DirtyQueue>>,
    backend: B,
    boundary: Box<dyn ErrorBoundary>,
    config: RuntimeConfig,
    committed: Option<Descriptor>,
    errors: usize,
}

impl<B: RenderBackend> Runtime<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RuntimeConfig::default())
    }

    pub fn with_config(backend: B, config: RuntimeConfig) -> Self {
        Self {
            instances: SlotMap::with_key(),
            root: None,
            queue: Rc::default(),
            backend,
            boundary: Box::new(LogBoundary),
            config,
            committed: None,
            errors: 0,
        }
    }

    /// Routes non-fatal errors to `boundary` instead of the log.
    pub fn with_error_boundary(mut self, boundary: impl ErrorBoundary + 'static) -> Self {
        self.boundary = Box::new(boundary);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn root(&self) -> Option<InstanceKey> {
        self.root
    }

    /// The last tree handed to the backend.
    pub fn committed(&self) -> Option<&Descriptor> {
        self.committed.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    pub fn is_queued(&self, key: InstanceKey) -> bool {
        self.queue.borrow().contains(key)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn contains(&self, key: InstanceKey) -> bool {
        self.instances.contains_key(key)
    }

    pub fn name_of(&self, key: InstanceKey) -> Option<&'static str> {
        self.instances.get(key).map(|i| i.name)
    }

    pub fn flags(&self, key: InstanceKey) -> Option<InstanceFlags> {
        self.instances.get(key).map(|i| i.flags)
    }

    /// Child instances of `key`, in output order.
    pub fn children_of(&self, key: InstanceKey) -> Vec<InstanceKey> {
        self.instances
            .get(key)
            .map(|i| i.children.iter().map(|(_, k)| *k).collect())
            .unwrap_or_default()
    }

    /// Installs `element` as the root of the tree, replacing any previous
    /// root. The root renders on the next tick.
    ///
    /// A non-component element is wrapped in an anonymous root component.
    pub fn mount(&mut self, element: Element) -> InstanceKey {
        if self.root.is_some() {
            self.unmount();
        }
        let node = match element {
            Element::Component(node) => node,
            other => crate::view::node(None, root, other),
        };
        let key = self.instances.insert(Instance::new(node));
        self.root = Some(key);
        self.queue.borrow_mut().enqueue(key);
        log::debug!("mounted {} as {key:?}", self.instances[key].name);
        key
    }

    /// Tears the whole tree down and commits an empty tree.
    pub fn unmount(&mut self) {
        if let Some(root) = self.root.take() {
            self.teardown(root);
        }
        if self
            .committed
            .as_ref()
            .is_some_and(|tree| *tree != Descriptor::Empty)
        {
            self.backend.commit(self.committed.as_ref(), &Descriptor::Empty);
            self.committed = Some(Descriptor::Empty);
        }
    }

    /// Re-renders dirty instances until none are left.
    ///
    /// Each pass renders every queued instance in tree pre-order (at most
    /// once each), commits the resolved tree if it changed, then runs the
    /// effects queued by those renders, also in pre-order. Effects that set
    /// state start another pass.
    pub fn tick(&mut self) -> Result<TickReport, RuntimeError> {
        let started = Instant::now();
        let errors_before = self.errors;
        let mut report = TickReport::default();

        while self.is_dirty() {
            if report.passes == self.config.max_passes {
                log::warn!(
                    "{} instance(s) still dirty after {} passes",
                    self.queue.borrow().len(),
                    report.passes
                );
                return Err(RuntimeError::RenderLoop {
                    limit: self.config.max_passes,
                });
            }
            report.passes += 1;
            self.run_pass(&mut report)?;
        }

        report.errors = self.errors - errors_before;
        report.elapsed = started.elapsed();
        if report.passes > 0 {
            log::debug!("tick: {report:?}");
        }
        Ok(report)
    }

    fn run_pass(&mut self, report: &mut TickReport) -> Result<(), RuntimeError> {
        let mut dirty = self.queue.borrow_mut().drain();
        let order = self.preorder();
        dirty.retain(|k| order.contains_key(k));
        dirty.sort_by_key(|k| order[k]);

        let mut pass = Pass::default();
        for (i, key) in dirty.iter().copied().enumerate() {
            if pass.rendered.contains(&key) || !self.instances.contains_key(key) {
                continue;
            }
            if let Err(err) = self.render(key, &mut pass) {
                // Abandon the pass; untouched instances stay queued.
                let mut queue = self.queue.borrow_mut();
                for rest in &dirty[i + 1..] {
                    if !pass.rendered.contains(rest) && self.instances.contains_key(*rest) {
                        queue.enqueue(*rest);
                    }
                }
                return Err(err);
            }
        }
        report.renders += pass.renders;

        if pass.renders > 0 {
            self.commit(report);
        }

        // Children created or moved during the pass change the order.
        let order = self.preorder();
        let mut effects = pass.effects;
        effects.retain(|e| order.contains_key(&e.instance));
        effects.sort_by_key(|e| order[&e.instance]);

        for effect in effects {
            let Some(name) = self.name_of(effect.instance) else {
                continue;
            };
            report.effects += 1;
            if let Some(cleanup) = effect.take_previous_cleanup()
                && let Err(payload) = catch_unwind(AssertUnwindSafe(|| cleanup.run()))
            {
                self.capture(RuntimeError::Panicked {
                    component: name,
                    phase: Phase::Cleanup,
                    message: panic_message(payload.as_ref()),
                });
            }
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| effect.run())) {
                self.capture(RuntimeError::Panicked {
                    component: name,
                    phase: Phase::Effect,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        Ok(())
    }

    /// Pre-order position of every instance reachable from the root.
    fn preorder(&self) -> HashMap<InstanceKey, usize> {
        let mut order = HashMap::with_capacity(self.instances.len());
        let mut stack: Vec<InstanceKey> = self.root.into_iter().collect();
        while let Some(key) = stack.pop() {
            let Some(instance) = self.instances.get(key) else {
                continue;
            };
            order.insert(key, order.len());
            stack.extend(instance.children.iter().rev().map(|(_, child)| *child));
        }
        order
    }

    fn commit(&mut self, report: &mut TickReport) {
        let next = self
            .root
            .map(|root| self.resolve_instance(root))
            .unwrap_or_default();
        if !self.config.commit_unchanged && self.committed.as_ref() == Some(&next) {
            log::trace!("tree unchanged; commit skipped");
            return;
        }
        self.backend.commit(self.committed.as_ref(), &next);
        self.committed = Some(next);
        report.commits += 1;
    }

    fn resolve_instance(&self, key: InstanceKey) -> Descriptor {
        self.instances
            .get(key)
            .map(|i| self.resolve(&i.output))
            .unwrap_or_default()
    }

    fn resolve(&self, output: &Output) -> Descriptor {
        match output {
            Output::Empty => Descriptor::Empty,
            Output::Text(text) => Descriptor::Text(text.clone()),
            Output::Host { kind, children } => Descriptor::Element {
                kind: kind.clone(),
                children: children.iter().map(|c| self.resolve(c)).collect(),
            },
            Output::Child(key) => self.resolve_instance(*key),
        }
    }

    fn capture(&mut self, error: RuntimeError) {
        self.errors += 1;
        self.boundary.capture(error);
    }

    /// One render of one instance, followed by its children.
    ///
    /// Only fatal errors are returned. Anything else is reported to the error
    /// boundary and the instance keeps its previous output.
    fn render(&mut self, key: InstanceKey, pass: &mut Pass) -> Result<(), RuntimeError> {
        pass.rendered.insert(key);
        let Some(instance) = self.instances.get_mut(key) else {
            return Ok(());
        };
        let name = instance.name;
        let render = instance.render.clone();
        let props = instance.props.clone();
        let mut slots = std::mem::take(&mut instance.slots);

        slots.begin_render();
        let (result, effects, violation) = {
            let mut hooks = Hooks::new(&mut slots, key, name, Rc::downgrade(&self.queue));
            let result = catch_unwind(AssertUnwindSafe(|| render(&mut hooks, props.as_ref())));
            let (effects, violation) = hooks.finish();
            (result, effects, violation)
        };

        let rendered = match (violation, result) {
            (Some(source), _) => Err(RuntimeError::HookOrder {
                component: name,
                source,
            }),
            (None, Ok(Ok(element))) => slots
                .end_render()
                .map(|()| element)
                .map_err(|source| RuntimeError::HookOrder {
                    component: name,
                    source,
                }),
            (None, Ok(Err(source))) => Err(RuntimeError::Component {
                component: name,
                source,
            }),
            (None, Err(payload)) => Err(RuntimeError::Panicked {
                component: name,
                phase: Phase::Render,
                message: panic_message(payload.as_ref()),
            }),
        };
        if rendered.is_err() {
            slots.abort_render();
        }

        let Some(instance) = self.instances.get_mut(key) else {
            return Ok(());
        };
        instance.slots = slots;

        match rendered {
            Ok(element) => {
                instance.flags.insert(InstanceFlags::MOUNTED);
                instance.flags.remove(InstanceFlags::FAILED);
                pass.renders += 1;
                pass.effects.extend(effects);
                log::trace!("rendered {name} {key:?}");
                self.reconcile(key, element, pass)
            }
            Err(err) => {
                instance.flags.insert(InstanceFlags::FAILED);
                if err.is_fatal() {
                    log::error!("{err}");
                    return Err(err);
                }
                self.capture(err);
                Ok(())
            }
        }
    }

    /// Replaces `parent`'s output, matching component calls against its
    /// previous children, then renders the surviving and new children.
    fn reconcile(
        &mut self,
        parent: InstanceKey,
        element: Element,
        pass: &mut Pass,
    ) -> Result<(), RuntimeError> {
        let Some(instance) = self.instances.get_mut(parent) else {
            return Ok(());
        };
        let mut lowering = Lowering {
            previous: std::mem::take(&mut instance.children)
                .into_iter()
                .enumerate()
                .map(|(order, (id, key))| (id, (order, key)))
                .collect(),
            next: Vec::new(),
        };

        let mut path = Path::new();
        let output = self.lower(element, &mut path, &mut lowering);

        let mut stale: Vec<(usize, InstanceKey)> = lowering.previous.into_values().collect();
        stale.sort_by_key(|(order, _)| *order);
        for (_, key) in stale {
            self.teardown(key);
        }

        let render_order: Vec<InstanceKey> = lowering.next.iter().map(|(_, k)| *k).collect();
        if let Some(instance) = self.instances.get_mut(parent) {
            instance.output = output;
            instance.children = lowering.next;
        }

        for child in render_order {
            self.render(child, pass)?;
        }
        Ok(())
    }

    fn lower(&mut self, element: Element, path: &mut Path, lowering: &mut Lowering) -> Output {
        match element {
            Element::Empty => Output::Empty,
            Element::Text(text) => Output::Text(text),
            Element::Host { kind, children } => {
                let mut lowered = Vec::with_capacity(children.len());
                for (i, child) in children.into_iter().enumerate() {
                    path.push(i as u32);
                    lowered.push(self.lower(child, path, lowering));
                    path.pop();
                }
                Output::Host {
                    kind,
                    children: lowered,
                }
            }
            Element::Component(node) => {
                let mut id = ChildId {
                    position: match &node.key {
                        Some(k) => Position::Key(k.clone()),
                        None => Position::Path(path.clone()),
                    },
                    component: node.type_id,
                };
                if lowering.next.iter().any(|(taken, _)| *taken == id) {
                    log::warn!(
                        "duplicate key {:?} for {}; matching by position instead",
                        node.key,
                        node.name
                    );
                    id.position = Position::Path(path.clone());
                }

                let reused = lowering
                    .previous
                    .remove(&id)
                    .map(|(_, key)| key)
                    .filter(|key| self.instances.contains_key(*key));
                let key = match reused {
                    Some(key) => {
                        let instance = &mut self.instances[key];
                        instance.name = node.name;
                        instance.render = node.render;
                        instance.props = node.props;
                        key
                    }
                    None => {
                        let key = self.instances.insert(Instance::new(node));
                        log::trace!("created {} {key:?}", self.instances[key].name);
                        key
                    }
                };
                lowering.next.push((id, key));
                Output::Child(key)
            }
        }
    }

    /// Removes an instance and its subtree, children first, running each
    /// instance's effect cleanups in slot order.
    fn teardown(&mut self, key: InstanceKey) {
        let Some(mut instance) = self.instances.remove(key) else {
            return;
        };
        for (_, child) in std::mem::take(&mut instance.children) {
            self.teardown(child);
        }

        // Dropping the slots first leaves setters captured by cleanups dead.
        let cleanups = instance.slots.take_cleanups();
        drop(std::mem::take(&mut instance.slots));

        for cleanup in cleanups {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| cleanup.run())) {
                self.capture(RuntimeError::Panicked {
                    component: instance.name,
                    phase: Phase::Cleanup,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
        self.queue.borrow_mut().remove(key);
        log::trace!("tore down {} {key:?}", instance.name);
    }
}

impl<B: RenderBackend> Drop for Runtime<B> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.teardown(root);
        }
    }
}

impl<B: RenderBackend> std::fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("root", &self.root)
            .field("instances", &self.instances.len())
            .field("dirty", &self.queue.borrow().len())
            .field("config", &self.config)
            .finish()
    }
}

// Root component for mounted elements that are not component calls.
fn root(_: &mut Hooks<'_>, element: &Element) -> Rendered {
    Ok(element.clone())
}
