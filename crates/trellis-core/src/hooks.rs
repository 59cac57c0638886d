//! The render context handed to component bodies.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::effects::{Dispose, EffectRecord, PendingEffect};
use crate::runtime::InstanceKey;
use crate::slot::{HookOrderError, Slot, SlotEntry, SlotKind, SlotStore};
use crate::state::{DirtyQueue, Setter, StateCell};

struct MemoRecord<D, T> {
    deps: D,
    value: T,
}

/// Hook access for one render of one instance.
///
/// Hooks read and write the instance's [`SlotStore`] through this context;
/// there is no ambient "current component". Each render gets a fresh
/// `Hooks`, and the values it hands out are snapshots for that render:
/// closures created during a render keep seeing that render's values even
/// after a setter has changed the state.
pub struct Hooks<'a> {
    store: &'a mut SlotStore,
    instance: InstanceKey,
    component: &'static str,
    queue: Weak<RefCell<DirtyQueue>>,
    effects: Vec<PendingEffect>,
    violation: Option<HookOrderError>,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(
        store: &'a mut SlotStore,
        instance: InstanceKey,
        component: &'static str,
        queue: Weak<RefCell<DirtyQueue>>,
    ) -> Self {
        Self {
            store,
            instance,
            component,
            queue,
            effects: Vec::new(),
            violation: None,
        }
    }

    pub fn instance(&self) -> InstanceKey {
        self.instance
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Hands back the effects queued by this render and the first hook order
    /// violation seen, if any.
    pub(crate) fn finish(self) -> (Vec<PendingEffect>, Option<HookOrderError>) {
        (self.effects, self.violation)
    }

    // Keeps the first violation; the render is thrown away either way.
    fn latch(&mut self, err: HookOrderError) {
        log::trace!("{}: {err}", self.component);
        self.violation.get_or_insert(err);
    }

    /// State slot initialised with `initial` on the first render.
    pub fn state<T>(&mut self, initial: T) -> (T, Setter<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        self.state_with(|| initial)
    }

    /// Like [`Hooks::state`], computing the initial value only on the first render.
    pub fn state_with<T>(&mut self, init: impl FnOnce() -> T) -> (T, Setter<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        let index = self.store.cursor();
        let cell = match self.store.next_slot(SlotKind::State) {
            Ok(SlotEntry::Vacant(vacant)) => {
                let cell = Rc::new(StateCell::new(init()));
                vacant.insert(Slot::State(cell.clone()));
                cell
            }
            Ok(SlotEntry::Occupied(slot)) => match state_cell::<T>(slot) {
                Some(cell) => cell,
                None => {
                    self.latch(HookOrderError::TypeChanged { index });
                    return (init(), Setter::detached());
                }
            },
            Err(err) => {
                self.latch(err);
                return (init(), Setter::detached());
            }
        };
        let setter = Setter::new(&cell, self.instance, self.queue.clone());
        (cell.get(), setter)
    }

    /// Runs `f` after every render, cleaning up the previous run first.
    pub fn effect(&mut self, f: impl FnOnce() -> Dispose + 'static) {
        self.queue_effect::<()>(None, f);
    }

    /// Runs `f` once, after the first render. Its cleanup runs on teardown.
    pub fn effect_once(&mut self, f: impl FnOnce() -> Dispose + 'static) {
        self.effect_with((), f);
    }

    /// Runs `f` after the first render and after every render where `deps`
    /// differs from the value it last ran with.
    pub fn effect_with<D>(&mut self, deps: D, f: impl FnOnce() -> Dispose + 'static)
    where
        D: PartialEq + 'static,
    {
        self.queue_effect(Some(deps), f);
    }

    fn queue_effect<D>(&mut self, deps: Option<D>, body: impl FnOnce() -> Dispose + 'static)
    where
        D: PartialEq + 'static,
    {
        let index = self.store.cursor();
        let record = match self.store.next_slot(SlotKind::Effect) {
            Ok(SlotEntry::Vacant(vacant)) => {
                let record = Rc::new(RefCell::new(EffectRecord::default()));
                vacant.insert(Slot::Effect(record.clone()));
                record
            }
            Ok(SlotEntry::Occupied(Slot::Effect(record))) => record.clone(),
            Ok(SlotEntry::Occupied(_)) => {
                self.latch(HookOrderError::TypeChanged { index });
                return;
            }
            Err(err) => {
                self.latch(err);
                return;
            }
        };

        if !record.borrow().should_run(deps.as_ref()) {
            return;
        }
        self.effects.push(PendingEffect {
            instance: self.instance,
            record,
            deps: deps.map(|d| Box::new(d) as Box<dyn Any>),
            body: Box::new(body),
        });
    }

    /// Mutable cell that lives as long as the instance. Writing to it does
    /// not schedule a render.
    pub fn reference<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        let index = self.store.cursor();
        match self.store.next_slot(SlotKind::Ref) {
            Ok(SlotEntry::Vacant(vacant)) => {
                let cell = Rc::new(RefCell::new(init()));
                vacant.insert(Slot::Ref(cell.clone()));
                cell
            }
            Ok(SlotEntry::Occupied(Slot::Ref(any))) => {
                match any.clone().downcast::<RefCell<T>>() {
                    Ok(cell) => cell,
                    Err(_) => {
                        self.latch(HookOrderError::TypeChanged { index });
                        Rc::new(RefCell::new(init()))
                    }
                }
            }
            Ok(SlotEntry::Occupied(_)) => {
                self.latch(HookOrderError::TypeChanged { index });
                Rc::new(RefCell::new(init()))
            }
            Err(err) => {
                self.latch(err);
                Rc::new(RefCell::new(init()))
            }
        }
    }

    /// Value of `compute(&deps)`, recomputed only when `deps` changes.
    ///
    /// As with [`Hooks::effect_with`], deps of a different type than last
    /// render count as changed; the cached record is replaced.
    pub fn memo<D, T>(&mut self, deps: D, compute: impl FnOnce(&D) -> T) -> T
    where
        D: PartialEq + 'static,
        T: Clone + 'static,
    {
        let index = self.store.cursor();
        match self.store.next_slot(SlotKind::Memo) {
            Ok(SlotEntry::Vacant(vacant)) => {
                let value = compute(&deps);
                vacant.insert(Slot::Memo(Box::new(MemoRecord {
                    deps,
                    value: value.clone(),
                })));
                value
            }
            Ok(SlotEntry::Occupied(Slot::Memo(any))) => {
                match any.downcast_mut::<MemoRecord<D, T>>() {
                    Some(record) => {
                        if record.deps != deps {
                            record.value = compute(&deps);
                            record.deps = deps;
                        }
                        record.value.clone()
                    }
                    None => {
                        log::trace!("{}: memo #{index} changed type", self.component);
                        let value = compute(&deps);
                        *any = Box::new(MemoRecord {
                            deps,
                            value: value.clone(),
                        });
                        value
                    }
                }
            }
            Ok(SlotEntry::Occupied(_)) => {
                self.latch(HookOrderError::TypeChanged { index });
                compute(&deps)
            }
            Err(err) => {
                self.latch(err);
                compute(&deps)
            }
        }
    }
}

fn state_cell<T: 'static>(slot: &Slot) -> Option<Rc<StateCell<T>>> {
    match slot {
        Slot::State(any) => any.clone().downcast::<StateCell<T>>().ok(),
        _ => None,
    }
}
