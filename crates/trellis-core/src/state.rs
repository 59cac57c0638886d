use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::runtime::InstanceKey;

/// Storage behind a state slot. Only the slot holds it strongly.
pub(crate) struct StateCell<T> {
    value: RefCell<T>,
}

impl<T> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }
}

/// Instances waiting for a re-render, in the order they were first marked.
#[derive(Debug, Default)]
pub(crate) struct DirtyQueue {
    order: Vec<InstanceKey>,
    queued: HashSet<InstanceKey>,
}

impl DirtyQueue {
    /// Returns `false` if the instance was already queued.
    pub fn enqueue(&mut self, key: InstanceKey) -> bool {
        if self.queued.insert(key) {
            self.order.push(key);
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, key: InstanceKey) {
        if self.queued.remove(&key) {
            self.order.retain(|k| *k != key);
        }
    }

    pub fn drain(&mut self) -> Vec<InstanceKey> {
        self.queued.clear();
        std::mem::take(&mut self.order)
    }

    pub fn contains(&self, key: InstanceKey) -> bool {
        self.queued.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// Write handle for one state slot.
///
/// Setters hold only weak references: once the owning instance is torn down,
/// every call is silently ignored, so late asynchronous completions are safe.
pub struct Setter<T> {
    cell: Weak<StateCell<T>>,
    instance: InstanceKey,
    queue: Weak<RefCell<DirtyQueue>>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            instance: self.instance,
            queue: self.queue.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("instance", &self.instance)
            .field("live", &self.is_live())
            .finish()
    }
}

impl<T> Setter<T> {
    pub(crate) fn new(
        cell: &Rc<StateCell<T>>,
        instance: InstanceKey,
        queue: Weak<RefCell<DirtyQueue>>,
    ) -> Self {
        Self {
            cell: Rc::downgrade(cell),
            instance,
            queue,
        }
    }

    /// A setter bound to nothing; every call is a no-op.
    pub(crate) fn detached() -> Self {
        Self {
            cell: Weak::new(),
            instance: InstanceKey::default(),
            queue: Weak::new(),
        }
    }

    /// Whether the owning instance (and so this slot) still exists.
    pub fn is_live(&self) -> bool {
        self.cell.strong_count() > 0
    }

    pub fn instance(&self) -> InstanceKey {
        self.instance
    }
}

impl<T: PartialEq + 'static> Setter<T> {
    /// Stores `value` and schedules a re-render, unless it equals the current
    /// value. Returns whether the state changed.
    pub fn set(&self, value: T) -> bool {
        self.store(value)
    }

    /// Computes the next value from the current one.
    ///
    /// Unlike [`Setter::set`] with a value captured at render time, successive
    /// updaters in the same tick each see the previous updater's result. `f`
    /// gets a copy of the current value, so it may use this setter itself.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool
    where
        T: Clone,
    {
        let Some(cell) = self.cell.upgrade() else {
            log::trace!("stale update for {:?} ignored", self.instance);
            return false;
        };
        let current = cell.get();
        self.store(f(&current))
    }

    fn store(&self, next: T) -> bool {
        let Some(cell) = self.cell.upgrade() else {
            log::trace!("stale update for {:?} ignored", self.instance);
            return false;
        };
        if *cell.value.borrow() == next {
            return false;
        }
        *cell.value.borrow_mut() = next;

        if let Some(queue) = self.queue.upgrade()
            && queue.borrow_mut().enqueue(self.instance)
        {
            log::trace!("{:?} marked dirty", self.instance);
        }
        true
    }
}
