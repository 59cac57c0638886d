//! Per-instance hook storage.
//!
//! Every hook call claims the next slot of its instance's [`SlotStore`]. Slots
//! have no names: the Nth hook call of a render always refers to the Nth slot,
//! so the number, order and kind of hook calls must not change between renders
//! of the same instance.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::effects::{Dispose, EffectRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    State,
    Effect,
    Ref,
    Memo,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotKind::State => "state",
            SlotKind::Effect => "effect",
            SlotKind::Ref => "reference",
            SlotKind::Memo => "memo",
        })
    }
}

/// One hook's persistent storage cell.
pub enum Slot {
    /// `Rc<StateCell<T>>`, shared weakly with the slot's setters.
    State(Rc<dyn Any>),
    Effect(Rc<RefCell<EffectRecord>>),
    /// `Rc<RefCell<T>>` handed out as-is by `Hooks::reference`.
    Ref(Rc<dyn Any>),
    Memo(Box<dyn Any>),
}

impl Slot {
    pub fn kind(&self) -> SlotKind {
        match self {
            Slot::State(_) => SlotKind::State,
            Slot::Effect(_) => SlotKind::Effect,
            Slot::Ref(_) => SlotKind::Ref,
            Slot::Memo(_) => SlotKind::Memo,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot::{}", self.kind())
    }
}

/// Hook calls did not line up with the previous render of the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookOrderError {
    #[error("hook #{index} was a {expected} hook on the previous render but is now a {found} hook")]
    KindChanged {
        index: usize,
        expected: SlotKind,
        found: SlotKind,
    },
    #[error("hook #{index} changed its value type between renders")]
    TypeChanged { index: usize },
    #[error("render called more hooks than the {expected} used by the previous render")]
    TooMany { expected: usize },
    #[error("render called {found} hooks but the previous render used {expected}")]
    CountChanged { expected: usize, found: usize },
    #[error("hook called outside of a render")]
    NotRendering,
}

/// Ordered hook storage owned by one component instance.
#[derive(Debug, Default)]
pub struct SlotStore {
    slots: Vec<Slot>,
    cursor: usize,
    /// Slot count of the last completed render; `None` until the first one ends.
    committed: Option<usize>,
    rendering: bool,
}

/// Result of [`SlotStore::next_slot`], in the style of `HashMap::entry`.
#[derive(Debug)]
pub enum SlotEntry<'a> {
    Occupied(&'a mut Slot),
    Vacant(VacantSlot<'a>),
}

#[derive(Debug)]
pub struct VacantSlot<'a> {
    slots: &'a mut Vec<Slot>,
}

impl<'a> VacantSlot<'a> {
    pub fn insert(self, slot: Slot) -> &'a mut Slot {
        self.slots.push(slot);
        let index = self.slots.len() - 1;
        &mut self.slots[index]
    }
}

impl<'a> SlotEntry<'a> {
    pub fn or_insert_with(self, init: impl FnOnce() -> Slot) -> &'a mut Slot {
        match self {
            SlotEntry::Occupied(slot) => slot,
            SlotEntry::Vacant(vacant) => vacant.insert(init()),
        }
    }
}

impl SlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewinds the cursor and marks the store as the active render target.
    pub fn begin_render(&mut self) {
        self.cursor = 0;
        self.rendering = true;
    }

    /// Claims the slot at the cursor and advances it.
    ///
    /// On the first render the returned entry is vacant and the caller inserts
    /// a slot of `kind`. On later renders the slot must already exist and have
    /// the same kind.
    pub fn next_slot(&mut self, kind: SlotKind) -> Result<SlotEntry<'_>, HookOrderError> {
        if !self.rendering {
            return Err(HookOrderError::NotRendering);
        }
        let index = self.cursor;

        if index == self.slots.len() {
            if let Some(expected) = self.committed {
                return Err(HookOrderError::TooMany { expected });
            }
            self.cursor += 1;
            log::trace!("slot #{index}: new {kind} slot");
            return Ok(SlotEntry::Vacant(VacantSlot {
                slots: &mut self.slots,
            }));
        }

        let expected = self.slots[index].kind();
        if expected != kind {
            return Err(HookOrderError::KindChanged {
                index,
                expected,
                found: kind,
            });
        }
        self.cursor += 1;
        Ok(SlotEntry::Occupied(&mut self.slots[index]))
    }

    /// Ends the render, checking that it used exactly as many slots as the
    /// previous one.
    pub fn end_render(&mut self) -> Result<(), HookOrderError> {
        self.rendering = false;
        match self.committed {
            None => {
                self.committed = Some(self.cursor);
                Ok(())
            }
            Some(expected) if expected == self.cursor => Ok(()),
            Some(expected) => Err(HookOrderError::CountChanged {
                expected,
                found: self.cursor,
            }),
        }
    }

    /// Ends a render whose output is being thrown away.
    ///
    /// Slots created by an abandoned first render are dropped so the retry
    /// starts from scratch; their effects never ran, so nothing needs cleanup.
    pub fn abort_render(&mut self) {
        self.rendering = false;
        if self.committed.is_none() {
            self.slots.clear();
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Latest cleanup of every effect slot, in slot order. Each is taken, so a
    /// second call yields nothing.
    pub fn take_cleanups(&mut self) -> Vec<Dispose> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Effect(record) => record.borrow_mut().take_cleanup(),
                _ => None,
            })
            .collect()
    }
}
