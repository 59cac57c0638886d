pub use crate::config::RuntimeConfig;
pub use crate::effects::{Dispose, EffectRecord, on_cleanup};
pub use crate::error::{BoxError, ErrorBoundary, LogBoundary, Phase, RuntimeError};
pub use crate::fetch::{FetchCallback, FetchError, Fetcher, QueuedFetcher, Response};
pub use crate::hooks::Hooks;
pub use crate::render_api::{NullBackend, RecordingBackend, RenderBackend};
pub use crate::runtime::{InstanceFlags, InstanceKey, Runtime, TickReport};
pub use crate::slot::{HookOrderError, Slot, SlotEntry, SlotKind, SlotStore, VacantSlot};
pub use crate::state::Setter;
pub use crate::view::{
    Callback, ComponentNode, Descriptor, Element, ElementKind, InputKind, NavLink, Rendered,
    component, keyed,
};
