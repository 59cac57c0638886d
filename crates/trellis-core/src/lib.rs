//! # Components, hooks and the render scheduler
//!
//! Trellis components are plain functions from a render context and props to
//! an [`Element`] tree:
//!
//! ```rust
//! use trellis_core::*;
//!
//! fn counter(cx: &mut Hooks<'_>, step: &i32) -> Rendered {
//!     let (count, set_count) = cx.state(0);
//!
//!     let step = *step;
//!     cx.effect_with(count, move || {
//!         if count > 100 {
//!             set_count.set(0);
//!         }
//!         Dispose::none()
//!     });
//!
//!     Ok(Element::text(format!("count = {count} (+{step})")))
//! }
//!
//! let mut rt = Runtime::new(RecordingBackend::new());
//! rt.mount(component(counter, 5));
//! rt.tick().unwrap();
//! assert_eq!(rt.committed().unwrap().text_content(), "count = 0 (+5)");
//! ```
//!
//! ## Hooks
//!
//! - `state` / `state_with`: a value plus a [`Setter`]. Setting an equal
//!   value does nothing; anything else marks the instance dirty.
//! - `effect`, `effect_once`, `effect_with`: side-effects that run after the
//!   tree is committed. The body returns a [`Dispose`] that runs before the
//!   next run of the same effect and on teardown.
//! - `reference`: a mutable cell that survives re-renders without causing them.
//! - `memo`: a cached value recomputed when its dependencies change.
//!
//! Hooks are order-based: the Nth hook call of a render always refers to the
//! Nth slot of the instance. Calling hooks conditionally changes that order,
//! which the runtime reports as a fatal [`RuntimeError::HookOrder`].
//!
//! ## Scheduling
//!
//! Setters never render synchronously. [`Runtime::tick`] drains the dirty set,
//! renders each instance at most once per pass, commits the resolved
//! [`Descriptor`] tree to the [`RenderBackend`] when it changed, and finally
//! runs the effects whose dependencies changed.
//!
//! Closures built during a render capture that render's values. Three calls
//! of `set_count.set(count + 1)` from one handler all write `count + 1`; use
//! `set_count.update(|c| c + 1)` to build on the latest value instead.

pub mod config;
pub mod effects;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod prelude;
pub mod render_api;
pub mod runtime;
pub mod slot;
pub mod state;
pub mod view;

pub use prelude::*;
