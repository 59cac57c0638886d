use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::runtime::InstanceKey;

/// Cleanup handle returned by an effect body.
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// A handle with nothing to clean up.
    pub fn none() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Runs at most once (safe to call multiple times, and from clones).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl Default for Dispose {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Dispose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dispose")
            .field(&if self.is_pending() { "pending" } else { "spent" })
            .finish()
    }
}

/// Helper to build the cleanup an effect body returns.
pub fn on_cleanup(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}

/// Persistent half of an effect hook: what it last ran with, and how to undo it.
#[derive(Default)]
pub struct EffectRecord {
    /// `None` for effects without dependencies, which run after every render.
    deps: Option<Box<dyn Any>>,
    cleanup: Option<Dispose>,
    runs: usize,
}

impl EffectRecord {
    /// Whether a render asking for `deps` needs the effect to run again.
    ///
    /// A dependency value of a different type than last time counts as a change.
    pub fn should_run<D: PartialEq + 'static>(&self, deps: Option<&D>) -> bool {
        if self.runs == 0 {
            return true;
        }
        match (deps, &self.deps) {
            (Some(next), Some(prev)) => prev.downcast_ref::<D>().is_none_or(|prev| prev != next),
            _ => true,
        }
    }

    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn take_cleanup(&mut self) -> Option<Dispose> {
        self.cleanup.take()
    }
}

impl fmt::Debug for EffectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRecord")
            .field("has_deps", &self.deps.is_some())
            .field("cleanup", &self.cleanup)
            .field("runs", &self.runs)
            .finish()
    }
}

/// An effect whose dependencies changed during a render, waiting for the commit.
pub(crate) struct PendingEffect {
    pub instance: InstanceKey,
    pub record: Rc<RefCell<EffectRecord>>,
    pub deps: Option<Box<dyn Any>>,
    pub body: Box<dyn FnOnce() -> Dispose>,
}

impl PendingEffect {
    /// Takes the cleanup left by the previous run, to run it separately.
    pub fn take_previous_cleanup(&self) -> Option<Dispose> {
        self.record.borrow_mut().take_cleanup()
    }

    /// Runs the previous cleanup (unless already taken), then the body.
    ///
    /// The new deps are recorded only once the body returns, so a body that
    /// panics runs again on the next render.
    pub fn run(self) {
        if let Some(cleanup) = self.take_previous_cleanup() {
            cleanup.run();
        }
        let cleanup = (self.body)();
        let mut record = self.record.borrow_mut();
        record.deps = self.deps;
        record.runs += 1;
        record.cleanup = Some(cleanup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_runs_once_across_clones() {
        let hits = Rc::new(RefCell::new(0));
        let d = {
            let hits = hits.clone();
            on_cleanup(move || *hits.borrow_mut() += 1)
        };
        let d2 = d.clone();
        d.run();
        d2.run();
        d.run();
        assert_eq!(*hits.borrow(), 1);
        assert!(!d2.is_pending());
    }

    #[test]
    fn fresh_record_always_runs() {
        let record = EffectRecord::default();
        assert!(record.should_run(Some(&())));
        assert!(record.should_run::<()>(None));
    }

    #[test]
    fn pending_effect_cleans_up_before_next_body() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let record = Rc::new(RefCell::new(EffectRecord::default()));

        for round in 0..2 {
            let log = log.clone();
            PendingEffect {
                instance: InstanceKey::default(),
                record: record.clone(),
                deps: Some(Box::new(round)),
                body: Box::new(move || {
                    log.borrow_mut().push(format!("run {round}"));
                    on_cleanup(move || log.borrow_mut().push(format!("cleanup {round}")))
                }),
            }
            .run();
        }

        assert_eq!(*log.borrow(), ["run 0", "cleanup 0", "run 1"]);
        assert!(!record.borrow().should_run(Some(&1)));
        assert!(record.borrow().should_run(Some(&2)));
        assert!(record.borrow().should_run(Some(&"other type")));
    }

    #[test]
    fn panicking_body_is_retried() {
        let record = Rc::new(RefCell::new(EffectRecord::default()));
        let effect = PendingEffect {
            instance: InstanceKey::default(),
            record: record.clone(),
            deps: Some(Box::new(1)),
            body: Box::new(|| -> Dispose { panic!("body boom") }),
        };
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| effect.run()));
        assert!(caught.is_err());
        assert_eq!(record.borrow().runs(), 0);
        assert!(record.borrow().should_run(Some(&1)));
    }
}
