use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::slot::HookOrderError;

/// Error type component bodies may return.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Where a caught panic happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Render,
    Effect,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Render => "render",
            Phase::Effect => "effect",
            Phase::Cleanup => "cleanup",
        })
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Slot order changed between renders. Not recoverable: the instance's
    /// state can no longer be attributed to its hooks.
    #[error("hook order violated in `{component}`: {source}")]
    HookOrder {
        component: &'static str,
        #[source]
        source: HookOrderError,
    },
    #[error("`{component}` failed to render: {source}")]
    Component {
        component: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("`{component}` panicked during {phase}: {message}")]
    Panicked {
        component: &'static str,
        phase: Phase,
        message: String,
    },
    #[error("render loop did not settle after {limit} passes")]
    RenderLoop { limit: usize },
}

impl RuntimeError {
    /// Fatal errors abort the tick; the rest are reported to the error boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RuntimeError::HookOrder { .. })
    }

    pub fn component(&self) -> Option<&'static str> {
        match self {
            RuntimeError::HookOrder { component, .. }
            | RuntimeError::Component { component, .. }
            | RuntimeError::Panicked { component, .. } => Some(*component),
            RuntimeError::RenderLoop { .. } => None,
        }
    }
}

/// Receives non-fatal errors caught at instance boundaries.
pub trait ErrorBoundary {
    fn capture(&mut self, error: RuntimeError);
}

impl<F: FnMut(RuntimeError)> ErrorBoundary for F {
    fn capture(&mut self, error: RuntimeError) {
        self(error)
    }
}

/// Default boundary: logs and moves on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBoundary;

impl ErrorBoundary for LogBoundary {
    fn capture(&mut self, error: RuntimeError) {
        log::error!("{error}");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}
