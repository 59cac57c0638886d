//! Network collaborator used from effect bodies.
//!
//! The runtime never calls a [`Fetcher`] itself. Effects start requests and
//! route the result back through a state setter; the [`Dispose`] a fetch
//! returns aborts the request, so returning it from the effect cancels the
//! request when the instance goes away.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::effects::Dispose;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

pub type FetchCallback = Box<dyn FnOnce(Result<Response, FetchError>)>;

/// Fire-and-forget request: `done` is called at most once, later.
pub trait Fetcher {
    fn fetch(&self, url: &str, done: FetchCallback) -> Dispose;
}

impl<F: Fetcher + ?Sized> Fetcher for Rc<F> {
    fn fetch(&self, url: &str, done: FetchCallback) -> Dispose {
        (**self).fetch(url, done)
    }
}

struct Pending {
    id: u64,
    url: String,
    done: FetchCallback,
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    pending: Vec<Pending>,
}

/// Fetcher whose requests stay pending until resolved by hand.
///
/// Drives effects from tests and demos without a network.
#[derive(Clone, Default)]
pub struct QueuedFetcher {
    queue: Rc<RefCell<Queue>>,
}

impl QueuedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs of requests that are neither resolved nor aborted.
    pub fn pending(&self) -> Vec<String> {
        self.queue
            .borrow()
            .pending
            .iter()
            .map(|p| p.url.clone())
            .collect()
    }

    /// Completes the oldest pending request for `url`. Returns `false` if
    /// there was none.
    pub fn resolve(&self, url: &str, result: Result<Response, FetchError>) -> bool {
        let found = {
            let mut q = self.queue.borrow_mut();
            q.pending
                .iter()
                .position(|p| p.url == url)
                .map(|i| q.pending.remove(i))
        };
        match found {
            Some(p) => {
                log::debug!("fetch #{} {} resolved", p.id, p.url);
                (p.done)(result);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for QueuedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedFetcher")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Fetcher for QueuedFetcher {
    fn fetch(&self, url: &str, done: FetchCallback) -> Dispose {
        let id = {
            let mut q = self.queue.borrow_mut();
            let id = q.next_id;
            q.next_id += 1;
            q.pending.push(Pending {
                id,
                url: url.to_string(),
                done,
            });
            id
        };
        log::debug!("fetch #{id} {url} started");

        let queue = Rc::downgrade(&self.queue);
        Dispose::new(move || {
            if let Some(queue) = queue.upgrade() {
                let mut q = queue.borrow_mut();
                let before = q.pending.len();
                q.pending.retain(|p| p.id != id);
                if q.pending.len() != before {
                    log::debug!("fetch #{id} aborted");
                }
            }
        })
    }
}
