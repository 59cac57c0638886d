use crate::view::Descriptor;

/// Applies committed descriptor trees to a live output target.
pub trait RenderBackend {
    /// Called after a pass whose resolved tree differs from the last one.
    /// `previous` is `None` for the first commit.
    fn commit(&mut self, previous: Option<&Descriptor>, next: &Descriptor);
}

impl<R: RenderBackend + ?Sized> RenderBackend for Box<R> {
    fn commit(&mut self, previous: Option<&Descriptor>, next: &Descriptor) {
        (**self).commit(previous, next)
    }
}

/// Discards every commit.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl RenderBackend for NullBackend {
    fn commit(&mut self, _previous: Option<&Descriptor>, _next: &Descriptor) {}
}

/// Keeps every committed tree, oldest first.
#[derive(Debug, Default, Clone)]
pub struct RecordingBackend {
    pub commits: Vec<Descriptor>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Descriptor> {
        self.commits.last()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

impl RenderBackend for RecordingBackend {
    fn commit(&mut self, _previous: Option<&Descriptor>, next: &Descriptor) {
        self.commits.push(next.clone());
    }
}
