/// Scheduler knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on render passes per tick. Effects that keep setting state
    /// would otherwise loop forever.
    pub max_passes: usize,
    /// Hand every pass's tree to the renderer, even when it equals the last
    /// committed one.
    pub commit_unchanged: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_passes: 50,
            commit_unchanged: false,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    pub fn commit_unchanged(mut self, yes: bool) -> Self {
        self.commit_unchanged = yes;
        self
    }
}
