use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for one walk. Read once at the start of [`Walker::run`](crate::Walker::run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkOptions {
    pub root: PathBuf,
    /// Number of pool workers. Values below 1 are treated as 1.
    pub workers: usize,
    /// Job queue capacity. 0 makes every submission without an idle worker run inline.
    pub buffer_size: usize,
    pub follow_symlinks: bool,
}
impl Default for WalkOptions {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            root: PathBuf::from("."),
            workers,
            buffer_size: workers,
            follow_symlinks: false,
        }
    }
}
impl WalkOptions {
    pub(crate) fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}
#[derive(Debug, Default)]
pub struct WalkBuilder {
    options: WalkOptions,
}
impl WalkBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            options: WalkOptions {
                root: root.into(),
                ..Default::default()
            },
        }
    }
    pub fn workers(mut self, count: usize) -> Self {
        self.options.workers = count;
        self
    }
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.options.buffer_size = size;
        self
    }
    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.options.follow_symlinks = yes;
        self
    }
    pub fn build(self) -> WalkOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_host() {
        let options = WalkOptions::default();
        assert!(options.workers >= 1);
        assert_eq!(options.buffer_size, options.workers);
        assert!(!options.follow_symlinks);
    }

    #[test]
    fn builder_overrides() {
        let options = WalkBuilder::new("/tmp")
            .workers(0)
            .buffer_size(0)
            .follow_symlinks(true)
            .build();
        assert_eq!(options.root, PathBuf::from("/tmp"));
        assert_eq!(options.worker_count(), 1);
        assert_eq!(options.buffer_size, 0);
        assert!(options.follow_symlinks);
    }
}
