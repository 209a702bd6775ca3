use crate::error::{ErrorList, PathError, WalkError};
use crate::links::{VisitedDirs, links_to_dir};
use crate::options::{WalkBuilder, WalkOptions};
use crate::queue::{BoundedQueue, CloseHandle, Pending, WorkGuard};
use crate::types::{Visit, WalkStats};
use std::any::Any;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;

/// Lists the child names of `dir`, unsorted.
fn read_dir_names(dir: &Path) -> Result<Vec<OsString>, WalkError> {
    let entries = fs::read_dir(dir).map_err(|e| WalkError::read_dir(dir, e))?;
    entries
        .map(|entry| {
            entry
                .map(|entry| entry.file_name())
                .map_err(|e| WalkError::read_dir(dir, e))
        })
        .collect()
}

enum RootVisit {
    Descend,
    Skip,
}

fn visit_root<F>(root: &Path, follow_links: bool, callback: &F) -> Result<RootVisit, WalkError>
where
    F: Fn(&Path, io::Result<Metadata>) -> Visit,
{
    let metadata = match fs::symlink_metadata(root) {
        Ok(metadata) => metadata,
        Err(source) => {
            let seen = io::Error::new(source.kind(), source.to_string());
            return match callback(root, Err(seen)) {
                Visit::Abort(cause) => Err(WalkError::aborted(root, cause)),
                Visit::Continue | Visit::SkipSubtree => Err(WalkError::stat(root, source)),
            };
        }
    };
    let is_dir = metadata.is_dir() || (follow_links && links_to_dir(root, &metadata));
    match callback(root, Ok(metadata)) {
        Visit::Abort(cause) => Err(WalkError::aborted(root, cause)),
        _ if !is_dir => Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Visit::SkipSubtree => Ok(RootVisit::Skip),
        Visit::Continue => Ok(RootVisit::Descend),
    }
}

/// Nested inline runs allowed on one thread before further overflow is deferred.
const MAX_INLINE_DEPTH: usize = 64;

/// Directories a thread has taken over from a full queue.
///
/// The first [`MAX_INLINE_DEPTH`] levels run immediately; deeper ones wait in `deferred`
/// until the outermost job on this thread returns, so the stack stays bounded.
#[derive(Default)]
struct Inline {
    depth: usize,
    deferred: Vec<PathBuf>,
}

/// State shared by every thread taking part in one walk.
struct Traversal<'a, F> {
    callback: &'a F,
    jobs: BoundedQueue<PathBuf>,
    errors: BoundedQueue<PathError>,
    pending: Pending,
    visited: Option<VisitedDirs>,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

impl<F> Traversal<'_, F>
where
    F: Fn(&Path, io::Result<Metadata>) -> Visit + Sync,
{
    fn process_dir(&self, dir: &Path, inline: &mut Inline) -> Result<(), WalkError> {
        let names = read_dir_names(dir)?;
        for name in names {
            let path = dir.join(name);
            let metadata = fs::symlink_metadata(&path);
            let is_dir = match &metadata {
                Ok(metadata) => {
                    metadata.is_dir() || (self.visited.is_some() && links_to_dir(&path, metadata))
                }
                Err(_) => false,
            };
            match (self.callback)(&path, metadata) {
                Visit::Continue if is_dir => {
                    if self.claim(&path) {
                        self.submit(path, inline);
                    }
                }
                Visit::Continue | Visit::SkipSubtree => {}
                Visit::Abort(cause) => return Err(WalkError::aborted(path, cause)),
            }
        }
        Ok(())
    }

    fn claim(&self, dir: &Path) -> bool {
        match &self.visited {
            Some(visited) => visited.claim(dir),
            None => true,
        }
    }

    /// Queues `dir` for a pool worker, or takes it on this thread when the queue is full.
    fn submit(&self, dir: PathBuf, inline: &mut Inline) {
        self.pending.add();
        let Err(dir) = self.jobs.try_push(dir) else {
            return;
        };
        #[cfg(feature = "logging")]
        tracing::trace!("Queue full, processing {} inline", dir.display());
        if inline.depth < MAX_INLINE_DEPTH {
            inline.depth += 1;
            self.run_one(dir, inline);
            inline.depth -= 1;
        } else {
            inline.deferred.push(dir);
        }
    }

    /// Runs `dir` and everything this thread had to take over while doing so.
    fn run_job(&self, dir: PathBuf) {
        let mut inline = Inline::default();
        self.run_one(dir, &mut inline);
        while let Some(dir) = inline.deferred.pop() {
            self.run_one(dir, &mut inline);
        }
    }

    fn run_one(&self, dir: PathBuf, inline: &mut Inline) {
        // Declared first so completion is signalled after the error is reported.
        let _done = WorkGuard::new(&self.pending);
        let depth = inline.depth;
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.process_dir(&dir, inline)));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                #[cfg(feature = "logging")]
                tracing::debug!("Failed to process {}: {}", dir.display(), error);
                self.errors.push(PathError { path: dir, error });
            }
            Err(payload) => {
                inline.depth = depth;
                let mut slot = self.panic.lock().unwrap_or_else(PoisonError::into_inner);
                slot.get_or_insert(payload);
            }
        }
    }

    fn worker(&self) {
        while let Some(dir) = self.jobs.pop() {
            self.run_job(dir);
        }
    }

    fn collect_errors(&self) -> ErrorList {
        let mut list = ErrorList::default();
        while let Some(error) = self.errors.pop() {
            list.push(error);
        }
        list
    }

    fn run(
        &self,
        root: &Path,
        workers: usize,
        close_jobs: CloseHandle,
        close_errors: CloseHandle,
    ) -> Result<ErrorList, WalkError> {
        let errors = thread::scope(|s| {
            let collector = thread::Builder::new()
                .name("cwalk-errors".into())
                .spawn_scoped(s, move || self.collect_errors())
                .map_err(WalkError::Spawn)?;
            for id in 0..workers {
                let spawned = thread::Builder::new()
                    .name(format!("cwalk-worker-{}", id))
                    .spawn_scoped(s, move || self.worker());
                if let Err(e) = spawned {
                    drop(close_jobs);
                    drop(close_errors);
                    let _ = collector.join();
                    return Err(WalkError::Spawn(e));
                }
            }
            let mut inline = Inline::default();
            self.submit(root.to_path_buf(), &mut inline);
            while let Some(dir) = inline.deferred.pop() {
                self.run_one(dir, &mut inline);
            }
            self.pending.wait();
            close_jobs.close();
            close_errors.close();
            match collector.join() {
                Ok(list) => Ok(list),
                Err(payload) => panic::resume_unwind(payload),
            }
        });
        // A callback panic is re-raised only once every thread has shut down.
        let payload = self
            .panic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }
        errors
    }

    fn stats(&self, errors: &ErrorList) -> WalkStats {
        let jobs = self.jobs.stats();
        WalkStats {
            directories: jobs.enqueued() + jobs.rejected(),
            queued: jobs.enqueued(),
            inline: jobs.rejected(),
            errors: errors.len() as u64,
        }
    }
}

/// Concurrent directory walker.
///
/// Each call to [`Walker::run`] is an independent walk with its own queues, threads and
/// error aggregate. The callback is invoked concurrently from several threads and must
/// synchronize any state it touches.
#[derive(Debug, Clone)]
pub struct Walker {
    options: WalkOptions,
    stats: WalkStats,
}
impl Walker {
    pub fn new(options: WalkOptions) -> Self {
        Self {
            options,
            stats: WalkStats::default(),
        }
    }
    pub fn options(&self) -> &WalkOptions {
        &self.options
    }
    /// Counters from the most recent [`Walker::run`].
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// Walks the tree under the configured root, calling `callback` once per entry,
    /// the root included.
    ///
    /// Entry order is unspecified. Per-directory failures do not stop the walk; they are
    /// returned together as [`WalkError::Multiple`] once every directory has been processed.
    ///
    /// # Errors
    ///
    /// Fails immediately, before any worker starts, if the root cannot be stat'ed, is not
    /// a directory, or the callback aborts on it.
    ///
    /// # Panics
    ///
    /// A panic in the callback stops only the directory being processed. The walk still
    /// runs to completion, then the first panic is resumed on the calling thread.
    pub fn run<F>(&mut self, callback: F) -> Result<(), WalkError>
    where
        F: Fn(&Path, io::Result<Metadata>) -> Visit + Sync,
    {
        self.stats = WalkStats::default();
        let root = self.options.root.as_path();
        let follow_links = self.options.follow_symlinks;
        #[cfg(feature = "logging")]
        tracing::debug!(
            "Starting walk of {} with {} workers, buffer {}",
            root.display(),
            self.options.worker_count(),
            self.options.buffer_size
        );
        if let RootVisit::Skip = visit_root(root, follow_links, &callback)? {
            #[cfg(feature = "logging")]
            tracing::debug!("Root {} skipped by callback", root.display());
            return Ok(());
        }

        let (jobs, close_jobs) = BoundedQueue::new(self.options.buffer_size);
        let (errors, close_errors) = BoundedQueue::new(self.options.buffer_size);
        let traversal = Traversal {
            callback: &callback,
            jobs,
            errors,
            pending: Pending::default(),
            visited: follow_links.then(VisitedDirs::default),
            panic: Mutex::new(None),
        };
        if let Some(visited) = &traversal.visited {
            visited.claim(root);
        }
        let errors = traversal.run(
            root,
            self.options.worker_count(),
            close_jobs,
            close_errors,
        )?;
        self.stats = traversal.stats(&errors);
        #[cfg(feature = "logging")]
        tracing::debug!(
            "Walk of {} finished: {} directories, {} inline, {} errors",
            root.display(),
            self.stats.directories,
            self.stats.inline,
            self.stats.errors
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(WalkError::Multiple(errors))
        }
    }
}

/// Walks `root` with default options, without following symbolic links.
pub fn walk<F>(root: impl AsRef<Path>, callback: F) -> Result<(), WalkError>
where
    F: Fn(&Path, io::Result<Metadata>) -> Visit + Sync,
{
    Walker::new(WalkBuilder::new(root.as_ref()).build()).run(callback)
}

/// Like [`walk`], but descends into symbolic links that resolve to directories.
///
/// Every physical directory is descended at most once, so link cycles terminate.
/// The callback still receives the link's own metadata.
pub fn walk_with_symlinks<F>(root: impl AsRef<Path>, callback: F) -> Result<(), WalkError>
where
    F: Fn(&Path, io::Result<Metadata>) -> Visit + Sync,
{
    let options = WalkBuilder::new(root.as_ref())
        .follow_symlinks(true)
        .build();
    Walker::new(options).run(callback)
}
