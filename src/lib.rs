//! # cwalk
//!
//! `cwalk` walks a directory tree concurrently, calling a callback once for every file and
//! directory beneath a root, the root included. Directory listing is spread over a bounded
//! pool of worker threads; when the job queue is saturated, the thread that discovered a
//! directory processes it itself instead of blocking.
//!
//! Entries are not visited in any particular order, and the callback is called from
//! several threads at once. Failures in one directory do not stop the rest of the walk;
//! they are collected and returned together once every directory has been processed.
//!
//! # Features
//!
//! - `logging`: Enables debug logging via the `tracing` crate.
//!
//! # Example
//!
//! ```no_run
//! use cwalk::{Visit, walk};
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! let files = AtomicU64::new(0);
//! let dirs = AtomicU64::new(0);
//! let result = walk("/var/log", |_path, metadata| {
//!     match metadata {
//!         Ok(m) if m.is_dir() => dirs.fetch_add(1, Ordering::Relaxed),
//!         Ok(_) => files.fetch_add(1, Ordering::Relaxed),
//!         Err(_) => 0,
//!     };
//!     Visit::Continue
//! });
//!
//! println!("{} dirs, {} files", dirs.into_inner(), files.into_inner());
//! if let Err(e) = result {
//!     eprintln!("{}", e);
//! }
//! ```

mod engine;
mod error;
mod links;
mod options;
mod queue;
mod types;

pub use engine::{Walker, walk, walk_with_symlinks};
pub use error::{BoxError, ErrorList, PathError, WalkError};
pub use options::{WalkBuilder, WalkOptions};
pub use types::{Visit, WalkStats};
