//! Bounded queue with a non-blocking enqueue, plus the outstanding-work counter.
//!
//! A full queue hands the item back to the producer instead of blocking, so the producer
//! can run the work itself. Closing is explicit: a [`CloseHandle`] is owned by whoever
//! decides the queue is finished, and dropping it wakes every consumer blocked in
//! [`BoundedQueue::pop`].

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
pub(crate) struct QueueStats {
    pub(crate) enqueued: AtomicU64,
    pub(crate) rejected: AtomicU64,
}

impl QueueStats {
    pub(crate) fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }
    pub(crate) fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

pub(crate) struct BoundedQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    closed: Receiver<()>,
    stats: QueueStats,
}

/// Closes its queue when dropped or when [`CloseHandle::close`] is called.
pub(crate) struct CloseHandle {
    _signal: Sender<()>,
}

impl CloseHandle {
    pub(crate) fn close(self) {}
}

impl<T> BoundedQueue<T> {
    pub(crate) fn new(capacity: usize) -> (Self, CloseHandle) {
        let (sender, receiver) = bounded(capacity);
        // Never sent on; consumers observe the disconnect once the handle is dropped.
        let (signal, closed) = bounded(0);
        let queue = Self {
            sender,
            receiver,
            closed,
            stats: QueueStats::default(),
        };
        (queue, CloseHandle { _signal: signal })
    }

    /// Enqueues without blocking. A full (or closed) queue returns the item to the caller.
    pub(crate) fn try_push(&self, item: T) -> Result<(), T> {
        match self.sender.try_send(item) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                Err(item)
            }
        }
    }

    /// Enqueues, blocking while the queue is full.
    pub(crate) fn push(&self, item: T) {
        // The queue owns its receiver, so the channel cannot disconnect under us.
        if self.sender.send(item).is_ok() {
            self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Blocks until an item arrives or the queue is closed.
    ///
    /// Items still buffered at close time are handed out before `None` is returned.
    pub(crate) fn pop(&self) -> Option<T> {
        select! {
            recv(self.receiver) -> item => item.ok(),
            recv(self.closed) -> _ => self.receiver.try_recv().ok(),
        }
    }

    pub(crate) fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

/// Outstanding-work counter. [`Pending::wait`] returns once every added unit is done.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    outstanding: AtomicUsize,
    lock: Mutex<()>,
    idle: Condvar,
}

impl Pending {
    pub(crate) fn add(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.idle.notify_all();
        }
    }

    pub(crate) fn wait(&self) {
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while self.outstanding.load(Ordering::SeqCst) != 0 {
            guard = self.idle.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

/// Marks one unit of [`Pending`] work done when dropped, including during a panic.
pub(crate) struct WorkGuard<'a> {
    pending: &'a Pending,
}

impl<'a> WorkGuard<'a> {
    pub(crate) fn new(pending: &'a Pending) -> Self {
        Self { pending }
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        self.pending.done();
    }
}
