//! Invoker - marshals work onto the scripting thread.
//!
//! The invoker is the only synchronization primitive of the bridge. Calls on
//! the owning thread run synchronously; calls from any other thread are queued
//! (FIFO) and run when the owner pumps its [`DispatchQueue`].
//!
//! ## Key Types
//!
//! - [`Invoker`]: the trait the bridge dispatches through
//! - [`ThreadInvoker`]: channel-backed invoker bound to one thread
//! - [`DispatchQueue`]: the owner's end of that channel

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use projection_core::{NativeError, codes};

/// A unit of work queued for the scripting thread.
pub type Task = Box<dyn FnOnce() + Send>;

/// Runs work on the scripting thread.
pub trait Invoker: Send + Sync {
    /// Check if the calling thread is the scripting thread.
    fn is_owner_thread(&self) -> bool;

    /// Queue `task` to run later on the scripting thread.
    ///
    /// Never runs the task synchronously, even when called from the owner.
    fn queue(&self, task: Task);

    /// Run `task` now if on the scripting thread, otherwise queue it.
    fn call(&self, task: Task) {
        if self.is_owner_thread() {
            task();
        } else {
            self.queue(task);
        }
    }
}

impl dyn Invoker {
    /// Run `f` on the scripting thread and wait for its result.
    ///
    /// On the owner thread `f` runs inline. Anywhere else the calling thread
    /// blocks until the owner has run the queued call, so this must never be
    /// used from the scripting thread's own queue pump.
    pub fn call_sync<R, F>(&self, f: F) -> Result<R, NativeError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_owner_thread() {
            return Ok(f());
        }
        let (tx, rx) = channel::bounded(1);
        self.queue(Box::new(move || {
            let _ = tx.send(f());
        }));
        rx.recv().map_err(|_| {
            NativeError::new(
                codes::E_ILLEGAL_METHOD_CALL,
                "the scripting thread dropped a queued call",
            )
        })
    }
}

// ============================================================================
// Thread invoker
// ============================================================================

/// Invoker bound to the thread that created it.
pub struct ThreadInvoker {
    owner: ThreadId,
    tx: Sender<Task>,
}

impl ThreadInvoker {
    /// Create an invoker owned by the calling thread.
    ///
    /// The returned queue must be pumped on this thread.
    pub fn for_current_thread() -> (Arc<ThreadInvoker>, DispatchQueue) {
        let owner = thread::current().id();
        let (tx, rx) = channel::unbounded();
        (Arc::new(ThreadInvoker { owner, tx }), DispatchQueue { owner, rx })
    }

    /// The owning thread.
    pub fn owner(&self) -> ThreadId {
        self.owner
    }
}

impl Invoker for ThreadInvoker {
    fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    fn queue(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::warn!("dispatch queue closed, dropping task");
        }
    }
}

impl fmt::Debug for ThreadInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadInvoker")
            .field("owner", &self.owner)
            .field("queued", &self.tx.len())
            .finish()
    }
}

/// Receiving end of a [`ThreadInvoker`].
pub struct DispatchQueue {
    owner: ThreadId,
    rx: Receiver<Task>,
}

impl DispatchQueue {
    fn assert_owner(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "dispatch queue pumped off its owning thread"
        );
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run the tasks queued when the call started, in order.
    ///
    /// Tasks queued while draining wait for the next call. Returns the number
    /// of tasks run.
    ///
    /// # Panics
    ///
    /// Panics when called off the owning thread.
    pub fn run_pending(&self) -> usize {
        self.assert_owner();
        let mut ran = 0;
        for _ in 0..self.rx.len() {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }

    /// Run tasks until the queue is empty, including ones queued meanwhile.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch = self.run_pending();
            if batch == 0 {
                return ran;
            }
            ran += batch;
        }
    }

    /// Wait up to `timeout` for one task and run it.
    ///
    /// Returns `false` on timeout or when every invoker is gone.
    pub fn run_one(&self, timeout: Duration) -> bool {
        self.assert_owner();
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("owner", &self.owner)
            .field("pending", &self.rx.len())
            .finish()
    }
}
