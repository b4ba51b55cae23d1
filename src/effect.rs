//! Starting asynchronous effects.
//!
//! Async combinators hand their futures to [`spawn`]. While a batch of effects is
//! running inside a [`Scope`], those futures are held back and only started once
//! the whole batch has returned, so every synchronous dispatch of the batch lands
//! before any asynchronous one, whatever executor drives the futures.

use std::cell::RefCell;

use futures::{FutureExt, future::BoxFuture};
use tracing::debug;

pub(crate) type Task = BoxFuture<'static, ()>;

thread_local! {
    static PENDING: RefCell<Option<Vec<Task>>> = const { RefCell::new(None) };
}

/// Start `future` once the enclosing scope finishes, or right away outside one.
pub(crate) fn spawn(future: impl Future<Output = ()> + Send + 'static) {
    let task = future.boxed();
    let task = PENDING.with_borrow_mut(|pending| match pending {
        Some(tasks) => {
            tasks.push(task);
            None
        }
        None => Some(task),
    });

    if let Some(task) = task {
        spawn_detached(task);
    }
}

/// Drive `future` on the ambient tokio runtime, or on a thread of its own.
pub(crate) fn spawn_detached(future: impl Future<Output = ()> + Send + 'static) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => {
            debug!("no tokio runtime; driving effect on a dedicated thread");
            std::thread::spawn(move || futures::executor::block_on(future));
        }
    }
}

/// Collects the futures spawned on this thread until it is finished.
///
/// Scopes nest: only the outermost one collects, inner ones finish empty. A scope
/// dropped without being finished (for instance while unwinding) discards what it
/// collected.
pub(crate) struct Scope {
    owner: bool,
}

impl Scope {
    pub(crate) fn enter() -> Self {
        let owner = PENDING.with_borrow_mut(|pending| {
            if pending.is_some() {
                return false;
            }
            *pending = Some(Vec::new());
            true
        });
        Self { owner }
    }

    /// Close the scope and return the futures it held back.
    pub(crate) fn finish(self) -> Vec<Task> {
        if !self.owner {
            return Vec::new();
        }
        PENDING.with_borrow_mut(Option::take).unwrap_or_default()
    }

    /// Close the scope and start everything it held back.
    pub(crate) fn start(self) {
        for task in self.finish() {
            spawn_detached(task);
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.owner {
            PENDING.with_borrow_mut(|pending| *pending = None);
        }
    }
}
