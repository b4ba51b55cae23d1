//! Helpers for testing commands and programs.
//!
//! [`Recorder`] is a [`Dispatch`] sink that keeps every message it receives, so a
//! test can run a command and assert on exactly what it dispatched.
//!
//! # Basic Usage
//!
//! ```
//! use elmish::{cmd::Cmd, testing::Recorder};
//!
//! let recorder = Recorder::new();
//! Cmd::batch([Cmd::of_msg(1), Cmd::of_msg(2)]).exec(&recorder.dispatch());
//!
//! assert_eq!(recorder.messages(), vec![1, 2]);
//! ```
//!
//! # Asynchronous Effects
//!
//! Effects built with [`Cmd::of_promise`](crate::cmd::Cmd::of_promise) dispatch later.
//! Use [`Recorder::wait_for`] to wait until enough messages have arrived:
//!
//! ```
//! use elmish::{cmd::Cmd, testing::Recorder};
//! use tokio::time::{Duration, timeout};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let recorder = Recorder::new();
//! Cmd::perform(async { "done".to_string() }, |s: String| s).exec(&recorder.dispatch());
//!
//! timeout(Duration::from_secs(1), recorder.wait_for(1)).await.unwrap();
//! assert_eq!(recorder.messages(), vec!["done".to_string()]);
//! # }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::dispatch::Dispatch;

/// A dispatch target that records messages.
///
/// Clones share the same log, so a recorder can be handed to a program under
/// test while the test keeps a copy to inspect.
#[derive(Debug)]
pub struct Recorder<Msg> {
    log: Arc<Mutex<Vec<Msg>>>,
    count: watch::Sender<usize>,
}

impl<Msg: Send + 'static> Recorder<Msg> {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        let (count, _rx) = watch::channel(0);
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            count,
        }
    }

    /// Returns a [`Dispatch`] that appends to this recorder.
    #[must_use]
    pub fn dispatch(&self) -> Dispatch<Msg> {
        let log = Arc::clone(&self.log);
        let count = self.count.clone();
        Dispatch::new(move |msg| {
            let mut log = log.lock();
            log.push(msg);
            // Published under the lock so concurrent senders never step the count back.
            count.send_replace(log.len());
        })
    }

    /// Returns the number of recorded messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Removes and returns every recorded message.
    pub fn take(&self) -> Vec<Msg> {
        let taken = std::mem::take(&mut *self.log.lock());
        self.count.send_replace(0);
        taken
    }

    /// Waits until at least `count` messages have been recorded.
    ///
    /// Combine with [`tokio::time::timeout`] to bound the wait.
    pub async fn wait_for(&self, count: usize) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|len| *len >= count).await;
    }
}

impl<Msg: Clone + Send + 'static> Recorder<Msg> {
    /// Returns a copy of every recorded message, in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<Msg> {
        self.log.lock().clone()
    }
}

impl<Msg> Clone for Recorder<Msg> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            count: self.count.clone(),
        }
    }
}

impl<Msg: Send + 'static> Default for Recorder<Msg> {
    fn default() -> Self {
        Self::new()
    }
}
