use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

/// A handle that feeds messages back into a message loop.
///
/// `Dispatch` is the capability every effect receives: calling [`send`](Self::send)
/// delivers one message to whoever owns the loop. It is cheap to clone and can be
/// moved across threads, so asynchronous effects can hold on to it until their
/// result is ready.
///
/// # Examples
///
/// ```
/// use elmish::dispatch::Dispatch;
///
/// let dispatch = Dispatch::new(|msg: i32| println!("got {msg}"));
/// dispatch.send(42);
/// ```
pub struct Dispatch<Msg> {
    inner: Arc<dyn Fn(Msg) + Send + Sync>,
}

impl<Msg: 'static> Dispatch<Msg> {
    /// Create a dispatch handle from a callback.
    pub fn new(f: impl Fn(Msg) + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Create a dispatch handle that enqueues messages into a channel.
    ///
    /// Sending after the receiving side has been dropped is not an error: the
    /// message is discarded. Effects may outlive the loop that spawned them.
    pub fn from_sender(tx: mpsc::UnboundedSender<Msg>) -> Self
    where
        Msg: Send,
    {
        Self::new(move |msg| {
            if tx.send(msg).is_err() {
                debug!("message loop is gone; dropping dispatched message");
            }
        })
    }

    /// Create a dispatch handle that does not keep the channel open.
    ///
    /// Messages are delivered while some [`mpsc::UnboundedSender`] for the channel
    /// is still alive, and discarded afterwards.
    pub fn from_weak(tx: mpsc::WeakUnboundedSender<Msg>) -> Self
    where
        Msg: Send,
    {
        Self::new(move |msg| {
            let delivered = tx.upgrade().is_some_and(|tx| tx.send(msg).is_ok());
            if !delivered {
                debug!("message queue is closed; dropping dispatched message");
            }
        })
    }

    /// Deliver a message.
    pub fn send(&self, msg: Msg) {
        (self.inner)(msg);
    }

    /// Adapt this handle to accept another message type.
    ///
    /// Every message sent to the returned handle is converted with `f` before
    /// being delivered here.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::dispatch::Dispatch;
    ///
    /// enum Parent {
    ///     Child(u8),
    /// }
    ///
    /// let parent = Dispatch::new(|_: Parent| {});
    /// let child: Dispatch<u8> = parent.contramap(Parent::Child);
    /// child.send(1);
    /// ```
    pub fn contramap<B: 'static>(self, f: impl Fn(B) -> Msg + Send + Sync + 'static) -> Dispatch<B> {
        Dispatch::new(move |msg| self.send(f(msg)))
    }
}

impl<Msg> Clone for Dispatch<Msg> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Msg> fmt::Debug for Dispatch<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}
