use std::fmt;
use std::sync::Arc;

use crate::{dispatch::Dispatch, effect};

/// A pending effect.
///
/// A `Sub` receives a [`Dispatch`] when it is run and may call it any number of
/// times, synchronously or later from another task. It is consumed by running it,
/// so each `Sub` runs at most once.
///
/// # Examples
///
/// ```
/// use elmish::{dispatch::Dispatch, sub::Sub};
///
/// let sub = Sub::new(|dispatch: Dispatch<u32>| {
///     dispatch.send(1);
///     dispatch.send(2);
/// });
///
/// sub.run(Dispatch::new(|n| println!("{n}")));
/// ```
pub struct Sub<Msg> {
    f: Box<dyn FnOnce(Dispatch<Msg>) + Send>,
}

impl<Msg: Send + 'static> Sub<Msg> {
    /// Wrap a closure as a `Sub`.
    pub fn new(f: impl FnOnce(Dispatch<Msg>) + Send + 'static) -> Self {
        Self { f: Box::new(f) }
    }

    /// Run the effect against `dispatch`.
    ///
    /// Any asynchronous work the effect spawns starts after it returns.
    pub fn run(self, dispatch: Dispatch<Msg>) {
        let scope = effect::Scope::enter();
        (self.f)(dispatch);
        scope.start();
    }

    /// Convert every message this effect produces with `f`.
    ///
    /// Nothing runs until the returned `Sub` is run.
    pub fn map<B: Send + 'static>(self, f: impl Fn(Msg) -> B + Send + Sync + 'static) -> Sub<B> {
        self.map_shared(Arc::new(f))
    }

    pub(crate) fn map_shared<B: Send + 'static>(
        self,
        f: Arc<dyn Fn(Msg) -> B + Send + Sync>,
    ) -> Sub<B> {
        Sub::new(move |dispatch: Dispatch<B>| self.run(dispatch.contramap(move |msg| f(msg))))
    }
}

impl<Msg> fmt::Debug for Sub<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sub").finish_non_exhaustive()
    }
}
