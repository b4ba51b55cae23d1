use std::fmt;
use std::sync::Arc;

use futures::{FutureExt, Stream, StreamExt};
use crate::{dispatch::Dispatch, effect, sub::Sub};

/// A list of effects to run after a state transition.
///
/// Commands are returned from [`Program::init`](crate::program::Program::init) and
/// [`Program::update`](crate::program::Program::update). The runtime runs every
/// [`Sub`] in a command exactly once, in order, after the new state has been
/// committed. Commands are plain values: every combinator consumes its inputs and
/// builds a new command, and nothing runs until the command is executed.
///
/// # Examples
///
/// ```
/// use elmish::cmd::Cmd;
///
/// enum Message {
///     Loaded(u32),
///     Failed(String),
/// }
///
/// fn parse(input: &'static str) -> Result<u32, String> {
///     input.parse().map_err(|e: std::num::ParseIntError| e.to_string())
/// }
///
/// let cmd = Cmd::batch([
///     Cmd::of_msg(Message::Loaded(0)),
///     Cmd::of_func(parse, "42", Message::Loaded, Message::Failed),
/// ]);
/// assert_eq!(cmd.len(), 2);
/// ```
pub struct Cmd<Msg> {
    subs: Vec<Sub<Msg>>,
}

impl<Msg: Send + 'static> Cmd<Msg> {
    /// Create a command that does nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::cmd::Cmd;
    ///
    /// let cmd: Cmd<i32> = Cmd::none();
    /// assert!(cmd.is_empty());
    /// ```
    #[must_use]
    pub fn none() -> Self {
        Self { subs: Vec::new() }
    }

    /// Create a command that dispatches `msg` when it runs.
    ///
    /// The message is delivered synchronously, once, when the command is
    /// executed, not when it is created.
    pub fn of_msg(msg: Msg) -> Self {
        Self::single(move |dispatch: Dispatch<Msg>| dispatch.send(msg))
    }

    /// Convert every message this command produces with `f`.
    ///
    /// The result has the same effects in the same order. Nothing is run while
    /// mapping. This is how a parent reuses a child's commands under its own
    /// message type.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::cmd::Cmd;
    ///
    /// enum Child {
    ///     Clicked,
    /// }
    ///
    /// enum Parent {
    ///     Child(Child),
    /// }
    ///
    /// let child = Cmd::of_msg(Child::Clicked);
    /// let parent: Cmd<Parent> = child.map(Parent::Child);
    /// assert_eq!(parent.len(), 1);
    /// ```
    pub fn map<B: Send + 'static>(self, f: impl Fn(Msg) -> B + Send + Sync + 'static) -> Cmd<B> {
        let f: Arc<dyn Fn(Msg) -> B + Send + Sync> = Arc::new(f);
        Cmd {
            subs: self
                .subs
                .into_iter()
                .map(|sub| sub.map_shared(Arc::clone(&f)))
                .collect(),
        }
    }

    /// Concatenate commands into one.
    ///
    /// Effects keep their order: all effects of the first command come before
    /// those of the second, and so on. `Cmd::none()` is the identity.
    pub fn batch(commands: impl IntoIterator<Item = Cmd<Msg>>) -> Self {
        Self {
            subs: commands.into_iter().flat_map(|cmd| cmd.subs).collect(),
        }
    }

    /// Run a fallible function and dispatch its outcome.
    ///
    /// When the command runs, `task(arg)` is called. `Ok(r)` dispatches
    /// `of_success(r)` and `Err(e)` dispatches `of_error(e)`. Exactly one message
    /// is dispatched per run.
    ///
    /// Only the task's result selects the channel. A panic in `task` or in either
    /// mapper is not turned into an error message.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::{cmd::Cmd, testing::Recorder};
    ///
    /// #[derive(Debug, Clone, PartialEq)]
    /// enum Message {
    ///     Ok(u32),
    ///     Err(String),
    /// }
    ///
    /// let cmd = Cmd::of_func(|n: u32| Ok::<_, String>(n + 1), 4, Message::Ok, Message::Err);
    ///
    /// let recorder = Recorder::new();
    /// cmd.exec(&recorder.dispatch());
    /// assert_eq!(recorder.messages(), vec![Message::Ok(5)]);
    /// ```
    pub fn of_func<A, R, E>(
        task: impl FnOnce(A) -> Result<R, E> + Send + 'static,
        arg: A,
        of_success: impl FnOnce(R) -> Msg + Send + 'static,
        of_error: impl FnOnce(E) -> Msg + Send + 'static,
    ) -> Self
    where
        A: Send + 'static,
    {
        Self::single(move |dispatch: Dispatch<Msg>| match task(arg) {
            Ok(value) => dispatch.send(of_success(value)),
            Err(error) => dispatch.send(of_error(error)),
        })
    }

    /// Run a fallible function and dispatch only its success.
    ///
    /// An `Err` is discarded without a message or a log record. Use this only
    /// for effects whose failure does not matter to the application.
    pub fn perform_func<A, R, E>(
        task: impl FnOnce(A) -> Result<R, E> + Send + 'static,
        arg: A,
        of_success: impl FnOnce(R) -> Msg + Send + 'static,
    ) -> Self
    where
        A: Send + 'static,
    {
        Self::single(move |dispatch: Dispatch<Msg>| {
            if let Ok(value) = task(arg) {
                dispatch.send(of_success(value));
            }
        })
    }

    /// Run a fallible function for its side effect and dispatch only its failure.
    ///
    /// The success value, if any, is dropped.
    pub fn attempt_func<A, R, E>(
        task: impl FnOnce(A) -> Result<R, E> + Send + 'static,
        arg: A,
        of_error: impl FnOnce(E) -> Msg + Send + 'static,
    ) -> Self
    where
        A: Send + 'static,
    {
        Self::single(move |dispatch: Dispatch<Msg>| {
            if let Err(error) = task(arg) {
                dispatch.send(of_error(error));
            }
        })
    }

    /// Wrap a hand-written effect.
    ///
    /// The effect decides when and how often to dispatch, including never or
    /// many times, for as long as it keeps the [`Dispatch`] alive.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::{cmd::Cmd, dispatch::Dispatch, sub::Sub};
    ///
    /// let cmd = Cmd::of_sub(Sub::new(|dispatch: Dispatch<u32>| {
    ///     for n in 0..3 {
    ///         dispatch.send(n);
    ///     }
    /// }));
    /// assert_eq!(cmd.len(), 1);
    /// ```
    pub fn of_sub(sub: Sub<Msg>) -> Self {
        Self { subs: vec![sub] }
    }

    fn single(f: impl FnOnce(Dispatch<Msg>) + Send + 'static) -> Self {
        Self::of_sub(Sub::new(f))
    }

    /// Run an asynchronous task and dispatch its outcome.
    ///
    /// When the command runs, `task(arg)` is called right away and the returned
    /// future is driven in the background. When it completes, `Ok(r)` dispatches
    /// `of_success(r)` and `Err(e)` dispatches `of_error(e)`. The message is never
    /// dispatched from within the call that ran the command.
    ///
    /// The future is spawned on the current tokio runtime once every other effect
    /// of the running command has returned. Outside of a runtime it is driven on a
    /// dedicated thread.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::cmd::Cmd;
    ///
    /// enum Message {
    ///     Fetched(String),
    ///     Failed(std::io::Error),
    /// }
    ///
    /// async fn fetch(id: u32) -> std::io::Result<String> {
    ///     Ok(format!("item {id}"))
    /// }
    ///
    /// let cmd = Cmd::of_promise(fetch, 7, Message::Fetched, Message::Failed);
    /// ```
    pub fn of_promise<A, R, E, Fut>(
        task: impl FnOnce(A) -> Fut + Send + 'static,
        arg: A,
        of_success: impl FnOnce(R) -> Msg + Send + 'static,
        of_error: impl FnOnce(E) -> Msg + Send + 'static,
    ) -> Self
    where
        A: Send + 'static,
        R: 'static,
        E: 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        Self::single(move |dispatch: Dispatch<Msg>| {
            let future = task(arg);
            effect::spawn(async move {
                match future.await {
                    Ok(value) => dispatch.send(of_success(value)),
                    Err(error) => dispatch.send(of_error(error)),
                }
            });
        })
    }

    /// Run an infallible future and convert its output to a message.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::cmd::Cmd;
    ///
    /// enum Message {
    ///     Ready(u32),
    /// }
    ///
    /// let cmd = Cmd::perform(async { 42 }, Message::Ready);
    /// ```
    pub fn perform<A>(
        future: impl Future<Output = A> + Send + 'static,
        f: impl FnOnce(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::single(move |dispatch: Dispatch<Msg>| {
            effect::spawn(future.map(move |value| dispatch.send(f(value))));
        })
    }

    /// Dispatch a message for every item of a stream.
    ///
    /// The stream is consumed in the background once the command runs. This is
    /// useful for event sources such as timers or sockets.
    ///
    /// # Examples
    ///
    /// ```
    /// use elmish::cmd::Cmd;
    /// use futures::stream;
    ///
    /// enum Message {
    ///     Number(i32),
    /// }
    ///
    /// let cmd = Cmd::of_stream(stream::iter(vec![1, 2, 3]), Message::Number);
    /// ```
    pub fn of_stream<A>(
        stream: impl Stream<Item = A> + Send + 'static,
        f: impl Fn(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::single(move |dispatch: Dispatch<Msg>| {
            effect::spawn(stream.for_each(move |item| {
                dispatch.send(f(item));
                futures::future::ready(())
            }));
        })
    }

    /// Run every effect once, in order, against `dispatch`.
    ///
    /// The command is consumed, so effects that dispatch synchronously (and in
    /// turn cause new commands) cannot disturb the iteration. Asynchronous work is
    /// started only after the last effect has returned.
    pub fn exec(self, dispatch: &Dispatch<Msg>) {
        let scope = effect::Scope::enter();
        for sub in self.subs {
            sub.run(dispatch.clone());
        }
        scope.start();
    }

    /// Number of effects in this command.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// Whether this command has no effects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}

impl<Msg: Send + 'static> Default for Cmd<Msg> {
    fn default() -> Self {
        Self::none()
    }
}

impl<Msg: Send + 'static> FromIterator<Cmd<Msg>> for Cmd<Msg> {
    fn from_iter<I: IntoIterator<Item = Cmd<Msg>>>(iter: I) -> Self {
        Self::batch(iter)
    }
}

impl<Msg> IntoIterator for Cmd<Msg> {
    type Item = Sub<Msg>;
    type IntoIter = std::vec::IntoIter<Sub<Msg>>;

    fn into_iter(self) -> Self::IntoIter {
        self.subs.into_iter()
    }
}

impl<Msg> fmt::Debug for Cmd<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd").field("subs", &self.subs.len()).finish()
    }
}
