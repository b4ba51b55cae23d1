//! The message loop.
//!
//! [`Runtime`] is a headless adapter for a [`Program`]: it owns the model, feeds
//! dispatched messages through [`Program::update`] one at a time, and runs every
//! effect of the resulting [`Cmd`] after the new state has been committed.

pub mod config;

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, trace_span};

pub use config::{PanicPolicy, RuntimeConfig};

use crate::{
    cmd::Cmd,
    dispatch::Dispatch,
    effect,
    error::{Error, Result},
    program::Program,
};

/// Drives a [`Program`].
///
/// Messages are queued by [`Dispatch`] handles obtained from
/// [`dispatcher`](Runtime::dispatcher) (and handed to every effect), then processed
/// in arrival order. Dispatching only enqueues, so it is safe from any thread and
/// from inside an effect that is still running.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use elmish::prelude::*;
///
/// struct Counter {
///     count: u32,
/// }
///
/// impl Program for Counter {
///     type Message = u32;
///     type Flags = ();
///
///     fn init(_: ()) -> (Self, Cmd<u32>) {
///         (Counter { count: 0 }, Cmd::batch([Cmd::of_msg(1), Cmd::of_msg(2)]))
///     }
///
///     fn update(&mut self, n: u32) -> Cmd<u32> {
///         self.count += n;
///         Cmd::none()
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> elmish::Result<()> {
/// let config = RuntimeConfig::default().with_idle_timeout(Duration::from_millis(10));
/// let counter = Runtime::<Counter>::with_config((), config).run().await?;
/// assert_eq!(counter.count, 3);
/// # Ok(())
/// # }
/// ```
pub struct Runtime<P: Program> {
    program: P,
    init: Option<Cmd<P::Message>>,
    // Keeps the queue open; released while `run` waits for the next message.
    dispatch: Option<Dispatch<P::Message>>,
    tx: mpsc::WeakUnboundedSender<P::Message>,
    rx: mpsc::UnboundedReceiver<P::Message>,
    panic_tx: mpsc::UnboundedSender<String>,
    panic_rx: mpsc::UnboundedReceiver<String>,
    token: CancellationToken,
    config: RuntimeConfig,
    processed: u64,
}

impl<P: Program> Runtime<P> {
    /// Initialize the program with the default configuration.
    ///
    /// The init command is held until [`start`](Runtime::start) or
    /// [`run`](Runtime::run).
    pub fn new(flags: P::Flags) -> Self {
        Self::with_config(flags, RuntimeConfig::default())
    }

    pub fn with_config(flags: P::Flags, config: RuntimeConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (panic_tx, panic_rx) = mpsc::unbounded_channel();
        let (program, init) = P::init(flags);

        Self {
            program,
            init: Some(init),
            tx: tx.downgrade(),
            dispatch: Some(Dispatch::from_sender(tx)),
            rx,
            panic_tx,
            panic_rx,
            token: CancellationToken::new(),
            config,
            processed: 0,
        }
    }

    /// A handle that queues messages for this runtime.
    ///
    /// While waiting, [`run`](Runtime::run) keeps going as long as some handle is
    /// alive, including the ones held by pending effects. Messages sent after the
    /// runtime has been dropped are discarded.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatch<P::Message> {
        match &self.dispatch {
            Some(dispatch) => dispatch.clone(),
            None => Dispatch::from_weak(self.tx.clone()),
        }
    }

    /// A token that stops [`run`](Runtime::run) when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// The current model.
    #[must_use]
    pub fn program(&self) -> &P {
        &self.program
    }

    /// Number of messages processed so far.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Commit the initial model, then run the init command and the subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] on a second call, or
    /// [`Error::EffectPanicked`] if an effect panics under [`PanicPolicy::Abort`].
    pub fn start(&mut self) -> Result<()> {
        let init = self.init.take().ok_or(Error::AlreadyStarted)?;
        info!(effects = init.len(), "starting runtime");

        let dispatch = self.open_dispatch();
        self.program.view(&dispatch);
        self.exec(init, &dispatch)?;

        let subscriptions = self.program.subscribe();
        self.exec(subscriptions, &dispatch)
    }

    /// Process queued messages without waiting, up to the configured batch size.
    ///
    /// Starts the runtime first if needed, and applies the panic policy to
    /// asynchronous effects that panicked since the last call. Returns the number
    /// of messages processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EffectPanicked`] if an effect panics under [`PanicPolicy::Abort`].
    pub fn process_pending(&mut self) -> Result<usize> {
        self.ensure_started()?;
        self.drain_panics()?;

        let mut count = 0;
        while count < self.config.batch_size.max(1) {
            let Ok(msg) = self.rx.try_recv() else {
                break;
            };
            self.transition(msg)?;
            count += 1;
        }

        Ok(count)
    }

    /// Run the loop until shut down, closed or idle, and return the final model.
    ///
    /// The loop ends when the [`shutdown_token`](Runtime::shutdown_token) is
    /// cancelled, when no [`Dispatch`] handle is left to send another message, or
    /// when [`RuntimeConfig::idle_timeout`] elapses without a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EffectPanicked`] if an effect panics under [`PanicPolicy::Abort`].
    pub async fn run(mut self) -> Result<P> {
        self.ensure_started()?;

        loop {
            // Only outside handles and pending effects keep the queue open now.
            self.dispatch = None;

            let msg = tokio::select! {
                biased;
                () = self.token.cancelled() => {
                    debug!("shutdown requested");
                    break;
                }
                Some(message) = self.panic_rx.recv() => {
                    self.effect_panicked(message)?;
                    continue;
                }
                msg = next_message(&mut self.rx, self.config.idle_timeout) => msg,
            };

            let Some(msg) = msg else {
                break;
            };

            self.transition(msg)?;
            self.process_pending()?;

            tokio::task::yield_now().await;
        }

        self.drain_panics()?;
        info!(processed = self.processed, "runtime stopped");
        Ok(self.program)
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.init.is_some() {
            self.start()?;
        }
        Ok(())
    }

    fn open_dispatch(&mut self) -> Dispatch<P::Message> {
        if let Some(dispatch) = &self.dispatch {
            return dispatch.clone();
        }

        let tx = match self.tx.upgrade() {
            Some(tx) => tx,
            None => {
                // Every handle is gone: reopen the queue behind what is still buffered.
                trace!("reopening message queue");
                let (tx, rx) = mpsc::unbounded_channel();
                let mut closed = std::mem::replace(&mut self.rx, rx);
                while let Ok(msg) = closed.try_recv() {
                    let _ = tx.send(msg);
                }
                self.tx = tx.downgrade();
                tx
            }
        };

        let dispatch = Dispatch::from_sender(tx);
        self.dispatch = Some(dispatch.clone());
        dispatch
    }

    fn transition(&mut self, msg: P::Message) -> Result<()> {
        self.processed += 1;
        let span = trace_span!("transition", seq = self.processed);
        let _enter = span.enter();

        let dispatch = self.open_dispatch();
        let cmd = self.program.update(msg);
        self.program.view(&dispatch);

        trace!(effects = cmd.len(), "state committed");
        self.exec(cmd, &dispatch)
    }

    fn exec(&self, cmd: Cmd<P::Message>, dispatch: &Dispatch<P::Message>) -> Result<()> {
        let scope = effect::Scope::enter();

        for sub in cmd {
            let dispatch = dispatch.clone();
            let Err(payload) = catch_unwind(AssertUnwindSafe(move || sub.run(dispatch))) else {
                continue;
            };
            self.effect_panicked(panic_message(payload.as_ref()))?;
        }

        for task in scope.finish() {
            let panics = self.panic_tx.clone();
            effect::spawn_detached(async move {
                if let Err(payload) = AssertUnwindSafe(task).catch_unwind().await {
                    let _ = panics.send(panic_message(payload.as_ref()));
                }
            });
        }

        Ok(())
    }

    fn drain_panics(&mut self) -> Result<()> {
        while let Ok(message) = self.panic_rx.try_recv() {
            self.effect_panicked(message)?;
        }
        Ok(())
    }

    fn effect_panicked(&self, message: String) -> Result<()> {
        match self.config.panic_policy {
            PanicPolicy::Abort => {
                error!(%message, "effect panicked; stopping runtime");
                Err(Error::EffectPanicked { message })
            }
            PanicPolicy::Log => {
                error!(%message, "effect panicked");
                Ok(())
            }
        }
    }
}

async fn next_message<Msg>(
    rx: &mut mpsc::UnboundedReceiver<Msg>,
    idle_timeout: Option<Duration>,
) -> Option<Msg> {
    let Some(idle_timeout) = idle_timeout else {
        return rx.recv().await;
    };

    match timeout(idle_timeout, rx.recv()).await {
        Ok(msg) => msg,
        Err(_) => {
            debug!(?idle_timeout, "no messages; going idle");
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sub::Sub;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Message {
        Increment,
        Check,
        Chain(u32),
        Panic,
        Noop,
    }

    struct Tracker {
        count: u32,
        checks: Vec<u32>,
        chain: Vec<u32>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Program for Tracker {
        type Message = Message;
        type Flags = (Arc<Mutex<Vec<String>>>, Cmd<Message>);

        fn init((log, cmd): Self::Flags) -> (Self, Cmd<Message>) {
            log.lock().push("init".to_string());
            (
                Tracker {
                    count: 0,
                    checks: vec![],
                    chain: vec![],
                    log,
                },
                cmd,
            )
        }

        fn update(&mut self, msg: Message) -> Cmd<Message> {
            self.log.lock().push(format!("update {msg:?}"));
            match msg {
                Message::Increment => {
                    self.count += 1;
                    Cmd::of_msg(Message::Check)
                }
                Message::Check => {
                    self.checks.push(self.count);
                    Cmd::none()
                }
                Message::Chain(n) => {
                    self.chain.push(n);
                    if n < 3 {
                        Cmd::batch([Cmd::of_msg(Message::Chain(n + 1)), Cmd::of_msg(Message::Noop)])
                    } else {
                        Cmd::none()
                    }
                }
                Message::Panic => Cmd::batch([
                    Cmd::of_sub(Sub::new(|_: Dispatch<Message>| panic!("boom"))),
                    Cmd::of_msg(Message::Increment),
                ]),
                Message::Noop => Cmd::none(),
            }
        }

        fn subscribe(&self) -> Cmd<Message> {
            let log = Arc::clone(&self.log);
            Cmd::of_sub(Sub::new(move |_: Dispatch<Message>| {
                log.lock().push("subscribe".to_string());
            }))
        }

        fn view(&self, _dispatch: &Dispatch<Message>) {
            self.log.lock().push(format!("view {}", self.count));
        }
    }

    fn tracker(init: Cmd<Message>) -> (Runtime<Tracker>, Arc<Mutex<Vec<String>>>) {
        tracker_with_config(init, RuntimeConfig::default())
    }

    fn tracker_with_config(
        init: Cmd<Message>,
        config: RuntimeConfig,
    ) -> (Runtime<Tracker>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let runtime = Runtime::<Tracker>::with_config((Arc::clone(&log), init), config);
        (runtime, log)
    }

    #[test]
    fn test_new_defers_init_command() {
        let (runtime, log) = tracker(Cmd::of_msg(Message::Increment));

        assert_eq!(*log.lock(), vec!["init"]);
        assert_eq!(runtime.processed(), 0);
        assert_eq!(runtime.program().count, 0);
    }

    #[test]
    fn test_start_order() {
        let init = Cmd::of_sub(Sub::new(|dispatch: Dispatch<Message>| {
            dispatch.send(Message::Increment);
        }));
        let (mut runtime, log) = tracker(init);

        runtime.start().expect("start should succeed");

        // The init command only enqueues; subscribe runs after it.
        assert_eq!(*log.lock(), vec!["init", "view 0", "subscribe"]);
        assert_eq!(runtime.program().count, 0);
    }

    #[test]
    fn test_start_twice() {
        let (mut runtime, _log) = tracker(Cmd::none());

        runtime.start().expect("first start should succeed");
        assert!(matches!(runtime.start(), Err(Error::AlreadyStarted)));
    }

    #[test]
    fn test_process_pending_starts_runtime() {
        let (mut runtime, _log) = tracker(Cmd::of_msg(Message::Increment));

        let processed = runtime.process_pending().expect("should process");

        // Increment, then the Check it dispatched
        assert_eq!(processed, 2);
        assert_eq!(runtime.program().count, 1);
    }

    #[test]
    fn test_effects_observe_committed_state() {
        let (mut runtime, log) = tracker(Cmd::none());
        let dispatch = runtime.dispatcher();

        dispatch.send(Message::Increment);
        runtime.process_pending().expect("should process");
        dispatch.send(Message::Increment);
        runtime.process_pending().expect("should process");

        assert_eq!(runtime.program().checks, vec![1, 2]);

        let log = log.lock();
        let first_update = log
            .iter()
            .position(|entry| entry == "update Increment")
            .expect("increment should be logged");
        assert_eq!(log[first_update + 1], "view 1");
    }

    #[test]
    fn test_reentrant_dispatch_is_queued() {
        let (mut runtime, _log) = tracker(Cmd::of_msg(Message::Chain(0)));

        while runtime.process_pending().expect("should process") > 0 {}

        assert_eq!(runtime.program().chain, vec![0, 1, 2, 3]);
        assert_eq!(runtime.processed(), 7);
    }

    #[test]
    fn test_batch_size_limits_processing() {
        let config = RuntimeConfig::default().with_batch_size(2);
        let (mut runtime, _log) = tracker_with_config(Cmd::none(), config);
        let dispatch = runtime.dispatcher();

        for _ in 0..5 {
            dispatch.send(Message::Noop);
        }

        assert_eq!(runtime.process_pending().expect("should process"), 2);
        assert_eq!(runtime.process_pending().expect("should process"), 2);
        assert_eq!(runtime.process_pending().expect("should process"), 1);
        assert_eq!(runtime.process_pending().expect("should process"), 0);
    }

    #[test]
    fn test_panic_aborts_by_default() {
        let (mut runtime, _log) = tracker(Cmd::of_msg(Message::Panic));

        let result = runtime.process_pending();

        match result {
            Err(Error::EffectPanicked { message }) => assert_eq!(message, "boom"),
            other => panic!("expected EffectPanicked, got {other:?}"),
        }
        // The effect after the panicking one never ran.
        assert_eq!(runtime.process_pending().expect("queue is empty"), 0);
        assert_eq!(runtime.program().count, 0);
    }

    #[test]
    fn test_panic_logged_and_skipped() {
        let config = RuntimeConfig::default().with_panic_policy(PanicPolicy::Log);
        let (mut runtime, _log) = tracker_with_config(Cmd::of_msg(Message::Panic), config);

        runtime.process_pending().expect("panic should be contained");

        assert_eq!(runtime.program().count, 1);
        assert_eq!(runtime.program().checks, vec![1]);
    }

    #[test]
    fn test_dispatch_after_drop() {
        let (runtime, _log) = tracker(Cmd::none());
        let dispatch = runtime.dispatcher();
        drop(runtime);

        // Must not panic
        dispatch.send(Message::Increment);
    }

    #[test]
    fn test_queue_reopens_behind_buffered_messages() {
        let (mut runtime, _log) = tracker(Cmd::none());
        let dispatch = runtime.dispatcher();
        dispatch.send(Message::Chain(0));
        dispatch.send(Message::Noop);

        // Close the queue with both messages still buffered
        drop(dispatch);
        runtime.dispatch = None;

        while runtime.process_pending().expect("should process") > 0 {}

        assert_eq!(runtime.program().chain, vec![0, 1, 2, 3]);
        assert_eq!(runtime.processed(), 8);
    }

    #[tokio::test]
    async fn test_process_pending_reports_async_panic() {
        let init = Cmd::perform(async {}, |()| -> Message { panic!("late boom") });
        let (mut runtime, _log) = tracker(init);

        runtime.start().expect("start should succeed");
        tokio::time::sleep(Duration::from_millis(10)).await;

        match runtime.process_pending() {
            Err(Error::EffectPanicked { message }) => assert_eq!(message, "late boom"),
            other => panic!("expected EffectPanicked, got {other:?}"),
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new("owned".to_string());
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[tokio::test]
    async fn test_run_until_idle() {
        let config = RuntimeConfig::default().with_idle_timeout(Duration::from_millis(20));
        let (runtime, _log) = tracker_with_config(Cmd::of_msg(Message::Increment), config);

        let tracker = runtime.run().await.expect("run should succeed");

        assert_eq!(tracker.count, 1);
        assert_eq!(tracker.checks, vec![1]);
    }

    #[tokio::test]
    async fn test_run_ends_when_queue_closes() {
        let (runtime, _log) = tracker(Cmd::of_msg(Message::Increment));

        let tracker = timeout(Duration::from_secs(1), runtime.run())
            .await
            .expect("run should end once no handle is left")
            .expect("run should succeed");

        assert_eq!(tracker.checks, vec![1]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (runtime, _log) = tracker(Cmd::none());
        let token = runtime.shutdown_token();
        token.cancel();

        let result = timeout(Duration::from_secs(1), runtime.run()).await;
        assert!(result.is_ok(), "run should stop once cancelled");
    }
}
