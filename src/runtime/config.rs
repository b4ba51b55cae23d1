//! Runtime configuration.

use std::time::Duration;

/// What the runtime does when an effect panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanicPolicy {
    /// Stop the loop and report [`Error::EffectPanicked`](crate::error::Error::EffectPanicked).
    #[default]
    Abort,

    /// Log the panic and continue with the next effect.
    Log,
}

/// Configuration for the message loop.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How many queued messages are processed before yielding to the executor.
    pub batch_size: usize,

    /// Stop [`Runtime::run`](super::Runtime::run) after this long without a message.
    ///
    /// `None` keeps the loop waiting until it is shut down or every
    /// [`Dispatch`](crate::dispatch::Dispatch) handle is gone.
    pub idle_timeout: Option<Duration>,

    /// How panics raised by effects are handled, including panics inside
    /// asynchronous effects.
    pub panic_policy: PanicPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            idle_timeout: None,
            panic_policy: PanicPolicy::Abort,
        }
    }
}

impl RuntimeConfig {
    /// Creates a configuration with every field given explicitly.
    #[must_use]
    pub const fn new(
        batch_size: usize,
        idle_timeout: Option<Duration>,
        panic_policy: PanicPolicy,
    ) -> Self {
        Self {
            batch_size,
            idle_timeout,
            panic_policy,
        }
    }

    /// Sets the batch size. Zero is treated as one.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 { 1 } else { batch_size };
        self
    }

    /// Sets the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    /// Sets the panic policy.
    #[must_use]
    pub const fn with_panic_policy(mut self, panic_policy: PanicPolicy) -> Self {
        self.panic_policy = panic_policy;
        self
    }
}
