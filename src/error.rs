use thiserror::Error;

/// Errors reported by the [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Error)]
pub enum Error {
    /// The runtime has already committed its initial state and run the init command.
    #[error("runtime already started")]
    AlreadyStarted,

    /// An effect panicked while running and the panic policy is
    /// [`PanicPolicy::Abort`](crate::runtime::PanicPolicy::Abort).
    #[error("effect panicked: {message}")]
    EffectPanicked { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
