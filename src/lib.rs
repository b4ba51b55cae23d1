//! # Elmish - Elm Architecture commands for Rust
//!
//! Elmish implements the effect side of the Elm Architecture (TEA): state
//! transitions are plain functions that change the model and return a [`Cmd`]
//! describing side effects, and effects feed new messages back into the loop
//! through a [`Dispatch`] handle.
//!
//! ## Architecture
//!
//! 1. **Model**: Your program state
//! 2. **Message**: Events that can change the state
//! 3. **Update**: Function that processes messages and updates the model
//! 4. **Commands**: Effects to run after an update, which may produce messages
//! 5. **Subscriptions**: Long-lived effects started once the program is running
//!
//! ## Core Components
//!
//! - [`Dispatch`](dispatch::Dispatch): Feeds one message into the loop
//! - [`Sub`](sub::Sub): A pending effect that receives a `Dispatch` when run
//! - [`Cmd`](cmd::Cmd): An ordered list of effects and the combinators that build it
//! - [`Program`](program::Program): The trait that defines your program
//! - [`Runtime`](runtime::Runtime): A headless message loop driving a `Program`
//!
//! ## Example
//!
//! ```rust
//! use elmish::prelude::*;
//! use elmish::testing::Recorder;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Message {
//!     Parsed(i64),
//!     Invalid(String),
//! }
//!
//! fn parse(input: &'static str) -> Result<i64, String> {
//!     input.trim().parse().map_err(|_| format!("not a number: {input}"))
//! }
//!
//! let cmd = Cmd::batch([
//!     Cmd::of_func(parse, "12", Message::Parsed, Message::Invalid),
//!     Cmd::of_func(parse, "x", Message::Parsed, Message::Invalid),
//! ]);
//!
//! let recorder = Recorder::new();
//! cmd.exec(&recorder.dispatch());
//!
//! assert_eq!(
//!     recorder.messages(),
//!     vec![Message::Parsed(12), Message::Invalid("not a number: x".to_string())]
//! );
//! ```
//!
//! ## Design Inspiration
//!
//! The command combinators follow [Elmish](https://elmish.github.io/elmish/)
//! for F#, and the runtime follows [iced](https://github.com/iced-rs/iced).

pub mod cmd;
pub mod dispatch;
mod effect;
pub mod error;
pub mod prelude;
pub mod program;
pub mod runtime;
pub mod sub;
pub mod testing;

pub use cmd::Cmd;
pub use dispatch::Dispatch;
pub use error::{Error, Result};
pub use sub::Sub;
