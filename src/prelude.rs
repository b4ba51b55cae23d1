//! Prelude module for convenient imports.
//!
//! ```
//! use elmish::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`Program`] - The main program trait
//! - [`Cmd`] - For describing side effects
//! - [`Dispatch`] - For feeding messages into the loop
//! - [`Sub`] - For hand-written effects
//! - [`Runtime`] and [`RuntimeConfig`] - The message loop

pub use crate::cmd::Cmd;
pub use crate::dispatch::Dispatch;
pub use crate::program::Program;
pub use crate::runtime::{PanicPolicy, Runtime, RuntimeConfig};
pub use crate::sub::Sub;
