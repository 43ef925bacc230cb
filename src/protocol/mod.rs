//! Wire protocol - command table, incremental decoder, dispatcher.
//!
//! This module implements the pipe-delimited command protocol spoken by
//! the scripting-side exporter:
//! - static table of 24 commands with typed parameter lists
//! - byte-at-a-time decoder tolerant of arbitrary chunking
//! - dispatcher mapping decoded commands onto FrameStack operations

mod command;
mod decoder;
mod dispatch;

pub use command::{coerce, spec, Command, CommandSpec, ParamKind, Value, MAX_COMMAND, TABLE};
pub use decoder::{Decoder, LengthUnit};
pub use dispatch::Dispatcher;
