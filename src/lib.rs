//! # reqbridge
//!
//! ETL bridge turning requirements-management exports into nested `.dsdx`
//! document streams.
//!
//! ## Architecture
//!
//! Two producers feed one consumer:
//!
//! - **Wire path**: a scripting-side exporter connects over TCP and
//!   speaks a pipe-delimited command protocol ([`protocol`]); each
//!   decoded command drives the frame-stack writer.
//! - **Import path**: an HTML export file is walked directly ([`html`])
//!   and drives the same writer.
//!
//! The consumer is the [`stream`] module: a stack-disciplined writer
//! emitting MessagePack records (typed cells, frame markers, embedded
//! sub-streams) to `.dsdx` files.

pub mod config;
pub mod error;
pub mod event;
pub mod html;
pub mod protocol;
pub mod server;
pub mod stream;

pub use config::{EtlConfig, Settings};
pub use error::{EtlError, ProtocolError, Result};
pub use html::HtmlImporter;
pub use protocol::{Command, Decoder, Dispatcher, LengthUnit};
pub use server::Server;
pub use stream::FrameStack;
