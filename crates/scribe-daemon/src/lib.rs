//! Scribe Daemon
//!
//! The two execution contexts and the channel between them: the interactive
//! [`ForegroundController`], the non-interactive [`BackgroundWriter`] hosted on
//! its own thread, and [`ScribeRuntime`] which wires them from configuration.

pub mod channel;
pub mod controller;
pub mod host;
pub mod logging;
pub mod runtime;
pub mod writer;

pub use channel::{ActiveController, ChannelError, ChannelHandle, ChannelRegistry, Inbox};
pub use controller::{ControllerEvent, ControllerState, ForegroundController};
pub use host::BackgroundHost;
pub use logging::{init_logging, LoggingError};
pub use runtime::{RuntimeError, ScribeRuntime};
pub use writer::{BackgroundWriter, WriteOutcome, WriterSettings};
