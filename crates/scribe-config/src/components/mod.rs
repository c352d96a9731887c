//! Configuration sections, one per component.

pub mod channel;
pub mod logging;
pub mod picker;
pub mod store;
pub mod trigger;
pub mod writer;

pub use channel::*;
pub use logging::*;
pub use picker::*;
pub use store::*;
pub use trigger::*;
pub use writer::*;
