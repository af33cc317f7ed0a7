//! Backend abstraction layer
//!
//! Provides the device trait the frame graph drives, the descriptor types it
//! passes to it, recorded command buffers and a headless device.

pub mod command;
pub mod headless;
pub mod traits;
pub mod types;

pub use command::*;
pub use headless::HeadlessDevice;
pub use traits::*;
pub use types::*;
