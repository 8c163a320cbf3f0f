//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the window, and translates platform events
//! into lifecycle signals for the scene controller.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
