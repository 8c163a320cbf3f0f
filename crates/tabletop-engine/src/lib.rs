//! Tabletop engine crate.
//!
//! Renders the fixed table scene through a lifecycle-gated renderer. The
//! platform and GPU plumbing lives in `window`, `device` and `gfx`; the scene
//! itself (geometry, transforms, renderer, lifecycle) in `scene`.

pub mod coords;
pub mod device;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod scene;
pub mod window;
