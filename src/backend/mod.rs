//! Backend abstraction layer
//!
//! Capability traits render backends implement, plus the in-memory
//! reference backend.

mod reference;
mod traits;

pub use reference::*;
pub use traits::*;
