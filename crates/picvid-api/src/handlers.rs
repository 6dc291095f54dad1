//! Request handlers.

pub mod health;
pub mod slideshow;

pub use health::*;
pub use slideshow::*;
