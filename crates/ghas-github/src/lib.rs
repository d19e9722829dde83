//! REST implementation of the platform seams.

pub mod client;
pub mod codec;
pub mod platform;
mod wire;

pub use client::*;
pub use platform::*;
