pub mod notifier;
pub mod render;

pub use notifier::*;
pub use render::*;
