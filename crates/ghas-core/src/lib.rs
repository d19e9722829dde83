pub mod backoff;
pub mod commands;
pub mod engine;
pub mod ids;
pub mod languages;
pub mod model;
pub mod notice;
pub mod outcomes;
pub mod policy;
pub mod reconcile;
pub mod status;
pub mod types;
pub mod verdict;
pub mod window;

pub use backoff::*;
pub use commands::*;
pub use engine::*;
pub use ids::*;
pub use languages::*;
pub use model::*;
pub use notice::*;
pub use outcomes::*;
pub use policy::*;
pub use reconcile::*;
pub use status::*;
pub use types::*;
pub use verdict::*;
pub use window::*;
