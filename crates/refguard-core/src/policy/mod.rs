//! Route policies: which routes delete which entity, and which dependents
//! guard it.

mod entity;
mod prefix;
mod registry;

pub use entity::EntityPolicy;
pub use prefix::ServicePrefix;
pub use registry::{PolicyEntry, PolicyRegistry, PolicyRegistryBuilder};
