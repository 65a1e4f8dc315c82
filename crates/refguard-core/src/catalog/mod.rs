//! Schema registry of the row models known to the application.
//!
//! Inference and validation operate over plain table descriptors instead of
//! runtime reflection; the descriptors can be declared statically or read from
//! a live database with [`SchemaRegistry::reflect`].

mod registry;
mod requirement;
mod table;

pub use registry::SchemaRegistry;
pub use requirement::{Requirement, DEFAULT_FOREIGN_KEY_SUFFIX};
pub use table::{ColumnDef, TableDef};
