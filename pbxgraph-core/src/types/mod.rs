//! Project document entity types
//!
//! Every entity of the project document lives in the node store as an [`Object`]
//! addressed by an [`ObjectId`]. Links between entities are ids, never embedded
//! values, so the same entity can be reached from several directions.

mod file_type;
mod id;
mod objects;
mod package;
mod phase;
mod platform;
mod product;
mod settings;

pub use file_type::*;
pub use id::*;
pub use objects::*;
pub use package::*;
pub use phase::*;
pub use platform::*;
pub use product::*;
pub use settings::*;
