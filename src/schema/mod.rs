//! Schema metadata, and its translation from SDL.

pub mod meta;
pub mod model;
mod translate;

pub use self::translate::{SchemaBuilder, SchemaError};
