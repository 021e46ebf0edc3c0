//! HTTP handlers for generated resource endpoints.

pub mod resource;
pub use resource::*;
