//! Route tables for generated resources.

mod resource;
pub use resource::resource_routes;
