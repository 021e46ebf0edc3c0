//! Resource router: convention-driven REST routes for data models.
//!
//! Each declared model gets `GET/POST /{collection}` and `GET/PUT/DELETE /{collection}/:identifier`,
//! plus ten before/after hook setters named from the resource (`beforeGetBooks`, `afterCreateBook`, ...).

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod model;
pub mod response;
pub mod router;
pub mod routes;
pub mod sql;
pub mod state;

pub use config::{
    normalize, options_from_env, Pagination, Resource, ResourceConfig, ResourceDescriptor, RouterConfig,
    RouterOptions, DEFAULT_ITEMS_PER_PAGE,
};
pub use error::{AppError, ConfigError};
pub use hooks::{HookContext, HookRegistrar, Operation, Phase, ResourceHooks};
pub use model::{Criteria, FetchQuery, MemoryModel, Model, PgModel};
pub use router::{init, ResourceRouter};
pub use sql::{IncludeDirection, TableSpec};
pub use state::ResourceState;
