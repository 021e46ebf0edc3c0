//! Per-resource handler state. Each generated sub-router owns one.

use crate::config::{Pagination, Resource};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ResourceState {
    pub resource: Arc<Resource>,
    /// Copied from the router config at `init`; never changes afterwards.
    pub pagination: Pagination,
}
