//! Response helpers: collection listing headers and item bodies.

use axum::{
    http::{header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";
pub const PAGE_HEADER: &str = "x-page";
pub const PAGE_SIZE_HEADER: &str = "x-page-size";

/// Page actually served, echoed back in headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u64,
    pub size: u64,
}

/// Collection response: JSON array body plus count/page headers.
#[derive(Debug)]
pub struct Listing {
    pub items: Value,
    pub total: u64,
    /// `None` when pagination is disabled; page headers are then omitted.
    pub page: Option<PageInfo>,
}

impl Listing {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(TOTAL_COUNT_HEADER), HeaderValue::from(self.total));
        if let Some(p) = self.page {
            headers.insert(HeaderName::from_static(PAGE_HEADER), HeaderValue::from(p.page));
            headers.insert(HeaderName::from_static(PAGE_SIZE_HEADER), HeaderValue::from(p.size));
        }
        headers
    }
}

impl IntoResponse for Listing {
    fn into_response(self) -> Response {
        let headers = self.headers();
        (StatusCode::OK, headers, Json(self.items)).into_response()
    }
}

pub fn item_ok(item: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(item))
}

pub fn item_created(item: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(item))
}
