//! API module
//!
//! HTTP surface of the order service.

pub mod dto;
pub mod middleware;
pub mod pagination;
pub mod routes;

pub use pagination::Pagination;
pub use routes::create_router;

use crate::event_store::AggregateStore;
use crate::projection::{OrderDocumentRepository, OrderSearchRepository};

/// Shared state handed to every route handler
#[derive(Clone)]
pub struct AppState {
    pub store: AggregateStore,
    pub doc_repo: OrderDocumentRepository,
    pub search_repo: OrderSearchRepository,
}
