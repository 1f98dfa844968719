//! Query handlers
//!
//! CQRS read side: point lookups served from the document store with a
//! rehydration fallback, and full-text search served from the search
//! index.

use crate::aggregate::{is_aggregate_not_found, OrderAggregate};
use crate::api::pagination::{Pagination, PaginationResponse};
use crate::domain::DomainError;
use crate::error::AppError;
use crate::event_store::AggregateStore;
use crate::projection::{OrderDocumentRepository, OrderProjection, OrderSearchRepository};

#[derive(Debug, Clone)]
pub struct GetOrderByIdQuery {
    pub order_id: String,
}

#[derive(Debug, Clone)]
pub struct SearchOrdersQuery {
    pub search_text: String,
    pub pagination: Pagination,
}

/// Search response: one page of projections plus pagination info
#[derive(Debug, serde::Serialize)]
pub struct OrderSearchResponse {
    pub orders: Vec<OrderProjection>,
    pub pagination: PaginationResponse,
}

/// Read-through point lookup.
///
/// The document store acts as a warm cache of the authoritative stream:
/// a miss rehydrates the aggregate and upserts the derived row so
/// subsequent calls are fast.
pub struct GetOrderByIdHandler {
    store: AggregateStore,
    doc_repo: OrderDocumentRepository,
}

impl GetOrderByIdHandler {
    pub fn new(store: AggregateStore, doc_repo: OrderDocumentRepository) -> Self {
        Self { store, doc_repo }
    }

    pub async fn handle(&self, query: GetOrderByIdQuery) -> Result<OrderProjection, AppError> {
        if let Some(projection) = self.doc_repo.get_by_id(&query.order_id).await? {
            return Ok(projection);
        }

        let mut aggregate = OrderAggregate::with_order_id(&query.order_id);
        self.store.load(&mut aggregate).await?;

        if is_aggregate_not_found(&aggregate) {
            return Err(DomainError::OrderNotFound.into());
        }

        let projection = OrderProjection::from(&aggregate);

        // Upsert keeps the race with a concurrent projector insert benign
        self.doc_repo.upsert(&projection).await?;

        Ok(projection)
    }
}

/// Prefix search over shop-item titles and descriptions
pub struct SearchOrdersHandler {
    search_repo: OrderSearchRepository,
}

impl SearchOrdersHandler {
    pub fn new(search_repo: OrderSearchRepository) -> Self {
        Self { search_repo }
    }

    pub async fn handle(&self, query: SearchOrdersQuery) -> Result<OrderSearchResponse, AppError> {
        let (orders, total_count) = self
            .search_repo
            .search(&query.search_text, &query.pagination)
            .await?;

        Ok(OrderSearchResponse {
            orders,
            pagination: query.pagination.response(total_count),
        })
    }
}
