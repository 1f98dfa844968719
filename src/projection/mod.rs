//! Projection module
//!
//! Read models and the projector runtime that keeps them up to date
//! from the event feed.

pub mod doc_projection;
pub mod doc_store;
pub mod error;
pub mod order_projection;
pub mod projector;
pub mod search_projection;
pub mod search_store;

pub use doc_projection::DocStoreProjection;
pub use doc_store::OrderDocumentRepository;
pub use error::ProjectionError;
pub use order_projection::OrderProjection;
pub use projector::{ProjectionHandler, Projector, ProjectorError};
pub use search_projection::SearchProjection;
pub use search_store::OrderSearchRepository;
