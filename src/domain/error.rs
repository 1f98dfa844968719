//! Domain Errors
//!
//! Business-rule violations raised by the order state machine.

/// Errors raised when a command's pre-condition is violated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("shop items are required")]
    ShopItemsRequired,

    #[error("invalid delivery address")]
    InvalidDeliveryAddress,

    #[error("order already exists")]
    OrderAlreadyExists,

    #[error("order already paid")]
    AlreadyPaid,

    #[error("order already submitted")]
    AlreadySubmitted,

    #[error("order already canceled")]
    AlreadyCanceled,

    #[error("order already completed")]
    AlreadyCompleted,

    #[error("order not paid")]
    NotPaid,

    #[error("cancel reason is required")]
    CancelReasonRequired,

    #[error("order must be paid before delivery")]
    MustBePaidBeforeDelivered,

    #[error("order not found")]
    OrderNotFound,
}
