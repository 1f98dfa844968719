//! API Routes
//!
//! HTTP endpoint definitions for the order service.

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{OperationContext, Payment};
use crate::error::AppError;
use crate::handlers::{
    CancelOrderCommand, CancelOrderHandler, ChangeDeliveryAddressCommand,
    ChangeDeliveryAddressHandler, CompleteOrderCommand, CompleteOrderHandler, CreateOrderCommand,
    CreateOrderHandler, PayOrderCommand, PayOrderHandler, SubmitOrderCommand, SubmitOrderHandler,
    UpdateShoppingCartCommand, UpdateShoppingCartHandler,
};
use crate::projection::OrderProjection;
use crate::queries::{
    GetOrderByIdHandler, GetOrderByIdQuery, OrderSearchResponse, SearchOrdersHandler,
    SearchOrdersQuery,
};

use super::dto::{
    CancelOrderRequest, ChangeDeliveryAddressRequest, CreateOrderRequest, PayOrderRequest,
    SearchParams, UpdateShoppingCartRequest,
};
use super::pagination::Pagination;
use super::AppState;

/// Order routes, mounted under the configured base path
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/pay/:id", put(pay_order))
        .route("/submit/:id", put(submit_order))
        .route("/cart/:id", put(update_shopping_cart))
        .route("/cancel/:id", post(cancel_order))
        .route("/complete/:id", post(complete_order))
        .route("/address/:id", put(change_delivery_address))
        .route("/search", get(search_orders))
        .route("/:id", get(get_order_by_id))
}

/// POST / - create an order, returns its id
async fn create_order(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<String>), AppError> {
    request.validate()?;

    let order_id = Uuid::new_v4().to_string();
    let command = CreateOrderCommand {
        order_id: order_id.clone(),
        shop_items: request.shop_items,
        account_email: request.account_email,
        delivery_address: request.delivery_address,
    };

    CreateOrderHandler::new(state.store.clone())
        .execute(command, &context)
        .await?;

    Ok((StatusCode::CREATED, Json(order_id)))
}

/// PUT /pay/:id
async fn pay_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<PayOrderRequest>,
) -> Result<Json<String>, AppError> {
    request.validate()?;

    let command = PayOrderCommand {
        order_id: order_id.clone(),
        payment: Payment {
            payment_id: request.payment_id,
            timestamp: request.timestamp,
        },
    };

    PayOrderHandler::new(state.store.clone())
        .execute(command, &context)
        .await?;

    Ok(Json(order_id))
}

/// PUT /submit/:id
async fn submit_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<String>, AppError> {
    let command = SubmitOrderCommand {
        order_id: order_id.clone(),
    };

    SubmitOrderHandler::new(state.store.clone())
        .execute(command, &context)
        .await?;

    Ok(Json(order_id))
}

/// PUT /cart/:id
async fn update_shopping_cart(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<UpdateShoppingCartRequest>,
) -> Result<Json<String>, AppError> {
    request.validate()?;

    let command = UpdateShoppingCartCommand {
        order_id: order_id.clone(),
        shop_items: request.shop_items,
    };

    UpdateShoppingCartHandler::new(state.store.clone())
        .execute(command, &context)
        .await?;

    Ok(Json(order_id))
}

/// POST /cancel/:id
async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<String>, AppError> {
    let command = CancelOrderCommand {
        order_id: order_id.clone(),
        cancel_reason: request.cancel_reason,
    };

    CancelOrderHandler::new(state.store.clone())
        .execute(command, &context)
        .await?;

    Ok(Json(order_id))
}

/// POST /complete/:id - the server stamps the delivery time
async fn complete_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<String>, AppError> {
    let command = CompleteOrderCommand {
        order_id: order_id.clone(),
        delivery_timestamp: Utc::now(),
    };

    CompleteOrderHandler::new(state.store.clone())
        .execute(command, &context)
        .await?;

    Ok(Json(order_id))
}

/// PUT /address/:id
async fn change_delivery_address(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<ChangeDeliveryAddressRequest>,
) -> Result<Json<String>, AppError> {
    let command = ChangeDeliveryAddressCommand {
        order_id: order_id.clone(),
        delivery_address: request.delivery_address,
    };

    ChangeDeliveryAddressHandler::new(state.store.clone())
        .execute(command, &context)
        .await?;

    Ok(Json(order_id))
}

/// GET /:id - read the projection, falling back to rehydration
async fn get_order_by_id(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderProjection>, AppError> {
    let projection = GetOrderByIdHandler::new(state.store.clone(), state.doc_repo.clone())
        .handle(GetOrderByIdQuery { order_id })
        .await?;

    Ok(Json(projection))
}

/// GET /search?search=&page=&size=
async fn search_orders(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<OrderSearchResponse>, AppError> {
    let query = SearchOrdersQuery {
        search_text: params.search,
        pagination: Pagination::from_params(params.size, params.page),
    };

    let response = SearchOrdersHandler::new(state.search_repo.clone())
        .handle(query)
        .await?;

    Ok(Json(response))
}
