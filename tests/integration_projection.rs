//! Integration tests for projections, subscriptions and queries
//! (require DATABASE_URL)

use std::time::Duration;

use orderflow::aggregate::{Aggregate, OrderAggregate};
use orderflow::domain::{OperationContext, Payment, ShopItem};
use orderflow::event_store::{
    AggregateStore, SubscriptionClient, SubscriptionReply,
};
use orderflow::projection::{
    DocStoreProjection, OrderDocumentRepository, OrderProjection, OrderSearchRepository,
    ProjectionHandler, SearchProjection,
};
use orderflow::queries::{GetOrderByIdHandler, GetOrderByIdQuery, SearchOrdersHandler, SearchOrdersQuery};
use orderflow::api::Pagination;
use rust_decimal_macros::dec;
use uuid::Uuid;

mod common;

const RECV_TIMEOUT: Duration = Duration::from_millis(500);

fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn shop_items(title: &str) -> Vec<ShopItem> {
    vec![ShopItem {
        id: "i1".to_string(),
        title: title.to_string(),
        description: "d".to_string(),
        quantity: 2,
        price: dec!(5.0),
    }]
}

fn payment() -> Payment {
    Payment {
        payment_id: "p1".to_string(),
        timestamp: "2024-01-01T00:00:00Z".parse().unwrap(),
    }
}

/// Build a created+paid aggregate and return its uncommitted events
fn created_and_paid(order_id: &str, title: &str) -> OrderAggregate {
    let ctx = OperationContext::new();
    let mut aggregate = OrderAggregate::with_order_id(order_id);
    aggregate
        .create_order(
            shop_items(title),
            "a@b.c".to_string(),
            "1 X St".to_string(),
            &ctx,
        )
        .unwrap();
    aggregate.pay_order(payment(), &ctx).unwrap();
    aggregate
}

#[tokio::test]
async fn test_doc_projection_is_idempotent() {
    let pool = common::setup_test_db().await;
    let repo = OrderDocumentRepository::new(pool, "order_projections");
    let projection = DocStoreProjection::new(repo.clone(), "unused-group");

    let order_id = unique_id();
    let aggregate = created_and_paid(&order_id, "t");
    let events = aggregate.uncommitted().to_vec();

    // apply every event twice; blind setters must converge to the
    // same row as a single delivery
    for event in &events {
        projection.when(event).await.unwrap();
    }
    let after_once = repo.get_by_id(&order_id).await.unwrap().unwrap();

    for event in &events {
        projection.when(event).await.unwrap();
    }
    let after_twice = repo.get_by_id(&order_id).await.unwrap().unwrap();

    assert_eq!(after_once, after_twice);
    assert_eq!(after_twice.total_price, dec!(10.0));
    assert!(after_twice.paid);
    assert_eq!(
        after_twice.payment.as_ref().map(|p| p.payment_id.as_str()),
        Some("p1")
    );
}

#[tokio::test]
async fn test_subscription_delivery_ack_and_checkpoint() {
    let pool = common::setup_test_db().await;
    let store = AggregateStore::new(pool.clone());
    let client = SubscriptionClient::new(pool);

    let uid = unique_id();
    let group = format!("grp-{uid}");
    let prefix = format!("order-{uid}");

    let mut aggregate = created_and_paid(&uid, "t");
    store.save(&mut aggregate).await.unwrap();

    client.create_group(&group, &prefix).await.unwrap();
    // creating an existing group is ignored
    client.create_group(&group, &prefix).await.unwrap();

    let subscription = client.connect(&group).await.unwrap();

    let first = match tokio::time::timeout(RECV_TIMEOUT, subscription.recv())
        .await
        .expect("first event should be delivered")
    {
        SubscriptionReply::EventAppeared(resolved) => resolved,
        SubscriptionReply::Dropped(reason) => panic!("subscription dropped: {reason}"),
    };
    assert_eq!(first.event.event_type, "ORDER_CREATED");
    assert_eq!(first.event.version, 1);

    // same-stream delivery is serial: the second event is held back
    // until the first is acknowledged
    assert!(
        tokio::time::timeout(RECV_TIMEOUT, subscription.recv())
            .await
            .is_err()
    );

    subscription.ack(&first).await.unwrap();

    let second = match tokio::time::timeout(RECV_TIMEOUT, subscription.recv())
        .await
        .expect("second event should be delivered after ack")
    {
        SubscriptionReply::EventAppeared(resolved) => resolved,
        SubscriptionReply::Dropped(reason) => panic!("subscription dropped: {reason}"),
    };
    assert_eq!(second.event.event_type, "ORDER_PAID");
    subscription.ack(&second).await.unwrap();

    // a fresh connection resumes past the acknowledged checkpoint
    let resumed = client.connect(&group).await.unwrap();
    assert!(tokio::time::timeout(RECV_TIMEOUT, resumed.recv()).await.is_err());
}

#[tokio::test]
async fn test_subscription_nack_redelivers() {
    let pool = common::setup_test_db().await;
    let store = AggregateStore::new(pool.clone());
    let client = SubscriptionClient::new(pool);

    let uid = unique_id();
    let group = format!("grp-{uid}");
    let prefix = format!("order-{uid}");

    let ctx = OperationContext::new();
    let mut aggregate = OrderAggregate::with_order_id(&uid);
    aggregate
        .create_order(shop_items("t"), "a@b.c".to_string(), "1 X St".to_string(), &ctx)
        .unwrap();
    store.save(&mut aggregate).await.unwrap();

    client.create_group(&group, &prefix).await.unwrap();
    let subscription = client.connect(&group).await.unwrap();

    let first = match tokio::time::timeout(RECV_TIMEOUT, subscription.recv()).await.unwrap() {
        SubscriptionReply::EventAppeared(resolved) => resolved,
        SubscriptionReply::Dropped(reason) => panic!("subscription dropped: {reason}"),
    };

    subscription.nack(&first, "handler failed").await.unwrap();

    let redelivered = match tokio::time::timeout(RECV_TIMEOUT, subscription.recv()).await.unwrap() {
        SubscriptionReply::EventAppeared(resolved) => resolved,
        SubscriptionReply::Dropped(reason) => panic!("subscription dropped: {reason}"),
    };
    assert_eq!(redelivered.position, first.position);
    subscription.ack(&redelivered).await.unwrap();
}

#[tokio::test]
async fn test_get_order_by_id_reads_through_to_the_stream() {
    let pool = common::setup_test_db().await;
    let store = AggregateStore::new(pool.clone());
    let doc_repo = OrderDocumentRepository::new(pool, "order_projections");

    let order_id = unique_id();
    let mut aggregate = created_and_paid(&order_id, "t");
    store.save(&mut aggregate).await.unwrap();

    // no projector ran; the doc store has no row yet
    assert!(doc_repo.get_by_id(&order_id).await.unwrap().is_none());

    let handler = GetOrderByIdHandler::new(store, doc_repo.clone());
    let projection = handler
        .handle(GetOrderByIdQuery {
            order_id: order_id.clone(),
        })
        .await
        .unwrap();

    assert_eq!(projection.order_id, order_id);
    assert!(projection.paid);
    assert_eq!(projection.total_price, dec!(10.0));

    // the rehydrated row was written through as a warm cache
    let cached = doc_repo.get_by_id(&order_id).await.unwrap().unwrap();
    assert_eq!(cached, projection);
}

#[tokio::test]
async fn test_search_finds_indexed_orders_with_pagination() {
    let pool = common::setup_test_db().await;
    let search_repo = OrderSearchRepository::new(pool, "order_search");
    let projection = SearchProjection::new(search_repo.clone(), "unused-group");

    let order_id = unique_id();
    let title = format!("widget{}", &order_id[..8]);
    let aggregate = created_and_paid(&order_id, &title);

    for event in aggregate.uncommitted() {
        projection.when(event).await.unwrap();
    }

    let handler = SearchOrdersHandler::new(search_repo);
    let response = handler
        .handle(SearchOrdersQuery {
            search_text: title.clone(),
            pagination: Pagination::new(10, 1),
        })
        .await
        .unwrap();

    assert_eq!(response.pagination.total_count, 1);
    assert_eq!(response.pagination.total_pages, 1);
    assert_eq!(response.pagination.page, 1);
    assert_eq!(response.pagination.size, 10);
    assert!(!response.pagination.has_more);

    assert_eq!(response.orders.len(), 1);
    let found = &response.orders[0];
    assert_eq!(found.order_id, order_id);
    assert!(found.paid);
    assert_eq!(found.shop_items[0].title, title);
}

#[tokio::test]
async fn test_search_matches_phrases_per_field() {
    let pool = common::setup_test_db().await;
    let search_repo = OrderSearchRepository::new(pool, "order_search");

    let order_id = unique_id();
    let u = &order_id[..8];
    let document = OrderProjection {
        order_id: order_id.clone(),
        shop_items: vec![
            ShopItem {
                id: "i1".to_string(),
                title: format!("red{u} hat{u}"),
                description: "plain cotton".to_string(),
                quantity: 1,
                price: dec!(10),
            },
            ShopItem {
                id: "i2".to_string(),
                title: "accessory".to_string(),
                description: format!("blue{u} shirt{u}"),
                quantity: 1,
                price: dec!(5),
            },
        ],
        ..Default::default()
    };
    search_repo.index(&document).await.unwrap();

    let handler = SearchOrdersHandler::new(search_repo);
    let search = |text: String| SearchOrdersQuery {
        search_text: text,
        pagination: Pagination::new(10, 1),
    };

    // words from different fields do not form a phrase
    let response = handler
        .handle(search(format!("red{u} shirt{u}")))
        .await
        .unwrap();
    assert_eq!(response.pagination.total_count, 0);
    assert!(response.orders.is_empty());

    // the trailing term matches as a prefix within one title
    let response = handler.handle(search(format!("red{u} ha"))).await.unwrap();
    assert_eq!(response.pagination.total_count, 1);
    assert_eq!(response.orders[0].order_id, order_id);

    // a phrase inside a description matches at a word boundary
    let response = handler.handle(search(format!("shirt{u}"))).await.unwrap();
    assert_eq!(response.pagination.total_count, 1);

    let response = handler
        .handle(search(format!("blue{u} shirt{u}")))
        .await
        .unwrap();
    assert_eq!(response.pagination.total_count, 1);
}
