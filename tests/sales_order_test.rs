//! Sales order fulfillment: status path, shipping and revenue figures.

mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use common::TestEngine;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stateset_quote_engine::{
    errors::ServiceError,
    events::Event,
    models::{SalesOrder, SalesOrderStatus, ShippingDetails, ShippingMethod},
};
use uuid::Uuid;

/// Accepts a one-line quote worth `price` and returns its sales order.
async fn accepted_order(engine: &TestEngine, price: Decimal) -> SalesOrder {
    let customer = engine.seed_customer(None);
    let part = engine.seed_part(&format!("P-{}", Uuid::new_v4()), price, price, 1);
    let quote = engine.quotes.create_quote(customer.id, None).await.unwrap();
    engine.quotes.add_part(quote.id, part.id, dec!(1)).await.unwrap();
    engine.quotes.set_adjustments(quote.id, None, Some(Decimal::ZERO)).await.unwrap();
    engine
        .quotes
        .transition_status(quote.id, "accepted")
        .await
        .unwrap()
        .sales_order
        .expect("sales order")
}

/// Walks a fresh order to `status` along the forward path.
async fn order_in(engine: &TestEngine, status: SalesOrderStatus) -> SalesOrder {
    let order = accepted_order(engine, dec!(100)).await;
    let path: &[&str] = match status {
        SalesOrderStatus::PendingProduction => &[],
        SalesOrderStatus::InProduction => &["in_production"],
        SalesOrderStatus::Shipped => &["in_production", "shipped"],
        SalesOrderStatus::Completed => &["in_production", "shipped", "completed"],
        SalesOrderStatus::Cancelled => &["cancelled"],
    };
    let mut current = order;
    for step in path {
        current = engine.sales_orders.transition_status(current.id, step).await.unwrap();
    }
    current
}

#[rstest]
#[case(SalesOrderStatus::PendingProduction, "in_production", true)]
#[case(SalesOrderStatus::InProduction, "shipped", true)]
#[case(SalesOrderStatus::Shipped, "completed", true)]
#[case(SalesOrderStatus::PendingProduction, "cancelled", true)]
#[case(SalesOrderStatus::Shipped, "cancelled", true)]
#[case(SalesOrderStatus::PendingProduction, "shipped", false)]
#[case(SalesOrderStatus::Shipped, "in_production", false)]
#[case(SalesOrderStatus::Completed, "cancelled", false)]
#[case(SalesOrderStatus::Cancelled, "in_production", false)]
#[tokio::test]
async fn status_transitions(
    #[case] from: SalesOrderStatus,
    #[case] to: &str,
    #[case] allowed: bool,
) {
    let engine = TestEngine::new();
    let order = order_in(&engine, from).await;
    assert_eq!(order.status, from);

    let result = engine.sales_orders.transition_status(order.id, to).await;
    if allowed {
        assert_eq!(result.unwrap().status.to_string(), to);
    } else {
        assert_matches!(result, Err(ServiceError::InvalidTransition { .. }));
        let stored = engine.sales_orders.get(order.id).await.unwrap();
        assert_eq!(stored.status, from);
    }
}

#[tokio::test]
async fn same_status_is_a_no_op() {
    let mut engine = TestEngine::new();
    let order = order_in(&engine, SalesOrderStatus::InProduction).await;
    engine.drain_events();

    let same = engine
        .sales_orders
        .transition_status(order.id, "in_production")
        .await
        .unwrap();
    assert_eq!(same.version, order.version);
    assert!(engine.drain_events().is_empty());
}

#[tokio::test]
async fn unknown_status_and_order_are_rejected() {
    let engine = TestEngine::new();
    let order = accepted_order(&engine, dec!(10)).await;
    assert_matches!(
        engine.sales_orders.transition_status(order.id, "delivered").await,
        Err(ServiceError::InvalidStatus(_))
    );
    assert_matches!(
        engine.sales_orders.transition_status(Uuid::new_v4(), "shipped").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn shipping_cost_is_kept_out_of_total() {
    let mut engine = TestEngine::new();
    let order = accepted_order(&engine, dec!(1000)).await;
    engine.drain_events();

    let updated = engine
        .sales_orders
        .update_shipping(
            order.id,
            ShippingDetails {
                shipping_method: Some(ShippingMethod::Freight),
                tracking_number: Some("1Z999AA10123456784".into()),
                shipping_cost: Some(dec!(85)),
                expected_ship_date: Some(Utc::now().date_naive()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.total_amount, dec!(1000));
    assert_eq!(updated.shipping_cost, dec!(85));
    assert_eq!(updated.grand_total(), dec!(1085));
    assert_eq!(updated.shipping_method, Some(ShippingMethod::Freight));

    // Absent fields leave earlier values in place.
    let again = engine
        .sales_orders
        .update_shipping(
            order.id,
            ShippingDetails {
                delivery_instructions: Some("Dock 4".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(again.tracking_number.as_deref(), Some("1Z999AA10123456784"));
    assert_eq!(again.shipping_cost, dec!(85));

    let events = engine.drain_events();
    assert_eq!(events.len(), 2);
    assert_matches!(&events[0], Event::SalesOrderShippingUpdated { sales_order_id, .. } if *sales_order_id == order.id);
}

#[tokio::test]
async fn negative_shipping_cost_is_rejected() {
    let engine = TestEngine::new();
    let order = accepted_order(&engine, dec!(10)).await;
    let err = engine
        .sales_orders
        .update_shipping(
            order.id,
            ShippingDetails {
                shipping_cost: Some(dec!(-1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(engine.sales_orders.get(order.id).await.unwrap().shipping_cost, Decimal::ZERO);
}

#[tokio::test]
async fn revenue_counts_completed_orders_only() {
    let engine = TestEngine::new();
    let done = order_in(&engine, SalesOrderStatus::Completed).await;
    order_in(&engine, SalesOrderStatus::Shipped).await;
    order_in(&engine, SalesOrderStatus::Cancelled).await;

    let summary = engine
        .sales_orders
        .revenue_summary(Utc::now().date_naive())
        .await
        .unwrap();

    assert_eq!(summary.total_revenue, dec!(100));
    assert_eq!(summary.completed_orders, 1);
    assert_eq!(summary.pending_revenue, dec!(100));
    assert_eq!(summary.pending_orders, 1);
    assert_eq!(summary.average_order_value, dec!(100));
    assert_eq!(summary.orders_by_status.get("cancelled"), Some(&1));
    assert_eq!(summary.top_customers[0].customer_id, done.customer_id);

    let this_month = summary.monthly_revenue.last().unwrap();
    assert_eq!(this_month.revenue, dec!(100));
}
