use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{SalesOrder, ShippingDetails},
    repositories::SalesOrderRepository,
    services::{
        lifecycle::{parse_sales_order_status, transition_sales_order_status},
        revenue::{revenue_summary, RevenueSummary},
    },
};

const MAX_WRITE_ATTEMPTS: usize = 5;

/// Fulfillment of sales orders created by quote acceptance
#[derive(Clone)]
pub struct SalesOrderService {
    orders: Arc<dyn SalesOrderRepository>,
    event_sender: Option<EventSender>,
}

impl SalesOrderService {
    pub fn new(orders: Arc<dyn SalesOrderRepository>, event_sender: Option<EventSender>) -> Self {
        Self {
            orders,
            event_sender,
        }
    }

    pub async fn get(&self, order_id: Uuid) -> Result<SalesOrder, ServiceError> {
        self.orders
            .get_sales_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sales order {}", order_id)))
    }

    pub async fn list(&self) -> Result<Vec<SalesOrder>, ServiceError> {
        self.orders.list_sales_orders().await
    }

    /// Moves an order along pending_production → in_production → shipped → completed,
    /// or cancels it while it is still open.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn transition_status(
        &self,
        order_id: Uuid,
        new_status: &str,
    ) -> Result<SalesOrder, ServiceError> {
        let status = parse_sales_order_status(new_status)?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let order = self.get(order_id).await?;
            let next = transition_sales_order_status(&order, status)?;
            if next.status == order.status {
                return Ok(order);
            }

            match self.orders.update_sales_order(&next).await {
                Ok(saved) => {
                    info!(
                        "Sales order {} status changed: {} -> {}",
                        saved.sales_order_number, order.status, saved.status
                    );
                    if let Some(sender) = &self.event_sender {
                        sender.send_or_log(Event::SalesOrderStatusChanged {
                            sales_order_id: order_id,
                            old_status: order.status,
                            new_status: saved.status,
                        });
                    }
                    return Ok(saved);
                }
                Err(ServiceError::ConcurrentModification(_)) => {
                    warn!("Sales order {} changed concurrently (attempt {})", order_id, attempt);
                }
                Err(e) => {
                    error!("Failed to update sales order {}: {}", order_id, e);
                    return Err(e);
                }
            }
        }
        Err(ServiceError::ConcurrentModification(order_id))
    }

    /// Sets shipping fields. Shipping cost is kept apart from `total_amount`.
    #[instrument(skip(self, details), fields(order_id = %order_id))]
    pub async fn update_shipping(
        &self,
        order_id: Uuid,
        details: ShippingDetails,
    ) -> Result<SalesOrder, ServiceError> {
        details.validate()?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut order = self.get(order_id).await?;
            order.apply_shipping(details.clone());
            order.updated_at = Utc::now();

            match self.orders.update_sales_order(&order).await {
                Ok(saved) => {
                    info!(
                        "Sales order {} shipping updated (grand total {})",
                        saved.sales_order_number,
                        saved.grand_total()
                    );
                    if let Some(sender) = &self.event_sender {
                        sender.send_or_log(Event::SalesOrderShippingUpdated {
                            sales_order_id: order_id,
                            tracking_number: saved.tracking_number.clone(),
                        });
                    }
                    return Ok(saved);
                }
                Err(ServiceError::ConcurrentModification(_)) => {
                    warn!("Sales order {} changed concurrently (attempt {})", order_id, attempt);
                }
                Err(e) => {
                    error!("Failed to update shipping for sales order {}: {}", order_id, e);
                    return Err(e);
                }
            }
        }
        Err(ServiceError::ConcurrentModification(order_id))
    }

    #[instrument(skip(self))]
    pub async fn revenue_summary(&self, today: NaiveDate) -> Result<RevenueSummary, ServiceError> {
        let orders = self.orders.list_sales_orders().await?;
        Ok(revenue_summary(&orders, today))
    }
}
