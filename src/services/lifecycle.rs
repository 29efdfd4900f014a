//! Quote and sales-order state machines.
//!
//! These functions decide transitions and build the resulting records; they never
//! touch storage. `QuoteService` and `SalesOrderService` persist what they return.

use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::errors::ServiceError;
use crate::models::{Quote, QuoteStatus, SalesOrder, SalesOrderStatus};

/// Derives sales order numbers from quote numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderNumbering {
    pub quote_prefix: String,
    pub sales_order_prefix: String,
}

impl OrderNumbering {
    pub fn new(quote_prefix: impl Into<String>, sales_order_prefix: impl Into<String>) -> Self {
        Self {
            quote_prefix: quote_prefix.into(),
            sales_order_prefix: sales_order_prefix.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.quote_number_prefix, &config.sales_order_prefix)
    }

    /// `Q1700000000000` becomes `SO-1700000000000` with the default prefixes.
    pub fn sales_order_number(&self, quote_number: &str) -> String {
        format!(
            "{}{}",
            self.sales_order_prefix,
            quote_number.replacen(&self.quote_prefix, "", 1)
        )
    }
}

impl Default for OrderNumbering {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteTransition {
    pub quote: Quote,
    /// Set only when this transition accepted the quote and no order existed for it.
    pub sales_order: Option<SalesOrder>,
}

pub fn parse_quote_status(status: &str) -> Result<QuoteStatus, ServiceError> {
    QuoteStatus::from_str(status.trim()).map_err(|_| {
        ServiceError::InvalidStatus(format!(
            "'{}' is not a quote status (draft, sent, accepted, rejected, expired)",
            status
        ))
    })
}

pub fn parse_sales_order_status(status: &str) -> Result<SalesOrderStatus, ServiceError> {
    SalesOrderStatus::from_str(status.trim()).map_err(|_| {
        ServiceError::InvalidStatus(format!(
            "'{}' is not a sales order status (pending_production, in_production, shipped, completed, cancelled)",
            status
        ))
    })
}

/// Moves a quote to `new_status`.
///
/// Quotes may move freely between the five statuses. Accepting reprices the quote and,
/// when `order_exists` is false, builds the sales order from the repriced copy. Accepting
/// an already accepted quote is an error.
pub fn transition_quote_status(
    quote: &Quote,
    new_status: QuoteStatus,
    order_exists: bool,
    numbering: &OrderNumbering,
    today: NaiveDate,
) -> Result<QuoteTransition, ServiceError> {
    if quote.status == QuoteStatus::Accepted && new_status == QuoteStatus::Accepted {
        return Err(ServiceError::AlreadyAccepted(quote.quote_number.clone()));
    }

    let mut next = quote.clone();
    if new_status == QuoteStatus::Accepted {
        next.reprice()?;
    }
    next.status = new_status;
    next.updated_at = Utc::now();

    let sales_order = (new_status == QuoteStatus::Accepted && !order_exists).then(|| {
        SalesOrder::from_accepted_quote(
            &next,
            numbering.sales_order_number(&next.quote_number),
            today,
        )
    });

    Ok(QuoteTransition {
        quote: next,
        sales_order,
    })
}

/// Moves a sales order along its fulfillment path. A transition to the current status
/// is a no-op.
pub fn transition_sales_order_status(
    order: &SalesOrder,
    new_status: SalesOrderStatus,
) -> Result<SalesOrder, ServiceError> {
    if order.status == new_status {
        return Ok(order.clone());
    }
    if !order.status.can_transition_to(new_status) {
        return Err(ServiceError::InvalidTransition {
            from: order.status.to_string(),
            to: new_status.to_string(),
        });
    }

    let mut next = order.clone();
    next.status = new_status;
    next.updated_at = Utc::now();
    Ok(next)
}
