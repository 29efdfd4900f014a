use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::numeric::plus;
use crate::models::{SalesOrder, SalesOrderStatus};

const TOP_CUSTOMER_COUNT: usize = 5;
const TREND_MONTHS: u32 = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CustomerRevenue {
    pub customer_id: Uuid,
    pub revenue: Decimal,
    pub order_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub revenue: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RevenueSummary {
    pub total_revenue: Decimal,
    pub completed_orders: usize,
    pub pending_revenue: Decimal,
    pub pending_orders: usize,
    pub average_order_value: Decimal,
    pub orders_by_status: BTreeMap<String, usize>,
    pub top_customers: Vec<CustomerRevenue>,
    /// Oldest month first, ending with the month of `today`.
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

/// `(year, month)` of the month `back` months before the given one.
fn months_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - back as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Revenue figures over a set of orders. Revenue counts completed orders only;
/// pending covers orders that are neither completed nor cancelled.
pub fn revenue_summary(orders: &[SalesOrder], today: NaiveDate) -> RevenueSummary {
    let mut summary = RevenueSummary::default();
    let mut by_customer: HashMap<Uuid, CustomerRevenue> = HashMap::new();
    let mut by_month: HashMap<(i32, u32), Decimal> = HashMap::new();

    for order in orders {
        *summary
            .orders_by_status
            .entry(order.status.to_string())
            .or_insert(0) += 1;

        match order.status {
            SalesOrderStatus::Completed => {
                summary.total_revenue = plus(summary.total_revenue, order.total_amount);
                summary.completed_orders += 1;

                let entry = by_customer
                    .entry(order.customer_id)
                    .or_insert_with(|| CustomerRevenue {
                        customer_id: order.customer_id,
                        revenue: Decimal::ZERO,
                        order_count: 0,
                    });
                entry.revenue = plus(entry.revenue, order.total_amount);
                entry.order_count += 1;

                let month = by_month
                    .entry((order.order_date.year(), order.order_date.month()))
                    .or_insert(Decimal::ZERO);
                *month = plus(*month, order.total_amount);
            }
            SalesOrderStatus::Cancelled => {}
            _ => {
                summary.pending_revenue = plus(summary.pending_revenue, order.total_amount);
                summary.pending_orders += 1;
            }
        }
    }

    if summary.completed_orders > 0 {
        summary.average_order_value =
            summary.total_revenue / Decimal::from(summary.completed_orders as u64);
    }

    let mut top: Vec<CustomerRevenue> = by_customer.into_values().collect();
    top.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(a.customer_id.cmp(&b.customer_id))
    });
    top.truncate(TOP_CUSTOMER_COUNT);
    summary.top_customers = top;

    summary.monthly_revenue = (0..TREND_MONTHS)
        .rev()
        .map(|back| {
            let (year, month) = months_back(today.year(), today.month(), back);
            MonthlyRevenue {
                year,
                month,
                revenue: by_month.get(&(year, month)).copied().unwrap_or(Decimal::ZERO),
            }
        })
        .collect();

    summary
}
