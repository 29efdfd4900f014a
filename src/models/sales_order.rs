use super::customer::Address;
use super::numeric::plus;
use super::quote::{Quote, QuoteLineItem};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SalesOrderStatus {
    #[default]
    PendingProduction,
    InProduction,
    Shipped,
    Completed,
    Cancelled,
}

impl SalesOrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SalesOrderStatus::Completed | SalesOrderStatus::Cancelled)
    }

    /// Forward fulfillment step, or cancellation of an open order.
    pub fn can_transition_to(self, next: SalesOrderStatus) -> bool {
        use SalesOrderStatus::*;
        match (self, next) {
            (from, Cancelled) => !from.is_terminal(),
            (PendingProduction, InProduction) | (InProduction, Shipped) | (Shipped, Completed) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShippingMethod {
    Ground,
    Air,
    Freight,
    Pickup,
    Delivery,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(flatten)]
    pub address: Address,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Shipping fields a caller may set on an existing order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ShippingDetails {
    pub expected_ship_date: Option<NaiveDate>,
    pub actual_ship_date: Option<NaiveDate>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub shipping_method: Option<ShippingMethod>,
    pub shipping_address: Option<ShippingAddress>,
    #[validate(length(max = 100, message = "Tracking number cannot exceed 100 characters"))]
    pub tracking_number: Option<String>,
    #[validate(custom = "validate_shipping_cost")]
    pub shipping_cost: Option<Decimal>,
    #[validate(length(max = 1000, message = "Delivery instructions cannot exceed 1000 characters"))]
    pub delivery_instructions: Option<String>,
}

fn validate_shipping_cost(cost: &Decimal) -> Result<(), ValidationError> {
    if cost.is_sign_negative() && !cost.is_zero() {
        let mut err = ValidationError::new("shipping_cost");
        err.message = Some("shipping_cost must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// A committed order created from an accepted quote.
///
/// Line items and totals are copies of the quote at acceptance and never change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: Uuid,
    pub sales_order_number: String,
    pub quote_id: Uuid,
    pub quote_number: String,
    pub customer_id: Uuid,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub status: SalesOrderStatus,
    pub order_date: NaiveDate,
    #[serde(default)]
    pub expected_ship_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_ship_date: Option<NaiveDate>,
    #[serde(default)]
    pub requested_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub shipping_method: Option<ShippingMethod>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    #[serde(default)]
    pub machines: Vec<QuoteLineItem>,
    #[serde(default)]
    pub parts: Vec<QuoteLineItem>,
    #[serde(default)]
    pub sub_assemblies: Vec<QuoteLineItem>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalesOrder {
    pub fn from_accepted_quote(quote: &Quote, sales_order_number: String, order_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sales_order_number,
            quote_id: quote.id,
            quote_number: quote.quote_number.clone(),
            customer_id: quote.customer_id,
            location_id: quote.location_id.clone(),
            status: SalesOrderStatus::PendingProduction,
            order_date,
            expected_ship_date: None,
            actual_ship_date: None,
            requested_delivery_date: None,
            shipping_method: None,
            shipping_address: None,
            tracking_number: None,
            shipping_cost: Decimal::ZERO,
            delivery_instructions: None,
            machines: quote.machines.clone(),
            parts: quote.parts.clone(),
            sub_assemblies: quote.sub_assemblies.clone(),
            subtotal: quote.subtotal,
            discount_amount: quote.discount_amount,
            tax_amount: quote.tax_amount,
            total_amount: quote.total_amount,
            notes: quote.notes.clone(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Order total plus shipping, for display. `total_amount` itself never includes shipping.
    pub fn grand_total(&self) -> Decimal {
        plus(self.total_amount, self.shipping_cost)
    }

    /// Applies the fields present in `details`; absent fields are left unchanged.
    pub fn apply_shipping(&mut self, details: ShippingDetails) {
        if details.expected_ship_date.is_some() {
            self.expected_ship_date = details.expected_ship_date;
        }
        if details.actual_ship_date.is_some() {
            self.actual_ship_date = details.actual_ship_date;
        }
        if details.requested_delivery_date.is_some() {
            self.requested_delivery_date = details.requested_delivery_date;
        }
        if details.shipping_method.is_some() {
            self.shipping_method = details.shipping_method;
        }
        if details.shipping_address.is_some() {
            self.shipping_address = details.shipping_address;
        }
        if details.tracking_number.is_some() {
            self.tracking_number = details.tracking_number;
        }
        if let Some(cost) = details.shipping_cost {
            self.shipping_cost = cost;
        }
        if details.delivery_instructions.is_some() {
            self.delivery_instructions = details.delivery_instructions;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use SalesOrderStatus::*;

    #[test]
    fn fulfillment_moves_forward_only() {
        assert!(PendingProduction.can_transition_to(InProduction));
        assert!(InProduction.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Completed));
        assert!(!Shipped.can_transition_to(InProduction));
        assert!(!PendingProduction.can_transition_to(Completed));
    }

    #[test]
    fn cancel_only_from_open_orders() {
        assert!(PendingProduction.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn negative_shipping_cost_fails_validation() {
        let details = ShippingDetails {
            shipping_cost: Some(dec!(-5)),
            ..Default::default()
        };
        assert!(details.validate().is_err());
    }

    #[test]
    fn grand_total_adds_shipping_without_touching_total() {
        let quote = Quote::new("Q1", Uuid::new_v4(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        let mut order = SalesOrder::from_accepted_quote(
            &quote,
            "SO-1".into(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        );
        order.total_amount = dec!(972);
        order.apply_shipping(ShippingDetails {
            shipping_cost: Some(dec!(45.50)),
            shipping_method: Some(ShippingMethod::Freight),
            ..Default::default()
        });
        assert_eq!(order.grand_total(), dec!(1017.50));
        assert_eq!(order.total_amount, dec!(972));
        assert_eq!(order.shipping_method, Some(ShippingMethod::Freight));
    }
}
