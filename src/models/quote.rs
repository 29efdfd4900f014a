use super::numeric::{checked_quantity, is_negative, lenient, non_negative};
use super::UpsertOutcome;
use crate::errors::ServiceError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

/// Which of the three line lists a quote line lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuoteLineKind {
    Machine,
    Part,
    SubAssembly,
}

/// A priced line on a quote or sales order.
///
/// `unit_price` is the catalog selling price at the time the line was added.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    #[serde(alias = "machine_id", alias = "part_id", alias = "sub_assembly_id")]
    pub item_id: Uuid,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_number: String,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
}

impl QuoteLineItem {
    pub fn new(
        item_id: Uuid,
        item_name: impl Into<String>,
        item_number: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            item_id,
            item_name: item_name.into(),
            item_number: item_number.into(),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            discount_percent: Some(Decimal::ZERO),
            total_price: None,
        }
    }

    pub fn check(&self) -> Result<(), ServiceError> {
        if is_negative(self.quantity) || is_negative(self.unit_price) {
            return Err(ServiceError::ValidationError(format!(
                "line '{}' has a negative quantity or unit price",
                self.item_number
            )));
        }
        if is_negative(self.discount_percent)
            || non_negative(self.discount_percent) > Decimal::ONE_HUNDRED
        {
            return Err(ServiceError::ValidationError(format!(
                "line '{}' discount_percent must be between 0 and 100",
                self.item_number
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub quote_number: String,
    pub customer_id: Uuid,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub status: QuoteStatus,
    pub valid_until: NaiveDate,
    #[serde(default)]
    pub sent_date: Option<NaiveDate>,
    #[serde(default)]
    pub machines: Vec<QuoteLineItem>,
    #[serde(default)]
    pub parts: Vec<QuoteLineItem>,
    #[serde(default)]
    pub sub_assemblies: Vec<QuoteLineItem>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,
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

impl Quote {
    pub fn new(quote_number: impl Into<String>, customer_id: Uuid, valid_until: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            quote_number: quote_number.into(),
            customer_id,
            location_id: None,
            status: QuoteStatus::Draft,
            valid_until,
            sent_date: None,
            machines: Vec::new(),
            parts: Vec::new(),
            sub_assemblies: Vec::new(),
            discount_percent: None,
            tax_rate: None,
            subtotal: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn lines(&self, kind: QuoteLineKind) -> &[QuoteLineItem] {
        match kind {
            QuoteLineKind::Machine => &self.machines,
            QuoteLineKind::Part => &self.parts,
            QuoteLineKind::SubAssembly => &self.sub_assemblies,
        }
    }

    pub fn lines_mut(&mut self, kind: QuoteLineKind) -> &mut Vec<QuoteLineItem> {
        match kind {
            QuoteLineKind::Machine => &mut self.machines,
            QuoteLineKind::Part => &mut self.parts,
            QuoteLineKind::SubAssembly => &mut self.sub_assemblies,
        }
    }

    pub fn all_lines(&self) -> impl Iterator<Item = &QuoteLineItem> {
        self.machines
            .iter()
            .chain(self.parts.iter())
            .chain(self.sub_assemblies.iter())
    }

    pub fn all_lines_mut(&mut self) -> impl Iterator<Item = &mut QuoteLineItem> {
        self.machines
            .iter_mut()
            .chain(self.parts.iter_mut())
            .chain(self.sub_assemblies.iter_mut())
    }

    /// Adds a line, or merges its quantity into the existing line for the same item.
    /// A merged line keeps its original unit price and discount.
    pub fn upsert_line(
        &mut self,
        kind: QuoteLineKind,
        line: QuoteLineItem,
    ) -> Result<UpsertOutcome, ServiceError> {
        let lines = self.lines_mut(kind);
        match lines.iter_mut().find(|l| l.item_id == line.item_id) {
            Some(existing) => {
                let merged = checked_quantity(non_negative(existing.quantity), non_negative(line.quantity))?;
                existing.quantity = Some(merged);
                Ok(UpsertOutcome::Merged)
            }
            None => {
                lines.push(line);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    pub fn find_line_mut(&mut self, kind: QuoteLineKind, item_id: Uuid) -> Option<&mut QuoteLineItem> {
        self.lines_mut(kind).iter_mut().find(|l| l.item_id == item_id)
    }

    /// Removes the line for `item_id`. Returns whether a line was removed.
    pub fn remove_line(&mut self, kind: QuoteLineKind, item_id: Uuid) -> bool {
        let lines = self.lines_mut(kind);
        let before = lines.len();
        lines.retain(|l| l.item_id != item_id);
        lines.len() != before
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        today > self.valid_until
    }
}
