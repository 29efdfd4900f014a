use super::numeric::{checked_quantity, product};
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BomItemType {
    Part,
    SubAssembly,
}

/// Uniqueness key of a BOM line: one line per item per machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BomKey {
    pub machine_id: Uuid,
    pub item_type: BomItemType,
    pub item_id: Uuid,
}

/// Catalog values copied onto a BOM line when it is created.
#[derive(Clone, Debug, PartialEq)]
pub struct BomItemSnapshot {
    pub item_type: BomItemType,
    pub item_id: Uuid,
    pub name: String,
    pub number: String,
    pub unit_cost: Decimal,
}

/// One line of a machine's bill of materials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineBomLine {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub item_type: BomItemType,
    pub item_id: Uuid,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_number: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub version: i32,
}

impl MachineBomLine {
    pub fn new(machine_id: Uuid, item: BomItemSnapshot, quantity: Decimal) -> Self {
        let mut line = Self {
            id: Uuid::new_v4(),
            machine_id,
            item_type: item.item_type,
            item_id: item.item_id,
            item_name: item.name,
            item_number: item.number,
            quantity,
            unit_cost: item.unit_cost,
            total_cost: Decimal::ZERO,
            notes: None,
            version: 0,
        };
        line.recompute();
        line
    }

    pub fn key(&self) -> BomKey {
        BomKey {
            machine_id: self.machine_id,
            item_type: self.item_type,
            item_id: self.item_id,
        }
    }

    pub fn line_cost(&self) -> Decimal {
        product(self.quantity.max(Decimal::ZERO), self.unit_cost.max(Decimal::ZERO))
    }

    /// Folds a repeated add of the same item into this line. The unit cost
    /// snapshot is kept.
    pub fn merge_quantity(&mut self, quantity: Decimal) -> Result<(), ServiceError> {
        self.quantity = checked_quantity(self.quantity, quantity)?;
        self.recompute();
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: Decimal) {
        self.quantity = quantity;
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.total_cost = self.line_cost();
    }
}
