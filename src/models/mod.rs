// Catalog records
pub mod customer;
pub mod labor;
pub mod machine;
pub mod part;
pub mod raw_material;
pub mod sub_assembly;
pub mod supplier;

// BOM, quotes and orders
pub mod machine_bom;
pub mod quote;
pub mod sales_order;

pub mod numeric;

pub use customer::{Address, Customer, CustomerLocation, Industry};
pub use labor::{FixedLabor, LaborEntry, MachineLabor, DEFAULT_LEGACY_LABOR_RATE};
pub use machine::{Machine, MachineSpecifications};
pub use machine_bom::{BomItemSnapshot, BomItemType, BomKey, MachineBomLine};
pub use part::{AlternativeSupplier, Part};
pub use quote::{Quote, QuoteLineItem, QuoteLineKind, QuoteStatus};
pub use raw_material::{RawMaterial, RawMaterialLine};
pub use sales_order::{
    SalesOrder, SalesOrderStatus, ShippingAddress, ShippingDetails, ShippingMethod,
};
pub use sub_assembly::{SubAssembly, SubAssemblyPartLine, DEFAULT_MARKUP_PERCENT};
pub use supplier::Supplier;

use serde::Serialize;

/// Result of adding an item to a keyed line list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UpsertOutcome {
    /// No line existed for the item; a new one was added.
    Inserted,
    /// The item already had a line; its quantity was increased.
    Merged,
}
