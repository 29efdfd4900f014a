//! StateSet Quote Engine
//!
//! Cost roll-ups for parts, sub-assemblies and machines, quote pricing, and the
//! quote → sales order lifecycle. Storage is supplied by the caller through the
//! traits in [`repositories`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod repositories;
pub mod services;

pub use errors::{ErrorCategory, ServiceError};

// Roll-ups and state machines, usable without any storage.
pub use services::assembly_costing::{cost_sub_assembly, SubAssemblyCost};
pub use services::bom::{cost_machine, FlaggedLine, MachineCost};
pub use services::ledger::{labor_totals, material_total, LaborTotals};
pub use services::lifecycle::{
    transition_quote_status, transition_sales_order_status, OrderNumbering, QuoteTransition,
};
pub use services::quote_pricing::{price_quote, price_quote_line, QuoteTotals};

pub use services::bom::BomService;
pub use services::quotes::QuoteService;
pub use services::sales_orders::SalesOrderService;
pub use services::sub_assemblies::SubAssemblyService;
