// Roll-up functions
pub mod assembly_costing;
pub mod bom;
pub mod ledger;
pub mod quote_pricing;

// Quote and order lifecycle
pub mod lifecycle;
pub mod quotes;
pub mod sales_orders;

// Catalog maintenance
pub mod sub_assemblies;

// Reporting
pub mod revenue;
