//! Storage seams of the engine.
//!
//! The engine owns no storage. Callers hand it implementations of these traits;
//! [`in_memory::InMemoryStore`] is the reference implementation used by tests and
//! embedders.
//!
//! Contract shared by every write path:
//! - `insert_*` enforces the uniqueness constraints of the aggregate and returns
//!   `ServiceError::Conflict` on a duplicate.
//! - `update_*` is a compare-and-swap on `version`: it succeeds only when the stored
//!   version equals the given record's version, stores the record with the version
//!   incremented and returns it. A mismatch returns `ServiceError::ConcurrentModification`.

use crate::errors::ServiceError;
use crate::models::{
    BomKey, Customer, Machine, MachineBomLine, Part, Quote, RawMaterial, SalesOrder, SubAssembly,
    Supplier,
};
use async_trait::async_trait;
use uuid::Uuid;

pub mod in_memory;

pub use in_memory::InMemoryStore;

/// Read access to catalog records.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_part(&self, id: Uuid) -> Result<Option<Part>, ServiceError>;
    async fn list_parts(&self) -> Result<Vec<Part>, ServiceError>;

    async fn get_raw_material(&self, id: Uuid) -> Result<Option<RawMaterial>, ServiceError>;
    async fn list_raw_materials(&self) -> Result<Vec<RawMaterial>, ServiceError>;

    async fn get_sub_assembly(&self, id: Uuid) -> Result<Option<SubAssembly>, ServiceError>;
    async fn list_sub_assemblies(&self) -> Result<Vec<SubAssembly>, ServiceError>;

    async fn get_machine(&self, id: Uuid) -> Result<Option<Machine>, ServiceError>;
    async fn list_machines(&self) -> Result<Vec<Machine>, ServiceError>;

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, ServiceError>;
    async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError>;

    async fn get_supplier(&self, id: Uuid) -> Result<Option<Supplier>, ServiceError>;
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ServiceError>;
}

#[async_trait]
pub trait SubAssemblyRepository: Send + Sync {
    /// Creates a sub-assembly, or replaces it when `version` matches the stored one.
    /// Returns the stored record with its new version. `assembly_number` is unique.
    async fn save_sub_assembly(&self, sub_assembly: &SubAssembly) -> Result<SubAssembly, ServiceError>;
    async fn delete_sub_assembly(&self, id: Uuid) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait BomRepository: Send + Sync {
    async fn get_line(&self, id: Uuid) -> Result<Option<MachineBomLine>, ServiceError>;
    async fn find_line(&self, key: BomKey) -> Result<Option<MachineBomLine>, ServiceError>;
    async fn lines_for_machine(&self, machine_id: Uuid) -> Result<Vec<MachineBomLine>, ServiceError>;
    /// Unique on `(machine_id, item_type, item_id)`.
    async fn insert_line(&self, line: &MachineBomLine) -> Result<MachineBomLine, ServiceError>;
    async fn update_line(&self, line: &MachineBomLine) -> Result<MachineBomLine, ServiceError>;
    async fn delete_line(&self, id: Uuid) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn get_quote(&self, id: Uuid) -> Result<Option<Quote>, ServiceError>;
    async fn list_quotes(&self) -> Result<Vec<Quote>, ServiceError>;
    /// Unique on `quote_number`.
    async fn insert_quote(&self, quote: &Quote) -> Result<Quote, ServiceError>;
    async fn update_quote(&self, quote: &Quote) -> Result<Quote, ServiceError>;
    async fn delete_quote(&self, id: Uuid) -> Result<bool, ServiceError>;
}

#[async_trait]
pub trait SalesOrderRepository: Send + Sync {
    async fn get_sales_order(&self, id: Uuid) -> Result<Option<SalesOrder>, ServiceError>;
    async fn find_by_quote(&self, quote_id: Uuid) -> Result<Option<SalesOrder>, ServiceError>;
    async fn list_sales_orders(&self) -> Result<Vec<SalesOrder>, ServiceError>;
    /// Unique on `sales_order_number` and on `quote_id`.
    async fn insert_sales_order(&self, order: &SalesOrder) -> Result<SalesOrder, ServiceError>;
    async fn update_sales_order(&self, order: &SalesOrder) -> Result<SalesOrder, ServiceError>;
    async fn delete_sales_order(&self, id: Uuid) -> Result<bool, ServiceError>;
}
