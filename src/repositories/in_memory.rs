use super::{
    BomRepository, CatalogRepository, QuoteRepository, SalesOrderRepository,
    SubAssemblyRepository,
};
use crate::errors::ServiceError;
use crate::models::{
    BomKey, Customer, Machine, MachineBomLine, Part, Quote, RawMaterial, SalesOrder, SubAssembly,
    Supplier,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// Concurrent in-process store backing every repository trait.
///
/// Uniqueness constraints are kept in side indices and claimed through the
/// `DashMap` entry API, so two racing inserts of the same key cannot both succeed.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    parts: DashMap<Uuid, Part>,
    raw_materials: DashMap<Uuid, RawMaterial>,
    machines: DashMap<Uuid, Machine>,
    customers: DashMap<Uuid, Customer>,
    suppliers: DashMap<Uuid, Supplier>,

    sub_assemblies: DashMap<Uuid, SubAssembly>,
    assembly_numbers: DashMap<String, Uuid>,

    bom_lines: DashMap<Uuid, MachineBomLine>,
    bom_keys: DashMap<BomKey, Uuid>,

    quotes: DashMap<Uuid, Quote>,
    quote_numbers: DashMap<String, Uuid>,

    sales_orders: DashMap<Uuid, SalesOrder>,
    sales_order_numbers: DashMap<String, Uuid>,
    sales_orders_by_quote: DashMap<Uuid, Uuid>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_part(&self, part: Part) {
        self.parts.insert(part.id, part);
    }

    pub fn put_raw_material(&self, material: RawMaterial) {
        self.raw_materials.insert(material.id, material);
    }

    pub fn put_machine(&self, machine: Machine) {
        self.machines.insert(machine.id, machine);
    }

    pub fn put_customer(&self, customer: Customer) {
        self.customers.insert(customer.id, customer);
    }

    pub fn put_supplier(&self, supplier: Supplier) {
        self.suppliers.insert(supplier.id, supplier);
    }

    pub fn remove_part(&self, id: Uuid) -> Option<Part> {
        self.parts.remove(&id).map(|(_, part)| part)
    }

    pub fn remove_machine(&self, id: Uuid) -> Option<Machine> {
        self.machines.remove(&id).map(|(_, machine)| machine)
    }

    fn claim_assembly_number(&self, sub_assembly: &SubAssembly) -> Result<(), ServiceError> {
        match self.assembly_numbers.entry(sub_assembly.assembly_number.clone()) {
            Entry::Occupied(entry) if *entry.get() != sub_assembly.id => Err(ServiceError::Conflict(
                format!("assembly number {} already exists", sub_assembly.assembly_number),
            )),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(sub_assembly.id);
                Ok(())
            }
        }
    }
}

fn values<K, V>(map: &DashMap<K, V>) -> Vec<V>
where
    K: Eq + std::hash::Hash,
    V: Clone,
{
    map.iter().map(|entry| entry.value().clone()).collect()
}

fn stale(id: Uuid, stored: i32, given: i32) -> ServiceError {
    debug!(%id, stored, given, "version mismatch");
    ServiceError::ConcurrentModification(id)
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn get_part(&self, id: Uuid) -> Result<Option<Part>, ServiceError> {
        Ok(self.parts.get(&id).map(|p| p.clone()))
    }

    async fn list_parts(&self) -> Result<Vec<Part>, ServiceError> {
        let mut parts = values(&self.parts);
        parts.sort_by(|a, b| a.part_number.cmp(&b.part_number));
        Ok(parts)
    }

    async fn get_raw_material(&self, id: Uuid) -> Result<Option<RawMaterial>, ServiceError> {
        Ok(self.raw_materials.get(&id).map(|m| m.clone()))
    }

    async fn list_raw_materials(&self) -> Result<Vec<RawMaterial>, ServiceError> {
        let mut materials = values(&self.raw_materials);
        materials.sort_by(|a, b| a.material_id.cmp(&b.material_id));
        Ok(materials)
    }

    async fn get_sub_assembly(&self, id: Uuid) -> Result<Option<SubAssembly>, ServiceError> {
        Ok(self.sub_assemblies.get(&id).map(|s| s.clone()))
    }

    async fn list_sub_assemblies(&self) -> Result<Vec<SubAssembly>, ServiceError> {
        let mut assemblies = values(&self.sub_assemblies);
        assemblies.sort_by(|a, b| a.assembly_number.cmp(&b.assembly_number));
        Ok(assemblies)
    }

    async fn get_machine(&self, id: Uuid) -> Result<Option<Machine>, ServiceError> {
        Ok(self.machines.get(&id).map(|m| m.clone()))
    }

    async fn list_machines(&self) -> Result<Vec<Machine>, ServiceError> {
        let mut machines = values(&self.machines);
        machines.sort_by(|a, b| a.machine_id.cmp(&b.machine_id));
        Ok(machines)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Option<Customer>, ServiceError> {
        Ok(self.customers.get(&id).map(|c| c.clone()))
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError> {
        let mut customers = values(&self.customers);
        customers.sort_by(|a, b| a.company_name.cmp(&b.company_name));
        Ok(customers)
    }

    async fn get_supplier(&self, id: Uuid) -> Result<Option<Supplier>, ServiceError> {
        Ok(self.suppliers.get(&id).map(|s| s.clone()))
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ServiceError> {
        let mut suppliers = values(&self.suppliers);
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }
}

#[async_trait]
impl SubAssemblyRepository for InMemoryStore {
    async fn save_sub_assembly(&self, sub_assembly: &SubAssembly) -> Result<SubAssembly, ServiceError> {
        let mut next = sub_assembly.clone();
        match self.sub_assemblies.entry(sub_assembly.id) {
            Entry::Occupied(mut stored) => {
                if stored.get().version != sub_assembly.version {
                    return Err(stale(sub_assembly.id, stored.get().version, sub_assembly.version));
                }
                let previous_number = stored.get().assembly_number.clone();
                if previous_number != next.assembly_number {
                    self.claim_assembly_number(&next)?;
                    self.assembly_numbers.remove(&previous_number);
                }
                next.version += 1;
                stored.insert(next.clone());
            }
            Entry::Vacant(slot) => {
                self.claim_assembly_number(&next)?;
                slot.insert(next.clone());
            }
        }
        Ok(next)
    }

    async fn delete_sub_assembly(&self, id: Uuid) -> Result<bool, ServiceError> {
        match self.sub_assemblies.remove(&id) {
            Some((_, removed)) => {
                self.assembly_numbers.remove(&removed.assembly_number);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl BomRepository for InMemoryStore {
    async fn get_line(&self, id: Uuid) -> Result<Option<MachineBomLine>, ServiceError> {
        Ok(self.bom_lines.get(&id).map(|l| l.clone()))
    }

    async fn find_line(&self, key: BomKey) -> Result<Option<MachineBomLine>, ServiceError> {
        let id = match self.bom_keys.get(&key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.bom_lines.get(&id).map(|l| l.clone()))
    }

    async fn lines_for_machine(&self, machine_id: Uuid) -> Result<Vec<MachineBomLine>, ServiceError> {
        let mut lines: Vec<MachineBomLine> = self
            .bom_lines
            .iter()
            .filter(|entry| entry.machine_id == machine_id)
            .map(|entry| entry.value().clone())
            .collect();
        lines.sort_by(|a, b| a.item_number.cmp(&b.item_number).then(a.id.cmp(&b.id)));
        Ok(lines)
    }

    async fn insert_line(&self, line: &MachineBomLine) -> Result<MachineBomLine, ServiceError> {
        match self.bom_keys.entry(line.key()) {
            Entry::Occupied(_) => Err(ServiceError::Conflict(format!(
                "machine {} already has a {} line for {}",
                line.machine_id, line.item_type, line.item_id
            ))),
            Entry::Vacant(entry) => {
                self.bom_lines.insert(line.id, line.clone());
                entry.insert(line.id);
                Ok(line.clone())
            }
        }
    }

    async fn update_line(&self, line: &MachineBomLine) -> Result<MachineBomLine, ServiceError> {
        let mut stored = self
            .bom_lines
            .get_mut(&line.id)
            .ok_or_else(|| ServiceError::NotFound(format!("BOM line {}", line.id)))?;
        if stored.version != line.version {
            return Err(stale(line.id, stored.version, line.version));
        }
        if stored.value().key() != line.key() {
            return Err(ServiceError::InvalidInput(
                "a BOM line cannot change its machine or item".into(),
            ));
        }
        let mut next = line.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete_line(&self, id: Uuid) -> Result<bool, ServiceError> {
        match self.bom_lines.remove(&id) {
            Some((_, removed)) => {
                self.bom_keys.remove(&removed.key());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl QuoteRepository for InMemoryStore {
    async fn get_quote(&self, id: Uuid) -> Result<Option<Quote>, ServiceError> {
        Ok(self.quotes.get(&id).map(|q| q.clone()))
    }

    async fn list_quotes(&self) -> Result<Vec<Quote>, ServiceError> {
        let mut quotes = values(&self.quotes);
        quotes.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(quotes)
    }

    async fn insert_quote(&self, quote: &Quote) -> Result<Quote, ServiceError> {
        match self.quote_numbers.entry(quote.quote_number.clone()) {
            Entry::Occupied(_) => Err(ServiceError::Conflict(format!(
                "quote number {} already exists",
                quote.quote_number
            ))),
            Entry::Vacant(entry) => {
                self.quotes.insert(quote.id, quote.clone());
                entry.insert(quote.id);
                Ok(quote.clone())
            }
        }
    }

    async fn update_quote(&self, quote: &Quote) -> Result<Quote, ServiceError> {
        let mut stored = self
            .quotes
            .get_mut(&quote.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Quote {}", quote.id)))?;
        if stored.version != quote.version {
            return Err(stale(quote.id, stored.version, quote.version));
        }
        if stored.quote_number != quote.quote_number {
            return Err(ServiceError::InvalidInput(
                "quote_number cannot be changed".into(),
            ));
        }
        let mut next = quote.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete_quote(&self, id: Uuid) -> Result<bool, ServiceError> {
        match self.quotes.remove(&id) {
            Some((_, removed)) => {
                self.quote_numbers.remove(&removed.quote_number);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SalesOrderRepository for InMemoryStore {
    async fn get_sales_order(&self, id: Uuid) -> Result<Option<SalesOrder>, ServiceError> {
        Ok(self.sales_orders.get(&id).map(|o| o.clone()))
    }

    async fn find_by_quote(&self, quote_id: Uuid) -> Result<Option<SalesOrder>, ServiceError> {
        let id = match self.sales_orders_by_quote.get(&quote_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.sales_orders.get(&id).map(|o| o.clone()))
    }

    async fn list_sales_orders(&self) -> Result<Vec<SalesOrder>, ServiceError> {
        let mut orders = values(&self.sales_orders);
        orders.sort_by(|a, b| {
            a.order_date
                .cmp(&b.order_date)
                .then(a.sales_order_number.cmp(&b.sales_order_number))
        });
        Ok(orders)
    }

    async fn insert_sales_order(&self, order: &SalesOrder) -> Result<SalesOrder, ServiceError> {
        // Quote index first, then number index; every insert claims them in this order.
        let by_quote = match self.sales_orders_by_quote.entry(order.quote_id) {
            Entry::Occupied(_) => {
                return Err(ServiceError::Conflict(format!(
                    "quote {} already has a sales order",
                    order.quote_number
                )))
            }
            Entry::Vacant(entry) => entry,
        };
        let by_number = match self.sales_order_numbers.entry(order.sales_order_number.clone()) {
            Entry::Occupied(_) => {
                return Err(ServiceError::Conflict(format!(
                    "sales order number {} already exists",
                    order.sales_order_number
                )))
            }
            Entry::Vacant(entry) => entry,
        };

        self.sales_orders.insert(order.id, order.clone());
        by_number.insert(order.id);
        by_quote.insert(order.id);
        Ok(order.clone())
    }

    async fn update_sales_order(&self, order: &SalesOrder) -> Result<SalesOrder, ServiceError> {
        let mut stored = self
            .sales_orders
            .get_mut(&order.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Sales order {}", order.id)))?;
        if stored.version != order.version {
            return Err(stale(order.id, stored.version, order.version));
        }
        if stored.quote_id != order.quote_id
            || stored.sales_order_number != order.sales_order_number
        {
            return Err(ServiceError::InvalidInput(
                "a sales order cannot change its quote or number".into(),
            ));
        }
        let mut next = order.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete_sales_order(&self, id: Uuid) -> Result<bool, ServiceError> {
        match self.sales_orders.remove(&id) {
            Some((_, removed)) => {
                self.sales_order_numbers.remove(&removed.sales_order_number);
                self.sales_orders_by_quote.remove(&removed.quote_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BomItemSnapshot, BomItemType};
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bom_line(machine_id: Uuid, item_id: Uuid) -> MachineBomLine {
        MachineBomLine::new(
            machine_id,
            BomItemSnapshot {
                item_type: BomItemType::Part,
                item_id,
                name: "Pulley".into(),
                number: "PL-3".into(),
                unit_cost: dec!(12),
            },
            dec!(1),
        )
    }

    #[tokio::test]
    async fn bom_key_is_unique() {
        let store = InMemoryStore::new();
        let (machine, item) = (Uuid::new_v4(), Uuid::new_v4());

        store.insert_line(&bom_line(machine, item)).await.unwrap();
        let err = store.insert_line(&bom_line(machine, item)).await.unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
        assert_eq!(store.lines_for_machine(machine).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_is_compare_and_swap() {
        let store = InMemoryStore::new();
        let line = store
            .insert_line(&bom_line(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap();

        let mut first = line.clone();
        first.set_quantity(dec!(4));
        let saved = store.update_line(&first).await.unwrap();
        assert_eq!(saved.version, 1);

        let mut second = line;
        second.set_quantity(dec!(9));
        let err = store.update_line(&second).await.unwrap_err();
        assert_matches!(err, ServiceError::ConcurrentModification(id) if id == saved.id);
    }

    #[tokio::test]
    async fn update_cannot_move_a_line_to_another_item() {
        let store = InMemoryStore::new();
        let line = store
            .insert_line(&bom_line(Uuid::new_v4(), Uuid::new_v4()))
            .await
            .unwrap();

        let mut moved = line.clone();
        moved.item_id = Uuid::new_v4();
        let err = store.update_line(&moved).await.unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));
        assert_eq!(store.find_line(line.key()).await.unwrap(), Some(line));
    }

    #[tokio::test]
    async fn deleting_a_line_frees_its_key() {
        let store = InMemoryStore::new();
        let (machine, item) = (Uuid::new_v4(), Uuid::new_v4());
        let line = store.insert_line(&bom_line(machine, item)).await.unwrap();

        assert!(store.delete_line(line.id).await.unwrap());
        assert!(store.find_line(line.key()).await.unwrap().is_none());
        store.insert_line(&bom_line(machine, item)).await.unwrap();
    }

    #[tokio::test]
    async fn one_sales_order_per_quote() {
        let store = InMemoryStore::new();
        let quote = Quote::new("Q1", Uuid::new_v4(), NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();

        let first = SalesOrder::from_accepted_quote(&quote, "SO-1".into(), date);
        store.insert_sales_order(&first).await.unwrap();

        let second = SalesOrder::from_accepted_quote(&quote, "SO-1b".into(), date);
        let err = store.insert_sales_order(&second).await.unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
        assert_eq!(store.list_sales_orders().await.unwrap().len(), 1);
        assert_eq!(
            store.find_by_quote(quote.id).await.unwrap().map(|o| o.id),
            Some(first.id)
        );
    }

    #[tokio::test]
    async fn assembly_numbers_are_unique() {
        let store = InMemoryStore::new();
        store
            .save_sub_assembly(&SubAssembly::new("SA-1", "Frame"))
            .await
            .unwrap();
        let err = store
            .save_sub_assembly(&SubAssembly::new("SA-1", "Other frame"))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
    }

    #[tokio::test]
    async fn sub_assembly_save_is_compare_and_swap() {
        let store = InMemoryStore::new();
        let created = store
            .save_sub_assembly(&SubAssembly::new("SA-1", "Frame"))
            .await
            .unwrap();
        assert_eq!(created.version, 0);

        let mut first = created.clone();
        first.name = "Welded frame".into();
        let saved = store.save_sub_assembly(&first).await.unwrap();
        assert_eq!(saved.version, 1);

        let mut second = created;
        second.name = "Bolted frame".into();
        let err = store.save_sub_assembly(&second).await.unwrap_err();
        assert_matches!(err, ServiceError::ConcurrentModification(id) if id == saved.id);
        let stored = store.get_sub_assembly(saved.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Welded frame");
    }

    #[tokio::test]
    async fn renumbering_a_sub_assembly_frees_its_old_number() {
        let store = InMemoryStore::new();
        let created = store
            .save_sub_assembly(&SubAssembly::new("SA-1", "Frame"))
            .await
            .unwrap();
        let mut renumbered = created.clone();
        renumbered.assembly_number = "SA-2".into();
        store.save_sub_assembly(&renumbered).await.unwrap();

        store
            .save_sub_assembly(&SubAssembly::new("SA-1", "New frame"))
            .await
            .unwrap();
        let err = store
            .save_sub_assembly(&SubAssembly::new("SA-2", "Clash"))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Conflict(_));
    }
}
