#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use stateset_quote_engine::{
    config::EngineConfig,
    events::{self, Event},
    models::{
        Customer, CustomerLocation, LaborEntry, Machine, MachineLabor, Part, RawMaterial,
        SubAssembly,
    },
    repositories::{InMemoryStore, QuoteRepository, SalesOrderRepository},
    BomService, QuoteService, SalesOrderService, SubAssemblyService,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Engine wired over one in-memory store, with the event stream captured.
pub struct TestEngine {
    pub store: Arc<InMemoryStore>,
    pub config: EngineConfig,
    pub bom: BomService,
    pub quotes: QuoteService,
    pub sales_orders: SalesOrderService,
    pub sub_assemblies: SubAssemblyService,
    pub events: mpsc::Receiver<Event>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_quote_store(None)
    }

    /// Same engine, but quotes are read and written through `quotes` when given.
    pub fn with_quote_store(quotes: Option<Arc<dyn QuoteRepository>>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let config = EngineConfig::default();
        let (sender, receiver) = events::channel(config.event_channel_capacity);

        let bom = BomService::new(store.clone(), store.clone(), Some(sender.clone()));
        let quote_store: Arc<dyn QuoteRepository> = quotes.unwrap_or_else(|| store.clone() as Arc<dyn QuoteRepository>);
        let order_store: Arc<dyn SalesOrderRepository> = store.clone();
        let quotes = QuoteService::new(
            store.clone(),
            quote_store,
            order_store.clone(),
            bom.clone(),
            &config,
            Some(sender.clone()),
        );
        let sales_orders = SalesOrderService::new(order_store, Some(sender.clone()));
        let sub_assemblies = SubAssemblyService::new(store.clone(), store.clone(), Some(sender));

        Self {
            store,
            config,
            bom,
            quotes,
            sales_orders,
            sub_assemblies,
            events: receiver,
        }
    }

    /// Events published so far.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn seed_part(&self, number: &str, cost: Decimal, selling: Decimal, lead_time_days: u32) -> Part {
        let part = part(number, cost, selling, lead_time_days);
        self.store.put_part(part.clone());
        part
    }

    pub fn seed_material(&self, number: &str, cost_per_unit: Decimal) -> RawMaterial {
        let material = RawMaterial {
            id: Uuid::new_v4(),
            material_id: number.to_string(),
            name: format!("Material {}", number),
            material_type: Some("steel".into()),
            form: Some("sheet".into()),
            specifications: None,
            cost_per_unit: Some(cost_per_unit),
            unit_of_measure: Some("kg".into()),
            stock_quantity: None,
            supplier_id: None,
            notes: None,
        };
        self.store.put_raw_material(material.clone());
        material
    }

    pub fn seed_machine(&self, number: &str, labor_hours: Decimal, rate: Decimal, markup: Decimal) -> Machine {
        let mut machine = Machine::new(number, format!("Machine {}", number));
        machine.labor = MachineLabor::Entries(vec![LaborEntry::new("assembly", labor_hours, rate)]);
        machine.markup_percent = Some(markup);
        self.store.put_machine(machine.clone());
        machine
    }

    pub fn seed_customer(&self, discount_rate: Option<Decimal>) -> Customer {
        let customer = Customer {
            id: Uuid::new_v4(),
            company_name: "Prairie Mills".into(),
            contact_person: Some("J. Ortega".into()),
            email: Some("orders@prairiemills.example".into()),
            phone: None,
            locations: vec![CustomerLocation {
                location_id: "LOC-1".into(),
                location_name: "Main plant".into(),
                is_primary: true,
                ..Default::default()
            }],
            industry: None,
            discount_rate,
            notes: None,
        };
        self.store.put_customer(customer.clone());
        customer
    }

    /// Saves an empty sub-assembly through the service.
    pub async fn seed_sub_assembly(&self, number: &str) -> SubAssembly {
        self.sub_assemblies
            .save(SubAssembly::new(number, format!("Assembly {}", number)))
            .await
            .expect("save sub-assembly")
    }
}

pub fn part(number: &str, cost: Decimal, selling: Decimal, lead_time_days: u32) -> Part {
    serde_json::from_value(serde_json::json!({
        "id": Uuid::new_v4(),
        "part_number": number,
        "name": format!("Part {}", number),
        "cost_price": cost,
        "selling_price": selling,
        "lead_time_days": lead_time_days,
    }))
    .expect("part fixture")
}

pub fn labor(hours: Decimal, rate: Decimal) -> LaborEntry {
    LaborEntry::new("assembly", hours, rate)
}
