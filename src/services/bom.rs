use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        numeric::{plus, product},
        BomItemSnapshot, BomItemType, BomKey, Machine, MachineBomLine, Part, SubAssembly,
        UpsertOutcome,
    },
    repositories::{BomRepository, CatalogRepository},
    services::{
        assembly_costing::{apply_markup, cost_sub_assembly},
        ledger::machine_labor_totals,
    },
};

const WORK_HOURS_PER_DAY: Decimal = dec!(8);
const MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    /// The line's part or sub-assembly no longer exists; the line was left out of the roll-up.
    MissingItem,
    /// A part inside a sub-assembly line no longer exists; its lead time is unknown.
    MissingNestedPart { part_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlaggedLine {
    pub line_id: Uuid,
    pub item_type: BomItemType,
    pub item_id: Uuid,
    pub reason: FlagReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MachineCost {
    pub bom_cost: Decimal,
    pub labor_cost: Decimal,
    pub total_cost: Decimal,
    pub selling_price: Decimal,
    pub total_labor_hours: Decimal,
    pub max_lead_time_days: u32,
    pub total_build_days: u32,
    pub estimated_completion_days: u32,
    pub flagged_lines: Vec<FlaggedLine>,
}

impl MachineCost {
    pub fn is_complete(&self) -> bool {
        self.flagged_lines.is_empty()
    }
}

/// Rolls up a machine from its BOM lines and its own labor.
///
/// Lines are costed at their snapshotted `total_cost`. Sub-assembly labor hours count
/// toward build time (times the line quantity); their labor cost is already inside the
/// snapshot. Lines whose item cannot be found in the indices are left out and flagged.
pub fn cost_machine(
    machine: &Machine,
    bom_lines: &[MachineBomLine],
    sub_assemblies: &HashMap<Uuid, SubAssembly>,
    parts: &HashMap<Uuid, Part>,
) -> MachineCost {
    let machine_labor = machine_labor_totals(&machine.labor);

    let mut bom_cost = Decimal::ZERO;
    let mut bom_hours = Decimal::ZERO;
    let mut max_lead_time_days = 0u32;
    let mut flagged_lines = Vec::new();

    for line in bom_lines {
        let flag = |reason| FlaggedLine {
            line_id: line.id,
            item_type: line.item_type,
            item_id: line.item_id,
            reason,
        };

        match line.item_type {
            BomItemType::Part => match parts.get(&line.item_id) {
                Some(part) => {
                    bom_cost = plus(bom_cost, line.line_cost());
                    max_lead_time_days = max_lead_time_days.max(part.lead_time_days.unwrap_or(0));
                }
                None => flagged_lines.push(flag(FlagReason::MissingItem)),
            },
            BomItemType::SubAssembly => match sub_assemblies.get(&line.item_id) {
                Some(sub_assembly) => {
                    bom_cost = plus(bom_cost, line.line_cost());
                    let hours = cost_sub_assembly(sub_assembly).labor_hours;
                    bom_hours = plus(bom_hours, product(hours, line.quantity.max(Decimal::ZERO)));

                    for part_line in &sub_assembly.parts {
                        match parts.get(&part_line.part_id) {
                            Some(part) => {
                                max_lead_time_days =
                                    max_lead_time_days.max(part.lead_time_days.unwrap_or(0));
                            }
                            None => flagged_lines.push(flag(FlagReason::MissingNestedPart {
                                part_id: part_line.part_id,
                            })),
                        }
                    }
                }
                None => flagged_lines.push(flag(FlagReason::MissingItem)),
            },
        }
    }

    let total_cost = plus(bom_cost, machine_labor.total_cost);
    let total_labor_hours = plus(machine_labor.total_hours, bom_hours);
    let total_build_days = (total_labor_hours / WORK_HOURS_PER_DAY)
        .ceil()
        .to_u32()
        .unwrap_or(u32::MAX);

    MachineCost {
        bom_cost,
        labor_cost: machine_labor.total_cost,
        total_cost,
        selling_price: apply_markup(total_cost, machine.markup()),
        total_labor_hours,
        max_lead_time_days,
        total_build_days,
        estimated_completion_days: max_lead_time_days.saturating_add(total_build_days),
        flagged_lines,
    }
}

/// What `BomService::add_item` did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BomUpsert {
    pub outcome: UpsertOutcome,
    pub line: MachineBomLine,
}

/// A line whose snapshot cost no longer matches the catalog.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StaleLine {
    pub line: MachineBomLine,
    pub current_unit_cost: Decimal,
}

/// Machine bill-of-materials maintenance and costing
#[derive(Clone)]
pub struct BomService {
    catalog: Arc<dyn CatalogRepository>,
    bom: Arc<dyn BomRepository>,
    event_sender: Option<EventSender>,
}

impl BomService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        bom: Arc<dyn BomRepository>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            catalog,
            bom,
            event_sender,
        }
    }

    async fn require_machine(&self, machine_id: Uuid) -> Result<Machine, ServiceError> {
        self.catalog
            .get_machine(machine_id)
            .await?
            .ok_or_else(|| ServiceError::reference("machine", machine_id))
    }

    /// Current catalog values for an item, as they would be copied onto a new line.
    async fn snapshot_item(
        &self,
        item_type: BomItemType,
        item_id: Uuid,
    ) -> Result<BomItemSnapshot, ServiceError> {
        match item_type {
            BomItemType::Part => {
                let part = self
                    .catalog
                    .get_part(item_id)
                    .await?
                    .ok_or_else(|| ServiceError::reference("part", item_id))?;
                Ok(BomItemSnapshot {
                    item_type,
                    item_id,
                    unit_cost: part.rolled_up_cost_price(),
                    name: part.name,
                    number: part.part_number,
                })
            }
            BomItemType::SubAssembly => {
                let sub_assembly = self
                    .catalog
                    .get_sub_assembly(item_id)
                    .await?
                    .ok_or_else(|| ServiceError::reference("sub_assembly", item_id))?;
                Ok(BomItemSnapshot {
                    item_type,
                    item_id,
                    unit_cost: cost_sub_assembly(&sub_assembly).total_cost,
                    name: sub_assembly.name,
                    number: sub_assembly.assembly_number,
                })
            }
        }
    }

    /// Adds an item to a machine's BOM, or adds `quantity` to the item's existing line.
    #[instrument(skip(self), fields(machine_id = %machine_id, item_id = %item_id))]
    pub async fn add_item(
        &self,
        machine_id: Uuid,
        item_type: BomItemType,
        item_id: Uuid,
        quantity: Decimal,
    ) -> Result<BomUpsert, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".into(),
            ));
        }
        self.require_machine(machine_id).await?;
        let snapshot = self.snapshot_item(item_type, item_id).await?;
        let key = BomKey {
            machine_id,
            item_type,
            item_id,
        };

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let result = match self.bom.find_line(key).await? {
                Some(mut existing) => {
                    existing.merge_quantity(quantity)?;
                    self.bom
                        .update_line(&existing)
                        .await
                        .map(|line| (UpsertOutcome::Merged, line))
                }
                None => {
                    let line = MachineBomLine::new(machine_id, snapshot.clone(), quantity);
                    self.bom
                        .insert_line(&line)
                        .await
                        .map(|line| (UpsertOutcome::Inserted, line))
                }
            };

            match result {
                Ok((outcome, line)) => {
                    info!(
                        "BOM line {}: machine={}, item={}, quantity={}",
                        outcome, machine_id, item_id, line.quantity
                    );
                    if let Some(sender) = &self.event_sender {
                        sender.send_or_log(Event::bom_line_upserted(
                            machine_id, line.id, item_type, item_id, outcome,
                        ));
                    }
                    return Ok(BomUpsert { outcome, line });
                }
                Err(e) if e.is_retryable() => {
                    warn!("BOM upsert contention on attempt {}: {}", attempt, e);
                }
                Err(e) => {
                    error!("Failed to upsert BOM line: {}", e);
                    return Err(e);
                }
            }
        }

        Err(ServiceError::ConcurrentModification(machine_id))
    }

    /// Re-reads a line and applies `change` to it until the compare-and-swap wins.
    async fn modify_line<F>(&self, line_id: Uuid, change: F) -> Result<MachineBomLine, ServiceError>
    where
        F: Fn(&mut MachineBomLine) + Send + Sync,
    {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut line = self
                .bom
                .get_line(line_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("BOM line {}", line_id)))?;
            change(&mut line);
            match self.bom.update_line(&line).await {
                Ok(saved) => return Ok(saved),
                Err(ServiceError::ConcurrentModification(_)) => continue,
                Err(e) => {
                    error!("Failed to update BOM line {}: {}", line_id, e);
                    return Err(e);
                }
            }
        }
        Err(ServiceError::ConcurrentModification(line_id))
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_quantity(
        &self,
        line_id: Uuid,
        quantity: Decimal,
    ) -> Result<MachineBomLine, ServiceError> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "quantity must be greater than zero".into(),
            ));
        }
        let saved = self
            .modify_line(line_id, |line| line.set_quantity(quantity))
            .await?;
        info!("BOM line {} quantity set to {}", line_id, quantity);
        Ok(saved)
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_line(&self, line_id: Uuid) -> Result<(), ServiceError> {
        let line = self
            .bom
            .get_line(line_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("BOM line {}", line_id)))?;
        if !self.bom.delete_line(line_id).await? {
            return Err(ServiceError::NotFound(format!("BOM line {}", line_id)));
        }

        info!("BOM line removed: machine={}, line={}", line.machine_id, line_id);
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::BomLineRemoved {
                machine_id: line.machine_id,
                line_id,
            });
        }
        Ok(())
    }

    pub async fn lines(&self, machine_id: Uuid) -> Result<Vec<MachineBomLine>, ServiceError> {
        self.bom.lines_for_machine(machine_id).await
    }

    /// Loads a machine, its BOM and every referenced catalog item, then rolls it up.
    #[instrument(skip(self), fields(machine_id = %machine_id))]
    pub async fn machine_cost(&self, machine_id: Uuid) -> Result<MachineCost, ServiceError> {
        let machine = self.require_machine(machine_id).await?;
        let lines = self.bom.lines_for_machine(machine_id).await?;

        let mut sub_assemblies = HashMap::new();
        let mut parts = HashMap::new();
        let mut part_ids = Vec::new();

        for line in &lines {
            match line.item_type {
                BomItemType::Part => part_ids.push(line.item_id),
                BomItemType::SubAssembly => {
                    if let Some(sub_assembly) = self.catalog.get_sub_assembly(line.item_id).await? {
                        part_ids.extend(sub_assembly.parts.iter().map(|p| p.part_id));
                        sub_assemblies.insert(sub_assembly.id, sub_assembly);
                    }
                }
            }
        }
        for part_id in part_ids {
            if parts.contains_key(&part_id) {
                continue;
            }
            if let Some(part) = self.catalog.get_part(part_id).await? {
                parts.insert(part_id, part);
            }
        }

        let cost = cost_machine(&machine, &lines, &sub_assemblies, &parts);
        for flagged in &cost.flagged_lines {
            warn!(
                "Machine {} BOM line {} skipped or incomplete: {:?}",
                machine.machine_id, flagged.line_id, flagged.reason
            );
        }
        Ok(cost)
    }

    /// Lines whose snapshot unit cost differs from the item's current catalog cost.
    /// Lines whose item no longer exists are not reported here.
    #[instrument(skip(self), fields(machine_id = %machine_id))]
    pub async fn stale_lines(&self, machine_id: Uuid) -> Result<Vec<StaleLine>, ServiceError> {
        let mut stale = Vec::new();
        for line in self.bom.lines_for_machine(machine_id).await? {
            let current = match self.snapshot_item(line.item_type, line.item_id).await {
                Ok(snapshot) => snapshot.unit_cost,
                Err(ServiceError::ReferenceError { .. }) => continue,
                Err(e) => return Err(e),
            };
            if current != line.unit_cost {
                stale.push(StaleLine {
                    line,
                    current_unit_cost: current,
                });
            }
        }
        Ok(stale)
    }

    /// Replaces a line's snapshot with the item's current catalog values.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn refresh_unit_cost(&self, line_id: Uuid) -> Result<MachineBomLine, ServiceError> {
        let line = self
            .bom
            .get_line(line_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("BOM line {}", line_id)))?;
        let snapshot = self.snapshot_item(line.item_type, line.item_id).await?;

        let saved = self
            .modify_line(line_id, |line| {
                line.item_name = snapshot.name.clone();
                line.item_number = snapshot.number.clone();
                line.unit_cost = snapshot.unit_cost;
                line.recompute();
            })
            .await?;
        info!(
            "BOM line {} unit cost refreshed to {}",
            line_id, saved.unit_cost
        );
        Ok(saved)
    }
}
