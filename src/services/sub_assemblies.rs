use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        numeric::{checked_quantity, non_negative},
        LaborEntry, RawMaterialLine, SubAssembly, SubAssemblyPartLine,
    },
    repositories::{CatalogRepository, SubAssemblyRepository},
};

const MAX_WRITE_ATTEMPTS: usize = 5;

fn require_positive(quantity: Decimal) -> Result<(), ServiceError> {
    if quantity <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "quantity must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Sub-assembly editing. Every change recomputes the derived totals before saving.
#[derive(Clone)]
pub struct SubAssemblyService {
    catalog: Arc<dyn CatalogRepository>,
    store: Arc<dyn SubAssemblyRepository>,
    event_sender: Option<EventSender>,
}

impl SubAssemblyService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        store: Arc<dyn SubAssemblyRepository>,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            catalog,
            store,
            event_sender,
        }
    }

    pub async fn get(&self, sub_assembly_id: Uuid) -> Result<SubAssembly, ServiceError> {
        self.catalog
            .get_sub_assembly(sub_assembly_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sub-assembly {}", sub_assembly_id)))
    }

    /// Validates, recomputes and stores a sub-assembly. Replacing an existing one
    /// fails with `ConcurrentModification` when its `version` is stale.
    #[instrument(skip(self, sub_assembly), fields(assembly_number = %sub_assembly.assembly_number))]
    pub async fn save(&self, mut sub_assembly: SubAssembly) -> Result<SubAssembly, ServiceError> {
        sub_assembly.validate()?;
        sub_assembly.check_lines()?;
        let cost = sub_assembly.recompute();

        let saved = self.store.save_sub_assembly(&sub_assembly).await.map_err(|e| {
            if !e.is_retryable() {
                error!("Failed to save sub-assembly {}: {}", sub_assembly.assembly_number, e);
            }
            e
        })?;

        info!(
            "Sub-assembly saved: number={}, total_cost={}, selling_price={}",
            saved.assembly_number, cost.total_cost, cost.selling_price
        );
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::SubAssemblySaved {
                sub_assembly_id: saved.id,
                total_cost: cost.total_cost,
            });
        }
        Ok(saved)
    }

    /// Read, edit, save; re-read and re-apply `edit` when another writer got there first.
    async fn modify<F>(&self, sub_assembly_id: Uuid, mut edit: F) -> Result<SubAssembly, ServiceError>
    where
        F: FnMut(&mut SubAssembly) -> Result<(), ServiceError> + Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut sub_assembly = self.get(sub_assembly_id).await?;
            edit(&mut sub_assembly)?;
            match self.save(sub_assembly).await {
                Ok(saved) => return Ok(saved),
                Err(ServiceError::ConcurrentModification(_)) => {
                    warn!(
                        "Sub-assembly {} changed concurrently (attempt {})",
                        sub_assembly_id, attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(ServiceError::ConcurrentModification(sub_assembly_id))
    }

    /// Adds a part at its current cost price. Adding a part already on the assembly
    /// increases that line's quantity and keeps its original unit cost.
    #[instrument(skip(self), fields(sub_assembly_id = %sub_assembly_id, part_id = %part_id))]
    pub async fn add_part(
        &self,
        sub_assembly_id: Uuid,
        part_id: Uuid,
        quantity: Decimal,
    ) -> Result<SubAssembly, ServiceError> {
        require_positive(quantity)?;
        let part = self
            .catalog
            .get_part(part_id)
            .await?
            .ok_or_else(|| ServiceError::reference("part", part_id))?;

        self.modify(sub_assembly_id, |sub_assembly| {
            match sub_assembly.parts.iter_mut().find(|l| l.part_id == part_id) {
                Some(line) => {
                    line.set_quantity(checked_quantity(non_negative(line.quantity), quantity)?)
                }
                None => sub_assembly
                    .parts
                    .push(SubAssemblyPartLine::snapshot(&part, quantity)),
            }
            Ok(())
        })
        .await
    }

    /// Adds a raw material at its current cost per unit.
    #[instrument(skip(self), fields(sub_assembly_id = %sub_assembly_id, material_id = %material_id))]
    pub async fn add_raw_material(
        &self,
        sub_assembly_id: Uuid,
        material_id: Uuid,
        quantity: Decimal,
    ) -> Result<SubAssembly, ServiceError> {
        require_positive(quantity)?;
        let material = self
            .catalog
            .get_raw_material(material_id)
            .await?
            .ok_or_else(|| ServiceError::reference("raw_material", material_id))?;

        self.modify(sub_assembly_id, |sub_assembly| {
            match sub_assembly
                .raw_materials
                .iter_mut()
                .find(|l| l.material_id == material_id)
            {
                Some(line) => {
                    line.set_quantity(checked_quantity(non_negative(line.quantity), quantity)?)
                }
                None => sub_assembly
                    .raw_materials
                    .push(RawMaterialLine::snapshot(&material, quantity)),
            }
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(sub_assembly_id = %sub_assembly_id, part_id = %part_id))]
    pub async fn remove_part(
        &self,
        sub_assembly_id: Uuid,
        part_id: Uuid,
    ) -> Result<SubAssembly, ServiceError> {
        self.modify(sub_assembly_id, |sub_assembly| {
            let before = sub_assembly.parts.len();
            sub_assembly.parts.retain(|l| l.part_id != part_id);
            if sub_assembly.parts.len() == before {
                return Err(ServiceError::NotFound(format!(
                    "part {} on sub-assembly {}",
                    part_id, sub_assembly.assembly_number
                )));
            }
            Ok(())
        })
        .await
    }

    /// Replaces the labor entries.
    #[instrument(skip(self, entries), fields(sub_assembly_id = %sub_assembly_id))]
    pub async fn set_labor(
        &self,
        sub_assembly_id: Uuid,
        entries: Vec<LaborEntry>,
    ) -> Result<SubAssembly, ServiceError> {
        self.modify(sub_assembly_id, |sub_assembly| {
            sub_assembly.labor_entries = entries.clone();
            Ok(())
        })
        .await
    }

    /// Sets the markup; `None` falls back to the default markup.
    #[instrument(skip(self), fields(sub_assembly_id = %sub_assembly_id))]
    pub async fn set_markup(
        &self,
        sub_assembly_id: Uuid,
        markup_percent: Option<Decimal>,
    ) -> Result<SubAssembly, ServiceError> {
        self.modify(sub_assembly_id, |sub_assembly| {
            sub_assembly.markup_percent = markup_percent;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, sub_assembly_id: Uuid) -> Result<(), ServiceError> {
        if !self.store.delete_sub_assembly(sub_assembly_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Sub-assembly {}",
                sub_assembly_id
            )));
        }
        info!("Sub-assembly deleted: {}", sub_assembly_id);
        Ok(())
    }
}
