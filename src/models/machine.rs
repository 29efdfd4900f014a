use super::labor::{FixedLabor, LaborEntry, MachineLabor};
use super::numeric::{is_negative, lenient};
use super::part::default_active;
use super::sub_assembly::DEFAULT_MARKUP_PERCENT;
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineSpecifications {
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub capacity: Option<String>,
}

/// A finished machine. Its cost comes from its BOM lines plus its own labor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(from = "MachineRecord", into = "MachineRecord")]
pub struct Machine {
    pub id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Machine ID must be between 1 and 50 characters"))]
    pub machine_id: String,
    #[validate(length(min = 1, max = 100, message = "Machine name must be between 1 and 100 characters"))]
    pub name: String,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub specifications: MachineSpecifications,
    pub labor: MachineLabor,
    pub markup_percent: Option<Decimal>,
    pub is_active: bool,
}

impl Machine {
    pub fn new(machine_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            machine_id: machine_id.into(),
            name: name.into(),
            manufacturer: None,
            category: None,
            description: None,
            specifications: MachineSpecifications::default(),
            labor: MachineLabor::default(),
            markup_percent: None,
            is_active: true,
        }
    }

    pub fn markup(&self) -> Decimal {
        self.markup_percent.unwrap_or(DEFAULT_MARKUP_PERCENT)
    }

    pub fn check(&self) -> Result<(), ServiceError> {
        self.labor.check()?;
        if is_negative(self.markup_percent) {
            return Err(ServiceError::ValidationError(
                "markup_percent must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Stored shape of a machine: per-operation `labor_entries` alongside the older flat
/// assembly/finishing fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct MachineRecord {
    id: Uuid,
    #[serde(default)]
    machine_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    manufacturer: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    specifications: MachineSpecifications,
    #[serde(default)]
    labor_entries: Vec<LaborEntry>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    assembly_labor_hours: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    assembly_labor_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    finishing_labor_hours: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    finishing_labor_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    markup_percent: Option<Decimal>,
    #[serde(default = "default_active")]
    is_active: bool,
}

impl From<MachineRecord> for Machine {
    fn from(record: MachineRecord) -> Self {
        // Entries win whenever present; the flat fields are only read for older records.
        let has_legacy_hours =
            record.assembly_labor_hours.is_some() || record.finishing_labor_hours.is_some();
        let labor = if record.labor_entries.is_empty() && has_legacy_hours {
            MachineLabor::Legacy {
                assembly: FixedLabor {
                    hours: record.assembly_labor_hours,
                    rate: record.assembly_labor_rate,
                },
                finishing: FixedLabor {
                    hours: record.finishing_labor_hours,
                    rate: record.finishing_labor_rate,
                },
            }
        } else {
            MachineLabor::Entries(record.labor_entries)
        };

        Self {
            id: record.id,
            machine_id: record.machine_id,
            name: record.name,
            manufacturer: record.manufacturer,
            category: record.category,
            description: record.description,
            specifications: record.specifications,
            labor,
            markup_percent: record.markup_percent,
            is_active: record.is_active,
        }
    }
}

impl From<Machine> for MachineRecord {
    fn from(machine: Machine) -> Self {
        let mut record = MachineRecord {
            id: machine.id,
            machine_id: machine.machine_id,
            name: machine.name,
            manufacturer: machine.manufacturer,
            category: machine.category,
            description: machine.description,
            specifications: machine.specifications,
            markup_percent: machine.markup_percent,
            is_active: machine.is_active,
            ..MachineRecord::default()
        };
        match machine.labor {
            MachineLabor::Entries(entries) => record.labor_entries = entries,
            MachineLabor::Legacy {
                assembly,
                finishing,
            } => {
                record.assembly_labor_hours = assembly.hours;
                record.assembly_labor_rate = assembly.rate;
                record.finishing_labor_hours = finishing.hours;
                record.finishing_labor_rate = finishing.rate;
            }
        }
        record
    }
}
