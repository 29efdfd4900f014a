use super::numeric::{is_negative, lenient, non_negative, product};
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Hourly rate assumed for legacy labor fields that carry hours but no rate.
pub const DEFAULT_LEGACY_LABOR_RATE: Decimal = dec!(50);

/// One labor operation on a machine or sub-assembly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LaborEntry {
    #[serde(default)]
    pub operation: String,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub hours: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
}

impl LaborEntry {
    pub fn new(operation: impl Into<String>, hours: Decimal, rate: Decimal) -> Self {
        Self {
            operation: operation.into(),
            hours: Some(hours),
            rate: Some(rate),
        }
    }

    pub fn hours(&self) -> Decimal {
        non_negative(self.hours)
    }

    pub fn cost(&self) -> Decimal {
        product(self.hours(), non_negative(self.rate))
    }

    /// Rejects negative hours or rates. Missing values are allowed and count as zero.
    pub fn check(&self) -> Result<(), ServiceError> {
        if is_negative(self.hours) || is_negative(self.rate) {
            return Err(ServiceError::ValidationError(format!(
                "labor entry '{}' has a negative hours or rate value",
                self.operation
            )));
        }
        Ok(())
    }
}

/// Fixed hours at a fixed rate, as stored by the legacy machine schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedLabor {
    pub hours: Option<Decimal>,
    pub rate: Option<Decimal>,
}

impl FixedLabor {
    pub fn rate(&self) -> Decimal {
        match self.rate {
            Some(rate) => non_negative(Some(rate)),
            None => DEFAULT_LEGACY_LABOR_RATE,
        }
    }

    fn as_entry(&self, operation: &str) -> LaborEntry {
        LaborEntry {
            operation: operation.to_string(),
            hours: self.hours,
            rate: Some(self.rate()),
        }
    }
}

/// Labor recorded against a machine.
///
/// Machines saved before per-operation entries existed carry fixed assembly and
/// finishing hours instead. A machine has one form or the other, never both.
#[derive(Clone, Debug, PartialEq)]
pub enum MachineLabor {
    Entries(Vec<LaborEntry>),
    Legacy {
        assembly: FixedLabor,
        finishing: FixedLabor,
    },
}

impl Default for MachineLabor {
    fn default() -> Self {
        MachineLabor::Entries(Vec::new())
    }
}

impl MachineLabor {
    /// The labor as a flat entry list, legacy fields expanded into two operations.
    pub fn entries(&self) -> Vec<LaborEntry> {
        match self {
            MachineLabor::Entries(entries) => entries.clone(),
            MachineLabor::Legacy {
                assembly,
                finishing,
            } => vec![
                assembly.as_entry("assembly"),
                finishing.as_entry("finishing"),
            ],
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, MachineLabor::Legacy { .. })
    }

    pub fn check(&self) -> Result<(), ServiceError> {
        self.entries().iter().try_for_each(LaborEntry::check)
    }
}
