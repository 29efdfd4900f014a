use super::labor::LaborEntry;
use super::numeric::{is_negative, lenient, non_negative, product};
use super::part::{default_active, Part};
use super::raw_material::RawMaterialLine;
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Markup applied when a sub-assembly or machine has none recorded.
pub const DEFAULT_MARKUP_PERCENT: Decimal = dec!(25);

/// A part used inside a sub-assembly, with the part's cost as it was when added.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubAssemblyPartLine {
    pub part_id: Uuid,
    #[serde(default)]
    pub part_name: String,
    #[serde(default)]
    pub part_number: String,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Decimal>,
}

impl SubAssemblyPartLine {
    pub fn snapshot(part: &Part, quantity: Decimal) -> Self {
        let mut line = Self {
            part_id: part.id,
            part_name: part.name.clone(),
            part_number: part.part_number.clone(),
            quantity: Some(quantity),
            unit_cost: Some(part.rolled_up_cost_price()),
            total_cost: None,
        };
        line.recompute();
        line
    }

    pub fn line_cost(&self) -> Decimal {
        product(non_negative(self.quantity), non_negative(self.unit_cost))
    }

    pub fn set_quantity(&mut self, quantity: Decimal) {
        self.quantity = Some(quantity);
        self.recompute();
    }

    pub fn recompute(&mut self) {
        self.total_cost = Some(self.line_cost());
    }
}

/// A reusable assembly of parts, materials and labor.
///
/// The `total_*`, `selling_price` and `assembly_time_minutes` fields are derived from
/// the lines and are rewritten by `SubAssembly::recompute` on every edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubAssembly {
    pub id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Assembly number must be between 1 and 50 characters"))]
    pub assembly_number: String,
    #[validate(length(min = 1, max = 100, message = "Assembly name must be between 1 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub parts: Vec<SubAssemblyPartLine>,
    #[serde(default)]
    pub raw_materials: Vec<RawMaterialLine>,
    #[serde(default)]
    pub labor_entries: Vec<LaborEntry>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub markup_percent: Option<Decimal>,
    #[serde(default)]
    pub total_parts_cost: Decimal,
    #[serde(default)]
    pub total_materials_cost: Decimal,
    #[serde(default)]
    pub total_labor_cost: Decimal,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub selling_price: Decimal,
    #[serde(default)]
    pub assembly_time_minutes: Decimal,
    #[serde(default)]
    pub compatible_machines: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub version: i32,
}

impl SubAssembly {
    pub fn new(assembly_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            assembly_number: assembly_number.into(),
            name: name.into(),
            description: None,
            category: None,
            supplier_id: None,
            parts: Vec::new(),
            raw_materials: Vec::new(),
            labor_entries: Vec::new(),
            markup_percent: None,
            total_parts_cost: Decimal::ZERO,
            total_materials_cost: Decimal::ZERO,
            total_labor_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            selling_price: Decimal::ZERO,
            assembly_time_minutes: Decimal::ZERO,
            compatible_machines: Vec::new(),
            is_active: true,
            version: 0,
        }
    }

    pub fn markup(&self) -> Decimal {
        self.markup_percent.unwrap_or(DEFAULT_MARKUP_PERCENT)
    }

    /// Rejects negative quantities, costs, hours, rates or markup on any line.
    pub fn check_lines(&self) -> Result<(), ServiceError> {
        for line in &self.parts {
            if is_negative(line.quantity) || is_negative(line.unit_cost) {
                return Err(ServiceError::ValidationError(format!(
                    "part line '{}' has a negative quantity or unit cost",
                    line.part_number
                )));
            }
        }
        self.raw_materials.iter().try_for_each(RawMaterialLine::check)?;
        self.labor_entries.iter().try_for_each(LaborEntry::check)?;
        if is_negative(self.markup_percent) {
            return Err(ServiceError::ValidationError(
                "markup_percent must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn is_quotable(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_defaults_to_twenty_five() {
        let assembly = SubAssembly::new("SA-100", "Spindle head");
        assert_eq!(assembly.markup(), dec!(25));
    }

    #[test]
    fn negative_part_quantity_is_rejected() {
        let mut assembly = SubAssembly::new("SA-100", "Spindle head");
        assembly.parts.push(SubAssemblyPartLine {
            part_id: Uuid::new_v4(),
            part_name: "Bolt".into(),
            part_number: "B-1".into(),
            quantity: Some(dec!(-2)),
            unit_cost: Some(dec!(1)),
            total_cost: None,
        });
        assert!(matches!(
            assembly.check_lines(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn stored_derived_fields_may_be_absent() {
        let assembly: SubAssembly = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "assembly_number": "SA-7",
            "name": "Gearbox",
            "markup_percent": "abc"
        }))
        .unwrap();
        assert_eq!(assembly.total_cost, Decimal::ZERO);
        assert_eq!(assembly.markup(), dec!(25));
        assert!(assembly.is_active);
    }
}
