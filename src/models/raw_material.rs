use super::numeric::{is_negative, lenient, non_negative, product};
use crate::errors::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Catalog entry for a stock material (bar, sheet, tube...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct RawMaterial {
    pub id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Material ID must be between 1 and 50 characters"))]
    pub material_id: String,
    #[validate(length(min = 1, max = 100, message = "Material name must be between 1 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub material_type: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub specifications: Option<String>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub cost_per_unit: Option<Decimal>,
    #[serde(default)]
    pub unit_of_measure: Option<String>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<Decimal>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A quantity of raw material embedded in a part or sub-assembly.
///
/// `unit_cost` and `material_name` are copied from the catalog when the line is
/// created and are not refreshed afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMaterialLine {
    pub material_id: Uuid,
    #[serde(default)]
    pub material_name: String,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Decimal>,
}

impl RawMaterialLine {
    pub fn snapshot(material: &RawMaterial, quantity: Decimal) -> Self {
        let mut line = Self {
            material_id: material.id,
            material_name: material.name.clone(),
            quantity: Some(quantity),
            unit_cost: Some(non_negative(material.cost_per_unit)),
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

    pub fn check(&self) -> Result<(), ServiceError> {
        if is_negative(self.quantity) || is_negative(self.unit_cost) {
            return Err(ServiceError::ValidationError(format!(
                "material line '{}' has a negative quantity or unit cost",
                self.material_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn steel(cost: Decimal) -> RawMaterial {
        RawMaterial {
            id: Uuid::new_v4(),
            material_id: "RM-STL-01".into(),
            name: "Mild steel bar".into(),
            material_type: Some("steel".into()),
            form: Some("bar".into()),
            specifications: None,
            cost_per_unit: Some(cost),
            unit_of_measure: Some("ft".into()),
            stock_quantity: None,
            supplier_id: None,
            notes: None,
        }
    }

    #[test]
    fn snapshot_copies_catalog_cost() {
        let mut material = steel(dec!(4.50));
        let line = RawMaterialLine::snapshot(&material, dec!(10));
        material.cost_per_unit = Some(dec!(9));

        assert_eq!(line.unit_cost, Some(dec!(4.50)));
        assert_eq!(line.total_cost, Some(dec!(45.00)));
        assert_eq!(line.material_name, "Mild steel bar");
    }

    #[test]
    fn quantity_change_recomputes_total() {
        let mut line = RawMaterialLine::snapshot(&steel(dec!(2)), dec!(3));
        line.set_quantity(dec!(5));
        assert_eq!(line.total_cost, Some(dec!(10)));
    }
}
