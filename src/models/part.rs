use super::numeric::{lenient, non_negative, total};
use super::raw_material::RawMaterialLine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A purchased or fabricated part in the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct Part {
    pub id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Part number must be between 1 and 50 characters"))]
    pub part_number: String,
    #[validate(length(min = 1, max = 100, message = "Part name must be between 1 and 100 characters"))]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub selling_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<Decimal>,
    #[serde(default)]
    pub lead_time_days: Option<u32>,
    #[serde(default)]
    pub supplier_id: Option<Uuid>,
    #[serde(default)]
    pub alternative_suppliers: Vec<AlternativeSupplier>,
    /// OEM or competitor part number this part replaces.
    #[serde(default)]
    pub cross_reference: Option<String>,
    #[serde(default)]
    pub replacement_part_id: Option<Uuid>,
    #[serde(default)]
    pub raw_materials: Vec<RawMaterialLine>,
    #[serde(default)]
    pub compatible_machines: Vec<String>,
    #[serde(default)]
    pub is_obsolete: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSupplier {
    pub supplier_id: Uuid,
    #[serde(default)]
    pub supplier_part_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::deserialize", skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub lead_time_days: Option<u32>,
}

pub(crate) fn default_active() -> bool {
    true
}

impl Part {
    /// Sum of the embedded raw-material lines.
    pub fn material_cost(&self) -> Decimal {
        total(self.raw_materials.iter().map(RawMaterialLine::line_cost))
    }

    /// Cost price used for roll-ups. A part built from raw materials costs what its
    /// materials cost; otherwise the stored cost price applies.
    pub fn rolled_up_cost_price(&self) -> Decimal {
        if self.raw_materials.is_empty() {
            non_negative(self.cost_price)
        } else {
            self.material_cost()
        }
    }

    pub fn selling_price(&self) -> Decimal {
        non_negative(self.selling_price)
    }

    /// Gross margin over cost, in percent. `None` when the part has no cost.
    pub fn margin_percent(&self) -> Option<Decimal> {
        let cost = self.rolled_up_cost_price();
        if cost.is_zero() {
            return None;
        }
        (self.selling_price() - cost)
            .checked_div(cost)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    }

    /// Lowest-cost alternative supplier with a known cost.
    pub fn cheapest_alternative(&self) -> Option<&AlternativeSupplier> {
        self.alternative_suppliers
            .iter()
            .filter(|s| s.cost.is_some())
            .min_by_key(|s| non_negative(s.cost))
    }

    pub fn is_quotable(&self) -> bool {
        self.is_active && !self.is_obsolete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bare_part() -> Part {
        serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "part_number": "BRG-6204",
            "name": "Bearing 6204",
            "cost_price": "12.00",
            "selling_price": 18
        }))
        .unwrap()
    }

    #[test]
    fn defaults_apply_to_sparse_records() {
        let part = bare_part();
        assert!(part.is_active);
        assert!(!part.is_obsolete);
        assert!(part.raw_materials.is_empty());
        assert_eq!(part.rolled_up_cost_price(), dec!(12));
    }

    #[test]
    fn raw_materials_replace_stored_cost() {
        let mut part = bare_part();
        part.raw_materials = vec![RawMaterialLine {
            material_id: Uuid::new_v4(),
            material_name: "Chrome steel".into(),
            quantity: Some(dec!(2)),
            unit_cost: Some(dec!(3.25)),
            total_cost: None,
        }];
        assert_eq!(part.material_cost(), dec!(6.50));
        assert_eq!(part.rolled_up_cost_price(), dec!(6.50));
    }

    #[test]
    fn margin_is_relative_to_cost() {
        let part = bare_part();
        assert_eq!(part.margin_percent(), Some(dec!(50)));

        let mut free = bare_part();
        free.cost_price = None;
        assert_eq!(free.margin_percent(), None);
    }

    #[test]
    fn obsolete_parts_are_not_quotable() {
        let mut part = bare_part();
        part.is_obsolete = true;
        assert!(!part.is_quotable());
    }

    #[test]
    fn cheapest_alternative_ignores_unknown_costs() {
        let mut part = bare_part();
        let cheap = Uuid::new_v4();
        part.alternative_suppliers = vec![
            AlternativeSupplier {
                supplier_id: Uuid::new_v4(),
                supplier_part_number: None,
                cost: None,
                lead_time_days: Some(3),
            },
            AlternativeSupplier {
                supplier_id: cheap,
                supplier_part_number: Some("6204-2RS".into()),
                cost: Some(dec!(9.80)),
                lead_time_days: Some(10),
            },
            AlternativeSupplier {
                supplier_id: Uuid::new_v4(),
                supplier_part_number: None,
                cost: Some(dec!(11)),
                lead_time_days: None,
            },
        ];
        assert_eq!(part.cheapest_alternative().map(|s| s.supplier_id), Some(cheap));
    }
}
