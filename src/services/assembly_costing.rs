use super::ledger::{labor_totals, material_total};
use crate::models::numeric::{non_negative, product, total};
use crate::models::{SubAssembly, SubAssemblyPartLine};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

const MINUTES_PER_HOUR: Decimal = dec!(60);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubAssemblyCost {
    pub parts_cost: Decimal,
    pub materials_cost: Decimal,
    pub labor_cost: Decimal,
    pub labor_hours: Decimal,
    pub total_cost: Decimal,
    pub selling_price: Decimal,
    pub assembly_time_minutes: Decimal,
}

/// Applies a markup percentage to a cost.
pub fn apply_markup(cost: Decimal, markup_percent: Decimal) -> Decimal {
    product(cost, Decimal::ONE + non_negative(Some(markup_percent)) / Decimal::ONE_HUNDRED)
}

/// Rolls up a sub-assembly from its part lines, material lines and labor.
///
/// Part lines are costed at their snapshotted unit cost, not the live catalog price.
pub fn cost_sub_assembly(sub_assembly: &SubAssembly) -> SubAssemblyCost {
    let parts_cost = total(sub_assembly.parts.iter().map(SubAssemblyPartLine::line_cost));
    let materials_cost = material_total(&sub_assembly.raw_materials);
    let labor = labor_totals(&sub_assembly.labor_entries);

    let total_cost = total([parts_cost, materials_cost, labor.total_cost]);

    SubAssemblyCost {
        parts_cost,
        materials_cost,
        labor_cost: labor.total_cost,
        labor_hours: labor.total_hours,
        total_cost,
        selling_price: apply_markup(total_cost, sub_assembly.markup()),
        assembly_time_minutes: product(labor.total_hours, MINUTES_PER_HOUR),
    }
}

impl SubAssembly {
    /// Refreshes every line total and derived field from the current lines.
    pub fn recompute(&mut self) -> SubAssemblyCost {
        self.parts.iter_mut().for_each(SubAssemblyPartLine::recompute);
        self.raw_materials.iter_mut().for_each(|line| line.recompute());

        let cost = cost_sub_assembly(self);
        self.total_parts_cost = cost.parts_cost;
        self.total_materials_cost = cost.materials_cost;
        self.total_labor_cost = cost.labor_cost;
        self.total_cost = cost.total_cost;
        self.selling_price = cost.selling_price;
        self.assembly_time_minutes = cost.assembly_time_minutes;
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LaborEntry, RawMaterialLine};
    use uuid::Uuid;

    fn part_line(qty: Decimal, unit_cost: Decimal) -> SubAssemblyPartLine {
        SubAssemblyPartLine {
            part_id: Uuid::new_v4(),
            part_name: "part".into(),
            part_number: "P".into(),
            quantity: Some(qty),
            unit_cost: Some(unit_cost),
            total_cost: None,
        }
    }

    fn spindle_head() -> SubAssembly {
        let mut sa = SubAssembly::new("SA-100", "Spindle head");
        sa.parts = vec![part_line(dec!(2), dec!(30)), part_line(dec!(1), dec!(40))];
        sa.raw_materials = vec![RawMaterialLine {
            material_id: Uuid::new_v4(),
            material_name: "Aluminium plate".into(),
            quantity: Some(dec!(5)),
            unit_cost: Some(dec!(10)),
            total_cost: None,
        }];
        sa.labor_entries = vec![LaborEntry::new("assembly", dec!(2), dec!(60))];
        sa.markup_percent = Some(dec!(25));
        sa
    }

    #[test]
    fn rolls_up_parts_materials_and_labor() {
        let cost = cost_sub_assembly(&spindle_head());
        assert_eq!(cost.parts_cost, dec!(100));
        assert_eq!(cost.materials_cost, dec!(50));
        assert_eq!(cost.labor_cost, dec!(120));
        assert_eq!(cost.total_cost, dec!(270));
        assert_eq!(cost.selling_price, dec!(337.50));
        assert_eq!(cost.assembly_time_minutes, dec!(120));
    }

    #[test]
    fn zero_markup_sells_at_cost() {
        let mut sa = spindle_head();
        sa.markup_percent = Some(Decimal::ZERO);
        let cost = cost_sub_assembly(&sa);
        assert_eq!(cost.selling_price, cost.total_cost);
    }

    #[test]
    fn missing_markup_uses_default() {
        let mut sa = spindle_head();
        sa.markup_percent = None;
        assert_eq!(cost_sub_assembly(&sa).selling_price, dec!(337.50));
    }

    #[test]
    fn recompute_writes_derived_fields() {
        let mut sa = spindle_head();
        sa.parts[0].set_quantity(dec!(3));
        let cost = sa.recompute();

        assert_eq!(sa.total_parts_cost, dec!(130));
        assert_eq!(sa.total_cost, dec!(300));
        assert_eq!(sa.selling_price, dec!(375));
        assert_eq!(sa.parts[0].total_cost, Some(dec!(90)));
        assert_eq!(cost.total_cost, sa.total_cost);
    }

    #[test]
    fn empty_assembly_costs_nothing() {
        let cost = cost_sub_assembly(&SubAssembly::new("SA-0", "Empty"));
        assert_eq!(cost, SubAssemblyCost::default());
    }
}
