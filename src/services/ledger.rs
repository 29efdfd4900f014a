//! Labor and material ledgers: the leaf sums every roll-up is built on.
//!
//! Both ledgers are tolerant. A missing, non-numeric or negative value contributes
//! zero instead of failing the sum.

use crate::models::numeric::{plus, total};
use crate::models::{LaborEntry, MachineLabor, RawMaterialLine};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LaborTotals {
    pub total_hours: Decimal,
    pub total_cost: Decimal,
}

pub fn labor_totals(entries: &[LaborEntry]) -> LaborTotals {
    entries.iter().fold(LaborTotals::default(), |acc, entry| LaborTotals {
        total_hours: plus(acc.total_hours, entry.hours()),
        total_cost: plus(acc.total_cost, entry.cost()),
    })
}

/// Labor totals of a machine, from whichever labor form it carries.
pub fn machine_labor_totals(labor: &MachineLabor) -> LaborTotals {
    match labor {
        MachineLabor::Entries(entries) => labor_totals(entries),
        legacy @ MachineLabor::Legacy { .. } => labor_totals(&legacy.entries()),
    }
}

pub fn material_total(lines: &[RawMaterialLine]) -> Decimal {
    total(lines.iter().map(RawMaterialLine::line_cost))
}
