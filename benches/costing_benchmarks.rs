use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stateset_quote_engine::{
    cost_machine, cost_sub_assembly,
    models::{
        BomItemSnapshot, BomItemType, LaborEntry, Machine, MachineBomLine, MachineLabor, Part,
        Quote, QuoteLineItem, QuoteLineKind, SubAssembly, SubAssemblyPartLine,
    },
    price_quote,
};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

fn part(i: usize) -> Part {
    serde_json::from_value(serde_json::json!({
        "id": Uuid::new_v4(),
        "part_number": format!("P-{:05}", i),
        "name": format!("Part {}", i),
        "cost_price": "12.75",
        "selling_price": "19.90",
        "lead_time_days": (i % 30) as u32,
    }))
    .expect("part fixture")
}

fn sub_assembly(parts: &[Part]) -> SubAssembly {
    let mut sa = SubAssembly::new("SA-BENCH", "Bench assembly");
    sa.parts = parts
        .iter()
        .map(|p| SubAssemblyPartLine::snapshot(p, dec!(2)))
        .collect();
    sa.labor_entries = vec![LaborEntry::new("assembly", dec!(3.5), dec!(55))];
    sa
}

fn sub_assembly_costing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cost_sub_assembly");

    for size in [5, 50, 500].iter() {
        let parts: Vec<Part> = (0..*size).map(part).collect();
        let sa = sub_assembly(&parts);
        group.bench_with_input(BenchmarkId::from_parameter(size), &sa, |b, sa| {
            b.iter(|| cost_sub_assembly(black_box(sa)))
        });
    }

    group.finish();
}

fn machine_costing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cost_machine");

    for size in [10, 100, 1000].iter() {
        let mut machine = Machine::new("MX-BENCH", "Bench machine");
        machine.labor = MachineLabor::Entries(vec![LaborEntry::new("assembly", dec!(16), dec!(50))]);

        let parts: HashMap<Uuid, Part> = (0..*size).map(part).map(|p| (p.id, p)).collect();
        let nested: Vec<Part> = parts.values().take(10).cloned().collect();
        let sa = sub_assembly(&nested);

        let mut lines: Vec<MachineBomLine> = parts
            .values()
            .map(|p| {
                let snapshot = BomItemSnapshot {
                    item_type: BomItemType::Part,
                    item_id: p.id,
                    name: p.name.clone(),
                    number: p.part_number.clone(),
                    unit_cost: p.rolled_up_cost_price(),
                };
                MachineBomLine::new(machine.id, snapshot, dec!(1))
            })
            .collect();
        lines.push(MachineBomLine::new(
            machine.id,
            BomItemSnapshot {
                item_type: BomItemType::SubAssembly,
                item_id: sa.id,
                name: sa.name.clone(),
                number: sa.assembly_number.clone(),
                unit_cost: cost_sub_assembly(&sa).total_cost,
            },
            dec!(2),
        ));
        let sub_assemblies = HashMap::from([(sa.id, sa)]);

        group.bench_with_input(BenchmarkId::from_parameter(size), &lines, |b, lines| {
            b.iter(|| {
                cost_machine(
                    black_box(&machine),
                    black_box(lines),
                    &sub_assemblies,
                    &parts,
                )
            })
        });
    }

    group.finish();
}

fn quote_pricing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("price_quote");

    for size in [1, 20, 200].iter() {
        let mut quote = Quote::new("Q1700000000000", Uuid::new_v4(), chrono::Utc::now().date_naive());
        for i in 0..*size {
            quote
                .upsert_line(
                    QuoteLineKind::Part,
                    QuoteLineItem::new(Uuid::new_v4(), format!("Part {}", i), format!("P-{}", i), dec!(3), dec!(19.90)),
                )
                .expect("quote line");
        }
        quote.discount_percent = Some(dec!(10));
        quote.tax_rate = Some(dec!(0.08));

        group.bench_with_input(BenchmarkId::from_parameter(size), &quote, |b, quote| {
            b.iter(|| price_quote(black_box(quote)).map(|t| t.total_amount).unwrap_or(Decimal::ZERO))
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets =
        sub_assembly_costing_benchmark,
        machine_costing_benchmark,
        quote_pricing_benchmark
}

criterion_main!(benches);
