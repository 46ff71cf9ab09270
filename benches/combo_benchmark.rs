// benches/combo_benchmark.rs
use combogvn::ir::function::Function;
use combogvn::ir::instruction::{Instruction, InstructionKind, IrBinaryOp};
use combogvn::ir::optimizer::combo::{ComboConfig, combo};
use combogvn::ir::test_support::FunctionBuilder;
use combogvn::ir::types::IrType;
use combogvn::ir::value::literal::IrLiteralValue;
use combogvn::ir::value::{Value, ValueId};
use criterion::measurement::WallTime;
use criterion::{BenchmarkGroup, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

fn configure_benchmark_group(group: &mut BenchmarkGroup<WallTime>, warm_up: u64, measurement: u64) {
    group
        .significance_level(0.005)
        .sample_size(200)
        .confidence_level(0.99)
        .warm_up_time(Duration::from_secs(warm_up))
        .measurement_time(Duration::from_secs(measurement));
}

/// A straight-line chain `v0 = 1; v1 = v0 + 1; v2 = v1 + 1; ...` — every
/// step is a constant the propagation engine must carry one hop further,
/// exercising the worklist's steady-state throughput.
fn constant_chain(len: usize) -> Function {
    let mut builder = FunctionBuilder::new("chain");
    let mut prev = Value::new_literal(IrLiteralValue::I32(0));
    let mut last = prev.clone();
    for _ in 0..len {
        let result = Value::new_temporary(ValueId::new(), IrType::I32);
        let add = Instruction::new(InstructionKind::Binary {
            op: IrBinaryOp::Add,
            left: prev,
            right: Value::new_literal(IrLiteralValue::I32(1)),
            ty: IrType::I32,
        })
        .with_result(result.clone());
        builder = builder.push("entry", add);
        prev = result.clone();
        last = result;
    }
    builder.ret("entry", last, IrType::I32).build()
}

/// `count` duplicated additions over the same two operands, each assigned
/// to its own block — every pair should land in one congruence class once
/// refinement runs, stressing partition-table growth under global CSE.
fn congruent_additions_across_blocks(count: usize) -> Function {
    let x = Value::new_temporary(ValueId::new(), IrType::I32);
    let y = Value::new_temporary(ValueId::new(), IrType::I32);
    let mut builder = FunctionBuilder::new("congruent")
        .push("entry", Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }).with_result(x.clone()))
        .push("entry", Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }).with_result(y.clone()));

    let mut last = x.clone();
    for i in 0..count {
        let label = format!("b{i}");
        let prev_label = if i == 0 { "entry".to_string() } else { format!("b{}", i - 1) };
        let result = Value::new_temporary(ValueId::new(), IrType::I32);
        let add = Instruction::new(InstructionKind::Binary {
            op: IrBinaryOp::Add,
            left: x.clone(),
            right: y.clone(),
            ty: IrType::I32,
        })
        .with_result(result.clone());
        builder = builder.block(&label).edge(&prev_label, &label).push(&label, add);
        builder = builder.branch(&prev_label, &label);
        last = result;
    }
    let final_label = format!("b{}", count - 1);
    builder.ret(&final_label, last, IrType::I32).build()
}

/// `depth` nested diamonds (`cond ? literal_a : literal_b`, then join),
/// each join re-merging into a fresh Phi — exercises reachability
/// propagation and Phi-identity folding together.
fn nested_diamonds(depth: usize) -> Function {
    let mut builder = FunctionBuilder::new("diamonds");
    let mut join_value = Value::new_literal(IrLiteralValue::I32(0));
    let mut current = "entry".to_string();
    for i in 0..depth {
        let then_label = format!("then{i}");
        let else_label = format!("else{i}");
        let join_label = format!("join{i}");
        let phi_result = Value::new_temporary(ValueId::new(), IrType::I32);

        builder = builder
            .block(&then_label)
            .block(&else_label)
            .block(&join_label)
            .cond_branch(&current, Value::new_literal(IrLiteralValue::Bool(i % 2 == 0)), &then_label, &else_label)
            .edge(&current, &then_label)
            .edge(&current, &else_label)
            .branch(&then_label, &join_label)
            .edge(&then_label, &join_label)
            .branch(&else_label, &join_label)
            .edge(&else_label, &join_label)
            .push(
                &join_label,
                combogvn::ir::test_support::phi(
                    phi_result.clone(),
                    IrType::I32,
                    vec![(join_value.clone(), then_label.as_str()), (join_value.clone(), else_label.as_str())],
                ),
            );

        join_value = phi_result;
        current = join_label;
    }
    builder.ret(&current, join_value, IrType::I32).build()
}

pub fn benchmark_constant_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("combo-constant-chain");
    configure_benchmark_group(&mut group, 2, 8);

    for len in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter_batched(
                || constant_chain(len),
                |mut func| {
                    combo(black_box(&mut func), &ComboConfig::default()).unwrap();
                    black_box(&func);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

pub fn benchmark_cross_block_congruence(c: &mut Criterion) {
    let mut group = c.benchmark_group("combo-congruent-additions");
    configure_benchmark_group(&mut group, 2, 8);

    for count in [10usize, 50, 200] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || congruent_additions_across_blocks(count),
                |mut func| {
                    combo(black_box(&mut func), &ComboConfig::default()).unwrap();
                    black_box(&func);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

pub fn benchmark_nested_diamonds(c: &mut Criterion) {
    let mut group = c.benchmark_group("combo-nested-diamonds");
    configure_benchmark_group(&mut group, 2, 8);

    for depth in [5usize, 20, 50] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || nested_diamonds(depth),
                |mut func| {
                    combo(black_box(&mut func), &ComboConfig::default()).unwrap();
                    black_box(&func);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Same congruence workload with `global_cse: false`, to see the cost of
/// the extra block-keyed discriminant in the initial partition split.
pub fn benchmark_local_cse(c: &mut Criterion) {
    let mut group = c.benchmark_group("combo-local-cse");
    configure_benchmark_group(&mut group, 2, 8);

    let config = ComboConfig { global_cse: false, ..ComboConfig::default() };
    for count in [10usize, 50, 200] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || congruent_additions_across_blocks(count),
                |mut func| {
                    combo(black_box(&mut func), &config).unwrap();
                    black_box(&func);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_constant_propagation,
    benchmark_cross_block_congruence,
    benchmark_nested_diamonds,
    benchmark_local_cse
);
criterion_main!(benches);
