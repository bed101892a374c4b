//! Benchmarks for dirty propagation and evaluation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use frapper_core::engine::{callback, Multiplicity, Network, Parameter, ParameterId, ParameterType};
use frapper_core::Value;

/// `out0 -> in1 ~> out1 -> ... -> inN`, every output copying its input.
fn build_chain(stages: usize) -> (Network, ParameterId, ParameterId) {
    let mut network = Network::new();
    let first = network.add_passive_node("stage0");
    let root = network.parameter_root(first).unwrap();
    let source = network
        .add_parameter(root, Parameter::output("out", ParameterType::Float))
        .unwrap();

    let mut previous = source;
    let mut sink = source;
    for stage in 1..=stages {
        let node = network.add_passive_node(&format!("stage{}", stage));
        let root = network.parameter_root(node).unwrap();
        let input = network
            .add_parameter(root, Parameter::input("in", ParameterType::Float))
            .unwrap();
        network.connect(previous, input).unwrap();
        sink = input;

        if stage < stages {
            let output = network
                .add_parameter(root, Parameter::output("out", ParameterType::Float))
                .unwrap();
            network.add_affection(input, output).unwrap();
            network.set_processing_function(
                output,
                Some(callback(|ctx| {
                    let value = ctx.value("in")?;
                    ctx.set_current_value(value)
                })),
            );
            previous = output;
        }
    }
    (network, source, sink)
}

/// One output feeding `fan_out` single-input nodes.
fn build_fan(fan_out: usize) -> (Network, ParameterId, ParameterId) {
    let mut network = Network::new();
    let hub = network.add_passive_node("hub");
    let root = network.parameter_root(hub).unwrap();
    let source = network
        .add_parameter(root, Parameter::output("out", ParameterType::Float))
        .unwrap();
    let merge = network.add_passive_node("merge");
    let merge_root = network.parameter_root(merge).unwrap();
    let merged = network
        .add_parameter(
            merge_root,
            Parameter::input("in", ParameterType::Float).with_multiplicity(Multiplicity::OneOrMore),
        )
        .unwrap();

    for i in 0..fan_out {
        let node = network.add_passive_node(&format!("leaf{}", i));
        let root = network.parameter_root(node).unwrap();
        let input = network
            .add_parameter(root, Parameter::input("in", ParameterType::Float))
            .unwrap();
        let output = network
            .add_parameter(root, Parameter::output("out", ParameterType::Float))
            .unwrap();
        network.connect(source, input).unwrap();
        network.add_affection(input, output).unwrap();
        network.connect(output, merged).unwrap();
    }
    (network, source, merged)
}

fn bench_dirty_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate_dirty_chain");

    for stages in [10, 100, 400].iter() {
        let (mut network, source, _) = build_chain(*stages);
        group.throughput(Throughput::Elements(*stages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stages), stages, |b, _| {
            b.iter(|| {
                network.propagate_dirty(black_box(source), true).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_edit_and_pull_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit_and_pull_chain");

    for stages in [10, 100, 400].iter() {
        let (mut network, source, sink) = build_chain(*stages);
        let mut value = 0.0;
        group.throughput(Throughput::Elements(*stages as u64));
        group.bench_with_input(BenchmarkId::from_parameter(stages), stages, |b, _| {
            b.iter(|| {
                value += 1.0;
                network.set_value(source, Value::Float(value), true).unwrap();
                black_box(network.get_value(sink, true).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_fan_in_collection(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_in_collection");

    for fan_out in [8, 64, 256].iter() {
        let (mut network, source, merged) = build_fan(*fan_out);
        let mut value = 0.0;
        group.bench_with_input(BenchmarkId::from_parameter(fan_out), fan_out, |b, _| {
            b.iter(|| {
                value += 1.0;
                network.set_value(source, Value::Float(value), true).unwrap();
                black_box(network.get_values(merged, true).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_dirty_chain,
    bench_edit_and_pull_chain,
    bench_fan_in_collection
);
criterion_main!(benches);
