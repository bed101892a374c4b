//! Frapper engine demo
//!
//! Builds a small node network, pushes edits through it and logs what the
//! evaluation engine pulls back out.
//!
//! Usage: `frapper [CONFIG] [NODE_TYPE_DIR]`

use anyhow::Context;
use frapper_core::{
    config::EngineConfig,
    engine::{callback, Network, NodeTypeRegistry, Parameter, ParameterEvent, ParameterType},
    Value,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::load_from(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => EngineConfig::load_or_default(),
    };
    let types_dir = args.next().map(PathBuf::from);

    // Initialize logging
    let file_writer = config.logging.log_dir.as_ref().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, "frapper.log");
        tracing_appender::non_blocking(appender)
    });
    let (file_layer, _guard) = match file_writer {
        Some((writer, guard)) => (
            Some(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        ),
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting Frapper engine demo");

    let mut network = Network::with_config(config.evaluation.clone());
    let events = network.subscribe();

    run_connection_demo(&mut network)?;
    run_affection_demo(&mut network)?;

    if let Some(dir) = types_dir {
        run_node_type_demo(&mut network, &dir)?;
    }

    let observed: Vec<ParameterEvent> = events.try_iter().collect();
    let dirtied = observed
        .iter()
        .filter(|e| matches!(e, ParameterEvent::Dirtied { .. }))
        .count();
    tracing::info!(
        "{} parameter events observed, {} dirtied",
        observed.len(),
        dirtied
    );

    Ok(())
}

/// An output on one node feeding an input on another.
fn run_connection_demo(network: &mut Network) -> anyhow::Result<()> {
    let source = network.add_passive_node("source");
    let sink = network.add_passive_node("sink");
    let source_root = network
        .parameter_root(source)
        .context("source node has no parameter root")?;
    let sink_root = network
        .parameter_root(sink)
        .context("sink node has no parameter root")?;

    let out = network
        .add_parameter(
            source_root,
            Parameter::output("outA", ParameterType::Float).with_default(1.0),
        )
        .context("failed to add outA")?;
    let input = network
        .add_parameter(sink_root, Parameter::input("inB", ParameterType::Float))
        .context("failed to add inB")?;

    let connection = network.connect(out, input)?;
    tracing::info!(
        "{}",
        network.connection_name(connection).unwrap_or_default()
    );

    let value = network.get_value(input, true)?;
    tracing::info!(
        "{} = {} (dirty: {})",
        network.path(input),
        value.display_string(),
        network.is_dirty(input)
    );

    network.set_value(out, Value::Float(4.5), true)?;
    let value = network.get_value(input, true)?;
    tracing::info!("{} = {} after edit", network.path(input), value.display_string());
    Ok(())
}

/// Two parameters inside one node, the second doubling the first.
fn run_affection_demo(network: &mut Network) -> anyhow::Result<()> {
    let node = network.add_passive_node("doubler");
    let root = network
        .parameter_root(node)
        .context("doubler node has no parameter root")?;

    let a = network
        .add_parameter(root, Parameter::create("a", ParameterType::Float, None))
        .context("failed to add a")?;
    let b = network
        .add_parameter(root, Parameter::create("b", ParameterType::Float, None))
        .context("failed to add b")?;
    network.add_affection(a, b)?;
    network.set_processing_function(
        b,
        Some(callback(|ctx| {
            let a = ctx.value("a")?.as_float().unwrap_or_default();
            ctx.set_current_value(a * 2.0)
        })),
    );

    network.set_value(a, Value::Float(21.0), true)?;
    network.propagate_evaluation(b)?;
    let value = network.get_value(b, false)?;
    tracing::info!("{} = {}", network.path(b), value.display_string());
    Ok(())
}

fn run_node_type_demo(network: &mut Network, dir: &Path) -> anyhow::Result<()> {
    let mut registry = NodeTypeRegistry::new();
    let loaded = registry
        .load_dir(dir)
        .with_context(|| format!("Failed to read node types from {}", dir.display()))?;
    tracing::info!("Loaded {} node types from {}", loaded, dir.display());

    let names: Vec<String> = registry.names().map(str::to_string).collect();
    for name in names {
        let node = registry.create_node(network, &name, "")?;
        let root = network
            .parameter_root(node)
            .context("node has no parameter root")?;
        for parameter in network.all_parameters(root) {
            if let Some(p) = network.parameter(parameter) {
                tracing::info!("  {} = {}", network.path(parameter), p.value_string());
            }
        }
    }
    Ok(())
}
