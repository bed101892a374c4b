//! Test data builders for creating networks

use frapper_core::engine::{
    callback, Multiplicity, Network, NodeId, Parameter, ParameterId, ParameterType, PinType,
};
use frapper_core::EvaluationConfig;

/// Builder for creating test Parameters
pub struct ParameterBuilder {
    name: String,
    parameter_type: ParameterType,
    pin_type: PinType,
    default: Option<f64>,
    multiplicity: Multiplicity,
    self_evaluating: bool,
}

impl ParameterBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: ParameterType::Float,
            pin_type: PinType::None,
            default: None,
            multiplicity: Multiplicity::Exactly(1),
            self_evaluating: false,
        }
    }

    pub fn input(mut self) -> Self {
        self.pin_type = PinType::Input;
        self
    }

    pub fn output(mut self) -> Self {
        self.pin_type = PinType::Output;
        self
    }

    pub fn parameter_type(mut self, parameter_type: ParameterType) -> Self {
        self.parameter_type = parameter_type;
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    pub fn self_evaluating(mut self) -> Self {
        self.self_evaluating = true;
        self
    }

    pub fn build(self) -> Parameter {
        let mut parameter = Parameter::create(self.name, self.parameter_type, None)
            .with_pin_type(self.pin_type)
            .with_multiplicity(self.multiplicity)
            .with_self_evaluating(self.self_evaluating);
        if let Some(value) = self.default {
            parameter = parameter.with_default(value);
        }
        parameter
    }
}

/// Builder for a passive node with a flat list of parameters
pub struct NodeBuilder {
    name: String,
    parameters: Vec<ParameterBuilder>,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn parameter(mut self, parameter: ParameterBuilder) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Add the node and return its id plus the parameter ids in order
    pub fn build(self, network: &mut Network) -> (NodeId, Vec<ParameterId>) {
        let node = network.add_passive_node(&self.name);
        let root = network.parameter_root(node).unwrap();
        let ids = self
            .parameters
            .into_iter()
            .map(|p| network.add_parameter(root, p.build()).unwrap())
            .collect();
        (node, ids)
    }
}

/// A linear pipeline: `out0 -> in1 ~> out1 -> in2 ~> ... -> inN`.
///
/// `->` is a connection, `~>` an affects edge inside one node. Every
/// intermediate output copies its input on evaluation.
pub struct Chain {
    pub network: Network,
    pub nodes: Vec<NodeId>,
    pub outputs: Vec<ParameterId>,
    pub inputs: Vec<ParameterId>,
}

impl Chain {
    pub fn source(&self) -> ParameterId {
        self.outputs[0]
    }

    pub fn sink(&self) -> ParameterId {
        *self.inputs.last().unwrap()
    }
}

pub struct ChainBuilder {
    stages: usize,
    config: EvaluationConfig,
}

impl ChainBuilder {
    /// `stages` connections in a row; at least one.
    pub fn new(stages: usize) -> Self {
        Self {
            stages: stages.max(1),
            config: EvaluationConfig::default(),
        }
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_propagation_depth = depth;
        self
    }

    pub fn build(self) -> Chain {
        let mut network = Network::with_config(self.config);
        let mut nodes = Vec::new();
        let mut outputs = Vec::new();
        let mut inputs = Vec::new();

        let (node, ids) = NodeBuilder::new("stage0")
            .parameter(ParameterBuilder::new("out").output().value(1.0))
            .build(&mut network);
        nodes.push(node);
        outputs.push(ids[0]);

        for stage in 1..=self.stages {
            let last = stage == self.stages;
            let mut builder =
                NodeBuilder::new(&format!("stage{}", stage)).parameter(ParameterBuilder::new("in").input());
            if !last {
                builder = builder.parameter(ParameterBuilder::new("out").output());
            }
            let (node, ids) = builder.build(&mut network);
            let input = ids[0];
            let previous = *outputs.last().unwrap();
            network.connect(previous, input).unwrap();
            nodes.push(node);
            inputs.push(input);

            if !last {
                let output = ids[1];
                network.add_affection(input, output).unwrap();
                network.set_processing_function(
                    output,
                    Some(callback(|ctx| {
                        let value = ctx.value("in")?;
                        ctx.set_current_value(value)
                    })),
                );
                outputs.push(output);
            }
        }

        Chain {
            network,
            nodes,
            outputs,
            inputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_builder_shape() {
        let chain = ChainBuilder::new(3).build();
        assert_eq!(chain.nodes.len(), 4);
        assert_eq!(chain.outputs.len(), 3);
        assert_eq!(chain.inputs.len(), 3);
        assert_eq!(chain.network.connection_count(), 3);
    }
}
