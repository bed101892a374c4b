//! # Frapper Core: parameter dependency-and-evaluation engine
//!
//! Nodes expose typed parameters. Output parameters connect to input
//! parameters of other nodes, and parameters inside one node declare which
//! others they affect. The engine tracks staleness along both edge kinds
//! and recomputes values lazily when they are read.
//!
//! ## Architecture
//!
//! - **Engine**: arena-backed `Network` with dirty, aux-dirty and
//!   evaluation passes that detect cycles instead of recursing forever
//! - **Schema**: node types described in TOML or JSON and instantiated
//!   through a `NodeTypeRegistry`
//! - **Events**: value and connection notifications delivered over
//!   crossbeam channels
//!
//! ## Configuration
//!
//! Engine settings (cycle policy, propagation depth, logging) are read from
//! `engine.toml` in the platform config directory under `org.frapper.engine`.
//!
//! ## Example
//!
//! ```ignore
//! use frapper_core::engine::{callback, Network, Parameter, ParameterType, Value};
//!
//! let mut net = Network::new();
//! let source = net.add_passive_node("source");
//! let sink = net.add_passive_node("sink");
//! let out = net.add_parameter(net.parameter_root(source)?, Parameter::output("out", ParameterType::Float))?;
//! let inp = net.add_parameter(net.parameter_root(sink)?, Parameter::input("in", ParameterType::Float))?;
//!
//! net.connect(out, inp)?;
//! net.set_value(out, Value::Float(2.0), true)?;
//! assert_eq!(net.get_value(inp, true)?, Value::Float(2.0));
//! ```

pub mod config;
pub mod engine;
pub mod error;

// Re-export commonly used types
pub use config::{EngineConfig, EvaluationConfig};
pub use engine::{
    Network, NodeBehavior, NodeContext, NodeId, Parameter, ParameterId, ParameterType, PinType,
    SharedNetwork, Value,
};
pub use error::{EngineError, EngineResult, ResultExt};
