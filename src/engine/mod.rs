//! The parameter dependency-and-evaluation engine.
//!
//! A `Network` owns nodes, each with a tree of parameter groups and
//! parameters. Parameters are linked by two edge kinds:
//!
//! - **connections** join an output parameter of one node to an input
//!   parameter of another
//! - **affects edges** link parameters inside one node
//!
//! Writes mark parameters dirty downstream; reads with evaluation pull
//! fresh values upstream and run the node callbacks bound to each
//! parameter.

pub mod callback;
pub mod connection;
pub mod event;
pub mod group;
pub mod id;
pub mod key;
pub mod network;
pub mod node_type;
pub mod parameter;
mod propagation;
pub mod schema;
pub mod shared;
pub mod types;
pub mod value;

pub use callback::{callback, Callback, CallbackKind, NodeBehavior, NodeContext, PassiveNode};
pub use connection::Connection;
pub use event::{EventBus, ParameterEvent};
pub use group::ParameterGroup;
pub use id::{AbstractParameterId, ConnectionId, GroupId, NodeId, ParameterId};
pub use key::{Key, KeyType};
pub use network::{Network, ParameterFilter};
pub use node_type::{NodeType, NodeTypeRegistry};
pub use parameter::{InputMethod, Parameter, ParameterSettings};
pub use schema::{AffectionSpec, GroupSpec, LiteralSpec, NodeTypeSpec, ParameterSpec};
pub use shared::SharedNetwork;
pub use types::{Multiplicity, ParameterType, PinType};
pub use value::{Color, ResourceHandle, Value};
