//! Node types: parameter templates loaded from description files, and the
//! registry that instantiates them into a `Network`.

use crate::engine::callback::{NodeBehavior, PassiveNode};
use crate::engine::id::{GroupId, NodeId};
use crate::engine::network::Network;
use crate::engine::parameter::Parameter;
use crate::engine::schema::{decode_node_color, GroupSpec, NodeTypeSpec, ParameterSpec};
use crate::engine::value::Color;
use crate::error::{EngineError, EngineResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Category name of node types that are not offered to users.
pub const INTERNAL_CATEGORY: &str = "Internal";

/// Parameters and nested groups copied into every new node of a type.
#[derive(Debug, Clone, Default)]
pub struct GroupTemplate {
    pub name: String,
    pub enabled: bool,
    pub parameters: Vec<Parameter>,
    pub groups: Vec<GroupTemplate>,
}

#[derive(Debug)]
pub struct NodeType {
    name: String,
    category: String,
    color: Color,
    description: String,
    internal: bool,
    erroneous: bool,
    template: GroupTemplate,
    /// (affecting, affected) parameter names.
    affections: Vec<(String, String)>,
    instances: AtomicU32,
}

impl NodeType {
    /// Build a node type from its description.
    ///
    /// Missing name, category or color is an error. Parameters that cannot
    /// be created, duplicate names and an invalid color only mark the type
    /// as erroneous.
    pub fn from_spec(spec: &NodeTypeSpec) -> EngineResult<NodeType> {
        if spec.name.is_empty() || spec.category.is_empty() || spec.color.is_empty() {
            return Err(EngineError::Schema(format!(
                "Node type \"{}\": a required attribute (name, category, color) is missing",
                spec.name
            )));
        }

        let mut erroneous = false;
        let color = match decode_node_color(&spec.color) {
            Ok(color) => color,
            Err(e) => {
                tracing::error!("Node type \"{}\": {}. Using color Black instead.", spec.name, e);
                erroneous = true;
                Color::BLACK
            }
        };

        let root = GroupSpec {
            name: String::new(),
            enabled: true,
            parameters: spec.parameters.clone(),
            groups: spec.groups.clone(),
        };
        let template = build_template(&spec.name, &root, &mut erroneous);

        let mut affections: Vec<(String, String)> = spec
            .affections
            .iter()
            .map(|a| (a.input.clone(), a.output.clone()))
            .collect();
        for parameter in spec.all_parameters() {
            for affected in parameter.affected_names() {
                affections.push((parameter.name.clone(), affected.to_string()));
            }
        }

        tracing::debug!("Node type \"{}\" parsed.", spec.name);
        Ok(NodeType {
            name: spec.name.clone(),
            category: spec.category.clone(),
            color,
            description: spec.description.clone().unwrap_or_default(),
            internal: spec.category == INTERNAL_CATEGORY,
            erroneous,
            template,
            affections,
            instances: AtomicU32::new(0),
        })
    }

    /// Load a TOML or JSON description file.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<NodeType> {
        NodeType::from_spec(&NodeTypeSpec::load(path)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn is_erroneous(&self) -> bool {
        self.erroneous
    }

    pub fn template(&self) -> &GroupTemplate {
        &self.template
    }

    pub fn affections(&self) -> &[(String, String)] {
        &self.affections
    }

    /// Create a node of this type. An empty name becomes the lower-cased
    /// type name followed by a running number.
    pub fn instantiate(
        &self,
        network: &mut Network,
        name: &str,
        behavior: Arc<dyn NodeBehavior>,
    ) -> NodeId {
        let node_name = if name.is_empty() {
            let index = self.instances.fetch_add(1, Ordering::Relaxed) + 1;
            format!("{}{}", self.name.to_lowercase(), index)
        } else {
            name.to_string()
        };

        let node = network.add_typed_node(&node_name, &self.name, behavior);
        if let Some(root) = network.parameter_root(node) {
            populate(network, root, &self.template);
        }
        for (affecting, affected) in &self.affections {
            if let Err(e) = network.add_affection_by_name(node, affecting, affected) {
                tracing::warn!(
                    "Node type \"{}\": affection {} -> {} skipped: {}",
                    self.name,
                    affecting,
                    affected,
                    e
                );
            }
        }
        node
    }
}

fn build_template(type_name: &str, spec: &GroupSpec, erroneous: &mut bool) -> GroupTemplate {
    let mut template = GroupTemplate {
        name: spec.name.clone(),
        enabled: spec.enabled,
        parameters: Vec::new(),
        groups: Vec::new(),
    };
    for parameter in &spec.parameters {
        if template.parameters.iter().any(|p| p.name() == parameter.name) {
            tracing::error!(
                "Node type \"{}\": Parameter with name \"{}\" already exists.",
                type_name,
                parameter.name
            );
            *erroneous = true;
            continue;
        }
        match Parameter::from_spec(parameter) {
            Some(p) => template.parameters.push(p),
            None => {
                tracing::error!(
                    "Node type \"{}\": Parameter \"{}\" could not be created.",
                    type_name,
                    parameter.name
                );
                *erroneous = true;
            }
        }
    }
    for group in &spec.groups {
        template.groups.push(build_template(type_name, group, erroneous));
    }
    template
}

fn populate(network: &mut Network, group: GroupId, template: &GroupTemplate) {
    for parameter in &template.parameters {
        network.add_parameter(group, parameter.clone());
    }
    for sub in &template.groups {
        if let Some(id) = network.add_group(group, &sub.name) {
            populate(network, id, sub);
            if !sub.enabled {
                network.set_group_enabled(id, false);
            }
        }
    }
}

/// Builds the behavior for a new node of a registered type.
pub type BehaviorFactory = Arc<dyn Fn() -> Arc<dyn NodeBehavior> + Send + Sync>;

/// All known node types by name.
#[derive(Default)]
pub struct NodeTypeRegistry {
    types: BTreeMap<String, NodeType>,
    behaviors: HashMap<String, BehaviorFactory>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing (and returning) one of the same name.
    pub fn register(&mut self, node_type: NodeType) -> Option<NodeType> {
        let previous = self.types.insert(node_type.name.clone(), node_type);
        if let Some(previous) = &previous {
            tracing::warn!("Node type \"{}\" registered twice", previous.name);
        }
        previous
    }

    /// Supply the behavior used for new nodes of `type_name`. Types without
    /// one get a `PassiveNode`.
    pub fn register_behavior(&mut self, type_name: &str, factory: BehaviorFactory) {
        self.behaviors.insert(type_name.to_string(), factory);
    }

    /// Load every ".toml" and ".json" description in `dir`. Files that fail
    /// to load are logged and skipped. Returns the number of types loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> EngineResult<usize> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("toml") || e.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match NodeType::load(&path) {
                Ok(node_type) => {
                    tracing::debug!("Loaded node type \"{}\" from {}", node_type.name, path.display());
                    self.register(node_type);
                    loaded += 1;
                }
                Err(e) => tracing::warn!("Skipping node type file {}: {}", path.display(), e),
            }
        }
        tracing::info!("Loaded {} node types from {}", loaded, dir.display());
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Categories of the user-visible node types.
    pub fn categories(&self) -> BTreeSet<&str> {
        self.types
            .values()
            .filter(|t| !t.internal)
            .map(|t| t.category.as_str())
            .collect()
    }

    /// Create a node of the named type in `network`.
    pub fn create_node(&self, network: &mut Network, type_name: &str, name: &str) -> EngineResult<NodeId> {
        let node_type = self
            .get(type_name)
            .ok_or_else(|| EngineError::Schema(format!("Unknown node type \"{}\"", type_name)))?;
        let behavior = match self.behaviors.get(type_name) {
            Some(factory) => factory(),
            None => Arc::new(PassiveNode),
        };
        Ok(node_type.instantiate(network, name, behavior))
    }
}

/// Shorthand for a spec with only a name, a type and an optional pin.
pub fn parameter_spec(name: &str, type_name: &str, pin: Option<&str>) -> ParameterSpec {
    ParameterSpec {
        name: name.to_string(),
        parameter_type: type_name.to_string(),
        pin: pin.map(str::to_string),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::AffectionSpec;
    use crate::engine::value::Value;

    fn blend_spec() -> NodeTypeSpec {
        NodeTypeSpec {
            name: "Blend".into(),
            category: "Compositing".into(),
            color: "120, 80, 200".into(),
            description: None,
            parameters: vec![
                parameter_spec("factor", "Float", Some("in")),
                parameter_spec("result", "Float", Some("out")),
            ],
            groups: vec![GroupSpec {
                name: "advanced".into(),
                enabled: false,
                parameters: vec![parameter_spec("bias", "Float", None)],
                groups: Vec::new(),
            }],
            affections: vec![AffectionSpec {
                input: "factor".into(),
                output: "result".into(),
            }],
        }
    }

    #[test]
    fn test_missing_required_attribute() {
        let mut spec = blend_spec();
        spec.category.clear();
        assert!(matches!(NodeType::from_spec(&spec), Err(EngineError::Schema(_))));
    }

    #[test]
    fn test_invalid_color_marks_erroneous() {
        let mut spec = blend_spec();
        spec.color = "purple".into();
        let node_type = NodeType::from_spec(&spec).unwrap();
        assert!(node_type.is_erroneous());
        assert_eq!(node_type.color(), Color::BLACK);
    }

    #[test]
    fn test_bad_parameter_marks_erroneous() {
        let mut spec = blend_spec();
        spec.parameters.push(parameter_spec("bad[0]", "Float", None));
        spec.parameters.push(parameter_spec("factor", "Int", None));
        let node_type = NodeType::from_spec(&spec).unwrap();
        assert!(node_type.is_erroneous());
        assert_eq!(node_type.template().parameters.len(), 2);
    }

    #[test]
    fn test_internal_category() {
        let mut spec = blend_spec();
        spec.category = INTERNAL_CATEGORY.into();
        assert!(NodeType::from_spec(&spec).unwrap().is_internal());
    }

    #[test]
    fn test_instantiate_copies_template_and_affections() {
        let node_type = NodeType::from_spec(&blend_spec()).unwrap();
        let mut net = Network::new();
        let first = node_type.instantiate(&mut net, "", Arc::new(PassiveNode));
        let second = node_type.instantiate(&mut net, "", Arc::new(PassiveNode));

        assert_eq!(net.node_name(first), Some("blend1"));
        assert_eq!(net.node_name(second), Some("blend2"));
        assert_eq!(net.node_type_name(first), Some("Blend"));

        let factor = net.find_parameter(first, "factor").unwrap();
        let result = net.find_parameter(first, "result").unwrap();
        assert_eq!(net.affected_parameters(factor), &[result]);

        let bias = net.find_parameter(first, "advanced > bias").unwrap();
        assert!(!net.parameter(bias).unwrap().is_enabled());

        // nodes do not share parameters
        net.set_value(factor, Value::Float(3.0), false).unwrap();
        let other = net.find_parameter(second, "factor").unwrap();
        assert_eq!(net.value(other), Some(&Value::Float(0.0)));
    }

    #[test]
    fn test_registry_create_node() {
        let mut registry = NodeTypeRegistry::new();
        registry.register(NodeType::from_spec(&blend_spec()).unwrap());
        let mut net = Network::new();

        let node = registry.create_node(&mut net, "Blend", "mix").unwrap();
        assert_eq!(net.node_name(node), Some("mix"));
        assert!(registry.create_node(&mut net, "Missing", "").is_err());
        assert_eq!(registry.categories().into_iter().collect::<Vec<_>>(), vec!["Compositing"]);
    }

    #[test]
    fn test_registry_load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("blend.toml"),
            blend_spec().to_toml().unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = NodeTypeRegistry::new();
        assert_eq!(registry.load_dir(dir.path()).unwrap(), 1);
        assert!(registry.get("Blend").is_some());
    }
}
