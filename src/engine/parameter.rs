//! The parameter record.
//!
//! A `Parameter` holds everything that belongs to the value slot itself:
//! type, size, multiplicity, current and default value, pin direction,
//! flags and the bound callbacks. Graph membership (owning node, parent
//! group, connections, affects edges) lives in the `Network` arena so that
//! a `Parameter` can be built, cloned and inspected without a graph.

use crate::engine::callback::CallbackTable;
use crate::engine::id::GroupId;
use crate::engine::types::{Multiplicity, ParameterType, PinType, ENUMERATION_SEPARATOR};
use crate::engine::value::{Color, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputMethod {
    #[default]
    SpinBox,
    Slider,
    SliderPlusSpinBox,
}

impl InputMethod {
    pub fn decode(text: &str) -> InputMethod {
        match text {
            "SliderPlusSpinBox" => InputMethod::SliderPlusSpinBox,
            "Slider" => InputMethod::Slider,
            _ => InputMethod::SpinBox,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InputMethod::SpinBox => "SpinBox",
            InputMethod::Slider => "Slider",
            InputMethod::SliderPlusSpinBox => "SliderPlusSpinBox",
        }
    }
}

/// Limits and presentation hints for number and color parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberSettings {
    pub min_value: Value,
    pub max_value: Value,
    pub step_size: f64,
    pub unit: String,
    pub input_method: InputMethod,
}

impl NumberSettings {
    pub fn for_type(parameter_type: ParameterType) -> Self {
        let (min_value, max_value) = match parameter_type {
            ParameterType::Int => (Value::Int(-100), Value::Int(100)),
            ParameterType::UnsignedInt => (Value::UnsignedInt(0), Value::UnsignedInt(100)),
            _ => (Value::Float(-100.0), Value::Float(100.0)),
        };
        Self {
            min_value,
            max_value,
            step_size: 1.0,
            unit: String::new(),
            input_method: InputMethod::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenameKind {
    #[default]
    Open,
    Save,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilenameSettings {
    /// Dialog filters, separated by ";;".
    pub filters: String,
    pub kind: FilenameKind,
}

/// Literal names with their optional values. Separators are stored as
/// `ENUMERATION_SEPARATOR` with an empty value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumerationSettings {
    pub literals: Vec<String>,
    pub values: Vec<String>,
}

impl EnumerationSettings {
    pub fn literal(&self, index: usize) -> Option<&str> {
        self.literals.get(index).map(String::as_str)
    }

    pub fn index_of(&self, literal: &str) -> Option<usize> {
        self.literals.iter().position(|l| l == literal)
    }

    pub fn is_separator(&self, index: usize) -> bool {
        self.literal(index) == Some(ENUMERATION_SEPARATOR)
    }
}

/// Type-specialised configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParameterSettings {
    #[default]
    Plain,
    Number(NumberSettings),
    Filename(FilenameSettings),
    Enumeration(EnumerationSettings),
    PlugIn { call: String },
}

impl ParameterSettings {
    pub fn for_type(parameter_type: ParameterType) -> Self {
        match parameter_type {
            ParameterType::Int
            | ParameterType::UnsignedInt
            | ParameterType::Float
            | ParameterType::Color => {
                ParameterSettings::Number(NumberSettings::for_type(parameter_type))
            }
            ParameterType::Filename => ParameterSettings::Filename(FilenameSettings::default()),
            ParameterType::Directory => ParameterSettings::Filename(FilenameSettings {
                filters: String::new(),
                kind: FilenameKind::Directory,
            }),
            ParameterType::Enumeration => {
                ParameterSettings::Enumeration(EnumerationSettings::default())
            }
            ParameterType::PlugIn => ParameterSettings::PlugIn {
                call: String::new(),
            },
            _ => ParameterSettings::Plain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) parameter_type: ParameterType,
    pub(crate) size: usize,
    pub(crate) multiplicity: Multiplicity,
    pub(crate) value: Value,
    pub(crate) default_value: Value,
    /// Values accumulated from every incoming connection.
    pub(crate) value_list: Vec<Value>,
    pub(crate) pin_type: PinType,
    pub(crate) description: String,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) read_only: bool,
    pub(crate) self_evaluating: bool,
    pub(crate) dirty: bool,
    pub(crate) aux_dirty: bool,
    pub(crate) settings: ParameterSettings,
    pub(crate) callbacks: CallbackTable,
}

impl Parameter {
    /// Build a plain parameter holding `default_value`.
    pub fn new(name: impl Into<String>, parameter_type: ParameterType, default_value: Value) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            size: default_value.component_count(),
            multiplicity: Multiplicity::default(),
            value: default_value.clone(),
            default_value,
            value_list: Vec::new(),
            pin_type: PinType::None,
            description: String::new(),
            visible: true,
            enabled: true,
            read_only: false,
            self_evaluating: false,
            dirty: false,
            aux_dirty: false,
            settings: ParameterSettings::Plain,
            callbacks: CallbackTable::default(),
        }
    }

    /// Factory: uses the type's default when `default_value` is `None` and
    /// attaches the settings record matching the type.
    pub fn create(
        name: impl Into<String>,
        parameter_type: ParameterType,
        default_value: Option<Value>,
    ) -> Self {
        let default_value = default_value.unwrap_or_else(|| parameter_type.default_value());
        let mut parameter = Parameter::new(name, parameter_type, default_value);
        parameter.settings = ParameterSettings::for_type(parameter_type);
        parameter
    }

    pub fn input(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Parameter::create(name, parameter_type, None).with_pin_type(PinType::Input)
    }

    pub fn output(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Parameter::create(name, parameter_type, None).with_pin_type(PinType::Output)
    }

    /// An image parameter with the given pin direction and no image yet.
    pub fn create_image(name: impl Into<String>, pin_type: PinType) -> Self {
        Parameter::create(name, ParameterType::Image, None).with_pin_type(pin_type)
    }

    /// A parameter whose value refers to a parameter group.
    pub fn create_group_parameter(name: impl Into<String>, group: Option<GroupId>) -> Self {
        Parameter::create(name, ParameterType::Group, Some(Value::Group(group)))
    }

    // ── Builders ──

    pub fn with_pin_type(mut self, pin_type: PinType) -> Self {
        self.pin_type = pin_type;
        self
    }

    /// Set both the current and the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.size = value.component_count();
        self.value = value.clone();
        self.default_value = value;
        self
    }

    /// Set the current value only.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.set_multiplicity(multiplicity);
        self
    }

    pub fn with_self_evaluating(mut self, self_evaluating: bool) -> Self {
        self.self_evaluating = self_evaluating;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    // ── Accessors ──

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.parameter_type
    }

    pub fn type_color(&self) -> Color {
        self.parameter_type.color()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Returns false and leaves the multiplicity unchanged when the type does
    /// not allow more than one connection. Invalid values are stored as
    /// `Multiplicity::Invalid` and reported.
    pub fn set_multiplicity(&mut self, multiplicity: Multiplicity) -> bool {
        if multiplicity == self.multiplicity {
            return true;
        }
        match multiplicity {
            Multiplicity::Invalid | Multiplicity::Exactly(0) => {
                self.multiplicity = Multiplicity::Invalid;
                tracing::error!("Invalid multiplicity value given for \"{}\"", self.name);
                false
            }
            Multiplicity::Exactly(1) => {
                self.multiplicity = multiplicity;
                true
            }
            _ if self.parameter_type.supports_multiplicity() => {
                self.multiplicity = multiplicity;
                true
            }
            _ => {
                tracing::error!(
                    "A multiplicity value of more than 1 is not supported for parameters of type {}.",
                    self.parameter_type
                );
                false
            }
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    pub fn set_default_value(&mut self, value: Value) {
        self.default_value = value;
    }

    pub fn value_list(&self) -> &[Value] {
        &self.value_list
    }

    /// True if the value equals the default and no value function is bound.
    pub fn has_default_value(&self) -> bool {
        self.value == self.default_value && !self.callbacks.has_value_functions()
    }

    /// Display form of the current value.
    pub fn value_string(&self) -> String {
        self.value.display_string()
    }

    pub fn pin_type(&self) -> PinType {
        self.pin_type
    }

    pub fn set_pin_type(&mut self, pin_type: PinType) {
        self.pin_type = pin_type;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_self_evaluating(&self) -> bool {
        self.self_evaluating
    }

    pub fn set_self_evaluating(&mut self, self_evaluating: bool) {
        self.self_evaluating = self_evaluating;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_aux_dirty(&self) -> bool {
        self.aux_dirty
    }

    pub fn settings(&self) -> &ParameterSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ParameterSettings {
        &mut self.settings
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    /// Literal of the current enumeration value, if this is an enumeration.
    pub fn enumeration_literal(&self) -> Option<&str> {
        let ParameterSettings::Enumeration(settings) = &self.settings else {
            return None;
        };
        let index = usize::try_from(self.value.as_int()?).ok()?;
        settings.literal(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_uses_type_default() {
        let p = Parameter::create("count", ParameterType::UnsignedInt, None);
        assert_eq!(p.value(), &Value::UnsignedInt(0));
        assert_eq!(p.default_value(), &Value::UnsignedInt(0));
        assert_eq!(p.size(), 1);
        assert!(matches!(p.settings(), ParameterSettings::Number(_)));
    }

    #[test]
    fn test_create_vector_sets_size() {
        let p = Parameter::create(
            "position",
            ParameterType::Float,
            Some(Value::Vector3([1.0, 2.0, 3.0])),
        );
        assert_eq!(p.size(), 3);
    }

    #[test]
    fn test_special_factories() {
        let image = Parameter::create_image("texture", PinType::Output);
        assert_eq!(image.parameter_type(), ParameterType::Image);
        assert_eq!(image.pin_type(), PinType::Output);

        let group = Parameter::create_group_parameter("settings", Some(GroupId(3)));
        assert_eq!(group.value(), &Value::Group(Some(GroupId(3))));
        assert_eq!(group.multiplicity(), Multiplicity::Exactly(1));
    }

    #[test]
    fn test_directory_settings() {
        let p = Parameter::create("out", ParameterType::Directory, None);
        match p.settings() {
            ParameterSettings::Filename(f) => assert_eq!(f.kind, FilenameKind::Directory),
            other => panic!("unexpected settings {:?}", other),
        }
    }

    #[test]
    fn test_set_multiplicity_rejects_unsupported_type() {
        let mut p = Parameter::create("label", ParameterType::String, None);
        assert!(!p.set_multiplicity(Multiplicity::OneOrMore));
        assert_eq!(p.multiplicity(), Multiplicity::Exactly(1));

        let mut p = Parameter::create("meshes", ParameterType::Geometry, None);
        assert!(p.set_multiplicity(Multiplicity::OneOrMore));
        assert_eq!(p.multiplicity(), Multiplicity::OneOrMore);
    }

    #[test]
    fn test_set_multiplicity_invalid_is_stored() {
        let mut p = Parameter::create("x", ParameterType::Float, None);
        assert!(!p.set_multiplicity(Multiplicity::Invalid));
        assert_eq!(p.multiplicity(), Multiplicity::Invalid);
    }

    #[test]
    fn test_has_default_value() {
        let mut p = Parameter::create("x", ParameterType::Int, Some(Value::Int(4)));
        assert!(p.has_default_value());
        p.value = Value::Int(5);
        assert!(!p.has_default_value());
    }

    #[test]
    fn test_enumeration_literal() {
        let mut p = Parameter::create("mode", ParameterType::Enumeration, Some(Value::Enumeration(2)));
        p.settings = ParameterSettings::Enumeration(EnumerationSettings {
            literals: vec!["Off".into(), ENUMERATION_SEPARATOR.into(), "On".into()],
            values: vec![String::new(); 3],
        });
        assert_eq!(p.enumeration_literal(), Some("On"));
    }

    #[test]
    fn test_clone_keeps_bindings() {
        let mut p = Parameter::output("out", ParameterType::Float);
        p.callbacks.set(
            crate::engine::callback::CallbackKind::Processing,
            Some(crate::engine::callback::callback(|_| Ok(()))),
        );
        let copy = p.clone();
        assert!(copy
            .callbacks()
            .is_bound(crate::engine::callback::CallbackKind::Processing));
        assert_eq!(copy.pin_type(), PinType::Output);
    }
}
