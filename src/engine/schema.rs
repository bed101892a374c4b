//! Declarative parameter schemas.
//!
//! Node types describe their parameters in TOML or JSON:
//!
//! ```toml
//! name = "Blend"
//! category = "Compositing"
//! color = "120, 80, 200"
//!
//! [[parameters]]
//! name = "factor"
//! type = "Float"
//! default_value = "0.5"
//! pin = "in"
//!
//! [[parameters]]
//! name = "result"
//! type = "Float"
//! pin = "out"
//!
//! [[affections]]
//! input = "factor"
//! output = "result"
//! ```
//!
//! All scalar attributes are kept as strings so that the decoding rules
//! (size clamping, "*" multiplicities, comma separated defaults) stay in one
//! place: `Parameter::from_spec`.

use crate::engine::parameter::{
    EnumerationSettings, FilenameKind, InputMethod, NumberSettings, Parameter, ParameterSettings,
};
use crate::engine::types::{
    decode_size, Multiplicity, ParameterType, PinType, ENUMERATION_SEPARATOR,
};
use crate::engine::value::{Color, Value};
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One entry of an enumeration's literal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiteralSpec {
    Literal {
        name: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        value: String,
    },
    Separator,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplicity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub self_evaluating: bool,
    /// Comma separated names of parameters of the same node this one affects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affects: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// "in" or "out".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_size: Option<String>,
    /// File dialog filters, separated by ", ".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub literals: Vec<LiteralSpec>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type: parameter_type.name().to_string(),
            ..Default::default()
        }
    }

    /// Names listed in `affects`.
    pub fn affected_names(&self) -> Vec<&str> {
        self.affects
            .as_deref()
            .map(|a| a.split(',').map(str::trim).filter(|n| !n.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// A nested parameter group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSpec {
    pub name: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
}

impl Default for GroupSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            parameters: Vec::new(),
            groups: Vec::new(),
        }
    }
}

/// Declares that `input` affects `output` inside one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectionSpec {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTypeSpec {
    pub name: String,
    pub category: String,
    /// Integer "r, g, b" channels.
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affections: Vec<AffectionSpec>,
}

impl NodeTypeSpec {
    pub fn from_toml(content: &str) -> EngineResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_toml(&self) -> EngineResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a description file; the format follows the extension
    /// (".json", anything else is read as TOML).
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let spec = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        };
        spec.map_err(|e| e.with_context(format!("Failed to parse {}", path.display())))
    }

    /// Every parameter spec in declaration order, nested groups included.
    pub fn all_parameters(&self) -> Vec<&ParameterSpec> {
        fn collect<'a>(group: &'a GroupSpec, out: &mut Vec<&'a ParameterSpec>) {
            out.extend(group.parameters.iter());
            for sub in &group.groups {
                collect(sub, out);
            }
        }
        let mut out: Vec<&ParameterSpec> = self.parameters.iter().collect();
        for group in &self.groups {
            collect(group, &mut out);
        }
        out
    }
}

// ── Decoding ──

impl Parameter {
    /// Build a parameter from its declarative description.
    ///
    /// Returns `None` (and logs why) when the name contains '[' or ']', the
    /// type is unknown or the default value cannot be converted.
    pub fn from_spec(spec: &ParameterSpec) -> Option<Parameter> {
        let name = spec.name.as_str();
        if name.contains('[') || name.contains(']') {
            tracing::error!(
                "Parameter \"{}\": parameter names must not contain brackets.",
                name
            );
            return None;
        }
        let Some(parameter_type) = ParameterType::from_name(&spec.parameter_type) else {
            tracing::error!(
                "Parameter \"{}\": unknown parameter type \"{}\".",
                name,
                spec.parameter_type
            );
            return None;
        };
        let size = decode_size(spec.size.as_deref().unwrap_or("1"));

        let default_text = match spec.default_value.as_deref() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ if parameter_type.is_number() => vec!["0"; size.max(1)].join(", "),
            _ if parameter_type == ParameterType::Color => "0, 0, 0".to_string(),
            _ => String::new(),
        };
        let default_value = match parameter_type {
            // resolved against the literals below
            ParameterType::Enumeration => Value::Enumeration(0),
            ParameterType::Color => match Color::decode_float(&default_text) {
                Some(color) => Value::Color(color),
                None => {
                    tracing::error!(
                        "Parameter \"{}\": the color value \"{}\" is invalid.",
                        name,
                        default_text
                    );
                    return None;
                }
            },
            _ if default_text.is_empty() => parameter_type.default_value(),
            t => match Value::parse_components(t, &default_text, size) {
                Some(value) => value,
                None => {
                    tracing::error!(
                        "Parameter \"{}\": the default value \"{}\" could not be converted to {}.",
                        name,
                        default_text,
                        t
                    );
                    return None;
                }
            },
        };

        let mut parameter = Parameter::create(name, parameter_type, Some(default_value));
        parameter.size = size;
        parameter.set_multiplicity(Multiplicity::decode(
            spec.multiplicity.as_deref().unwrap_or("1"),
        ));
        parameter.visible = spec.visible.unwrap_or(true);
        parameter.enabled = spec.enabled.unwrap_or(true);
        parameter.read_only = spec.read_only;
        parameter.self_evaluating = spec.self_evaluating;
        parameter.description = spec.description.clone().unwrap_or_default();
        parameter.pin_type = PinType::decode(spec.pin.as_deref().unwrap_or_default());

        match &mut parameter.settings {
            ParameterSettings::Number(number) => apply_number_settings(number, parameter_type, spec),
            ParameterSettings::Filename(filename) => {
                filename.filters = spec
                    .filter
                    .as_deref()
                    .unwrap_or_default()
                    .replace(", ", ";;");
                if filename.kind != FilenameKind::Directory && spec.input_method.as_deref() == Some("save") {
                    filename.kind = FilenameKind::Save;
                }
                if parameter_type == ParameterType::Filename {
                    parameter.read_only = true;
                }
            }
            ParameterSettings::Enumeration(enumeration) => {
                *enumeration = decode_literals(&spec.literals);
                let index = enumeration
                    .index_of(&default_text)
                    .map(|i| i as i32)
                    .or_else(|| default_text.trim().parse().ok())
                    .unwrap_or(0);
                parameter.value = Value::Enumeration(index);
                parameter.default_value = Value::Enumeration(index);
            }
            ParameterSettings::PlugIn { call } => {
                *call = spec.input_method.clone().unwrap_or_default();
            }
            ParameterSettings::Plain => {}
        }
        Some(parameter)
    }

    /// Describe this parameter so that `from_spec` rebuilds the same type,
    /// default value, size, multiplicity and pin direction.
    pub fn to_spec(&self) -> ParameterSpec {
        let mut spec = ParameterSpec::new(&self.name, self.parameter_type);
        if self.size != 1 {
            spec.size = Some(self.size.to_string());
        }
        if self.multiplicity != Multiplicity::default() {
            spec.multiplicity = Some(self.multiplicity.encode());
        }
        spec.default_value = encode_default(self);
        spec.visible = (!self.visible).then_some(false);
        spec.enabled = (!self.enabled).then_some(false);
        spec.read_only = self.read_only;
        spec.self_evaluating = self.self_evaluating;
        spec.pin = self.pin_type.encode().map(str::to_string);
        if !self.description.is_empty() {
            spec.description = Some(self.description.clone());
        }

        match &self.settings {
            ParameterSettings::Number(number) => {
                if !number.unit.is_empty() {
                    spec.unit = Some(number.unit.clone());
                }
                if number.input_method != InputMethod::default() {
                    spec.input_method = Some(number.input_method.name().to_string());
                }
                if self.parameter_type != ParameterType::Color {
                    spec.min_value = Some(number.min_value.display_string());
                    spec.max_value = Some(number.max_value.display_string());
                    spec.step_size = Some(number.step_size.to_string());
                }
            }
            ParameterSettings::Filename(filename) => {
                if !filename.filters.is_empty() {
                    spec.filter = Some(filename.filters.replace(";;", ", "));
                }
                if filename.kind == FilenameKind::Save {
                    spec.input_method = Some("save".to_string());
                }
                // forced on load
                spec.read_only = false;
            }
            ParameterSettings::Enumeration(enumeration) => {
                spec.literals = encode_literals(enumeration);
            }
            ParameterSettings::PlugIn { call } => {
                if !call.is_empty() {
                    spec.input_method = Some(call.clone());
                }
            }
            ParameterSettings::Plain => {}
        }
        spec
    }
}

fn apply_number_settings(number: &mut NumberSettings, parameter_type: ParameterType, spec: &ParameterSpec) {
    number.unit = spec.unit.clone().unwrap_or_default();
    number.input_method = InputMethod::decode(spec.input_method.as_deref().unwrap_or_default());
    if parameter_type == ParameterType::Color {
        return;
    }
    if let Some(min) = spec
        .min_value
        .as_deref()
        .and_then(|t| Value::parse_scalar(parameter_type, t))
    {
        number.min_value = min;
    }
    if let Some(max) = spec
        .max_value
        .as_deref()
        .and_then(|t| Value::parse_scalar(parameter_type, t))
    {
        number.max_value = max;
    }
    if let Some(step) = spec.step_size.as_deref().and_then(|t| t.trim().parse().ok()) {
        number.step_size = step;
    }
}

fn decode_literals(literals: &[LiteralSpec]) -> EnumerationSettings {
    let mut settings = EnumerationSettings::default();
    for literal in literals {
        match literal {
            LiteralSpec::Literal { name, value } => {
                settings.literals.push(name.clone());
                settings.values.push(value.clone());
            }
            LiteralSpec::Separator => {
                settings.literals.push(ENUMERATION_SEPARATOR.to_string());
                settings.values.push(String::new());
            }
        }
    }
    settings
}

fn encode_literals(settings: &EnumerationSettings) -> Vec<LiteralSpec> {
    settings
        .literals
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if settings.is_separator(i) {
                LiteralSpec::Separator
            } else {
                LiteralSpec::Literal {
                    name: name.clone(),
                    value: settings.values.get(i).cloned().unwrap_or_default(),
                }
            }
        })
        .collect()
}

fn encode_default(parameter: &Parameter) -> Option<String> {
    let text = match &parameter.default_value {
        Value::Empty | Value::Group(_) => return None,
        Value::Color(c) => [c.r, c.g, c.b]
            .iter()
            .map(|channel| (f64::from(*channel) / 255.0).to_string())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Vector3(_) | Value::List(_) => parameter
            .default_value
            .components()
            .iter()
            .map(Value::display_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Enumeration(i) => match parameter.enumeration_default_literal(*i) {
            Some(literal) => literal.to_string(),
            None => i.to_string(),
        },
        other => other.display_string(),
    };
    Some(text)
}

impl Parameter {
    fn enumeration_default_literal(&self, index: i32) -> Option<&str> {
        let ParameterSettings::Enumeration(settings) = &self.settings else {
            return None;
        };
        let index = usize::try_from(index).ok()?;
        settings.literal(index).filter(|_| !settings.is_separator(index))
    }
}

/// Decode a node type color ("r, g, b" integer channels).
pub fn decode_node_color(text: &str) -> EngineResult<Color> {
    Color::decode_int(text)
        .ok_or_else(|| EngineError::Schema(format!("The color value \"{}\" is invalid", text)))
}
