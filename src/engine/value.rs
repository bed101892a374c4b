//! Parameter values.
//!
//! `Value` is a closed sum type over everything a parameter can hold. Each
//! parameter type maps to one native representation; multi-valued
//! parameters hold either a packed `Vector3` (three floats) or a `List`.

use crate::engine::id::GroupId;
use crate::engine::types::ParameterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Decode "r, g, b" integer channels (0-255). Extra parts are ignored.
    pub fn decode_int(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let r = parts[0].parse::<u8>().ok()?;
        let g = parts[1].parse::<u8>().ok()?;
        let b = parts[2].parse::<u8>().ok()?;
        Some(Color::rgb(r, g, b))
    }

    /// Decode "r, g, b" float channels in the range 0.0-1.0.
    pub fn decode_float(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let mut channels = [0u8; 3];
        for (channel, part) in channels.iter_mut().zip(&parts) {
            let f = part.parse::<f64>().ok()?;
            if !(0.0..=1.0).contains(&f) {
                return None;
            }
            *channel = (f * 255.0).round() as u8;
        }
        Some(Color::rgb(channels[0], channels[1], channels[2]))
    }

    /// Decode the four-channel "r g b a" form used by display strings.
    pub fn decode_rgba(parts: &[&str]) -> Option<Self> {
        if parts.len() != 4 {
            return None;
        }
        let mut channels = [0u8; 4];
        for (channel, part) in channels.iter_mut().zip(parts) {
            *channel = part.trim().parse::<u8>().ok()?;
        }
        Some(Color::rgba(channels[0], channels[1], channels[2], channels[3]))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.r, self.g, self.b, self.a)
    }
}

/// Opaque reference to an externally managed resource (mesh, light,
/// camera, texture). The engine only stores and compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(pub String);

impl ResourceHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Empty,
    Bool(bool),
    Int(i32),
    UnsignedInt(u32),
    Float(f64),
    String(String),
    Path(PathBuf),
    Color(Color),
    Enumeration(i32),
    Vector3([f64; 3]),
    List(Vec<Value>),
    Handle(ResourceHandle),
    Group(Option<GroupId>),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Number of scalar components packed into this value.
    pub fn component_count(&self) -> usize {
        match self {
            Value::Vector3(_) => 3,
            Value::List(values) => values.len(),
            _ => 1,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) | Value::Enumeration(i) => Some(*i != 0),
            Value::UnsignedInt(u) => Some(*u != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) | Value::Enumeration(i) => Some(i64::from(*i)),
            Value::UnsignedInt(u) => Some(i64::from(*u)),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) | Value::Enumeration(i) => Some(f64::from(*i)),
            Value::UnsignedInt(u) => Some(f64::from(*u)),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Path(p) => p.to_str(),
            Value::Handle(h) => Some(h.key()),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<[f64; 3]> {
        match self {
            Value::Vector3(v) => Some(*v),
            Value::List(values) if values.len() == 3 => {
                let mut v = [0.0; 3];
                for (slot, value) in v.iter_mut().zip(values) {
                    *slot = value.as_float()?;
                }
                Some(v)
            }
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    /// Split a packed value into its scalar components.
    pub fn components(&self) -> Vec<Value> {
        match self {
            Value::Vector3(v) => v.iter().map(|c| Value::Float(*c)).collect(),
            Value::List(values) => values.clone(),
            other => vec![other.clone()],
        }
    }

    /// Human-readable form: vectors and lists are space separated, colors
    /// are written as "r g b a".
    pub fn display_string(&self) -> String {
        match self {
            Value::Empty | Value::Group(_) => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) | Value::Enumeration(i) => i.to_string(),
            Value::UnsignedInt(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Path(p) => p.display().to_string(),
            Value::Color(c) => c.to_string(),
            Value::Vector3([x, y, z]) => format!("{} {} {}", x, y, z),
            Value::List(values) => values
                .iter()
                .map(Value::display_string)
                .collect::<Vec<_>>()
                .join(" "),
            Value::Handle(h) => h.key().to_string(),
        }
    }

    /// Parse a single scalar of the given type from text.
    ///
    /// Returns `None` when the text cannot be converted. Resource and group
    /// types accept only the empty string.
    pub fn parse_scalar(parameter_type: ParameterType, text: &str) -> Option<Value> {
        let trimmed = text.trim();
        match parameter_type {
            ParameterType::Bool => match trimmed {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" | "" => Some(Value::Bool(false)),
                _ => None,
            },
            ParameterType::Int => trimmed.parse().ok().map(Value::Int),
            ParameterType::UnsignedInt => trimmed.parse().ok().map(Value::UnsignedInt),
            ParameterType::Float => trimmed.parse().ok().map(Value::Float),
            ParameterType::Enumeration => trimmed.parse().ok().map(Value::Enumeration),
            ParameterType::String
            | ParameterType::TextInfo
            | ParameterType::Label
            | ParameterType::PlugIn
            | ParameterType::Command
            | ParameterType::Generic => Some(Value::String(text.to_string())),
            ParameterType::Filename | ParameterType::Directory => {
                Some(Value::Path(PathBuf::from(text)))
            }
            ParameterType::Color => {
                let parts: Vec<&str> = split_components(trimmed);
                Color::decode_rgba(&parts)
                    .or_else(|| Color::decode_int(trimmed))
                    .map(Value::Color)
            }
            ParameterType::Geometry
            | ParameterType::Light
            | ParameterType::Camera
            | ParameterType::Image => {
                if trimmed.is_empty() {
                    Some(Value::Empty)
                } else {
                    Some(Value::Handle(ResourceHandle::new(trimmed)))
                }
            }
            ParameterType::Group => trimmed.is_empty().then_some(Value::Group(None)),
        }
    }

    /// Parse `size` comma-separated components. Three floats are packed into
    /// a `Vector3`; any other multi-valued result becomes a `List`.
    pub fn parse_components(parameter_type: ParameterType, text: &str, size: usize) -> Option<Value> {
        if size <= 1 {
            return Value::parse_scalar(parameter_type, text);
        }
        let values = text
            .split(',')
            .take(size)
            .map(|part| Value::parse_scalar(parameter_type, part))
            .collect::<Option<Vec<_>>>()?;
        Some(Value::pack(values))
    }

    /// Pack a list of scalars, using `Vector3` for exactly three floats.
    pub fn pack(values: Vec<Value>) -> Value {
        if values.len() == 3 && values.iter().all(|v| matches!(v, Value::Float(_))) {
            let mut v = [0.0; 3];
            for (slot, value) in v.iter_mut().zip(&values) {
                *slot = value.as_float().unwrap_or_default();
            }
            Value::Vector3(v)
        } else {
            Value::List(values)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UnsignedInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Value::Vector3(v)
    }
}

/// Split on ", " if present, otherwise on whitespace.
pub(crate) fn split_components(text: &str) -> Vec<&str> {
    if text.contains(", ") {
        text.split(", ").collect()
    } else {
        text.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_string_vector_and_color() {
        assert_eq!(Value::Vector3([1.0, 2.5, -3.0]).display_string(), "1 2.5 -3");
        assert_eq!(Value::Color(Color::rgba(1, 2, 3, 4)).display_string(), "1 2 3 4");
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list.display_string(), "1 2");
    }

    #[test]
    fn test_parse_components_packs_vector3() {
        let v = Value::parse_components(ParameterType::Float, "1, 2, 3", 3).unwrap();
        assert_eq!(v, Value::Vector3([1.0, 2.0, 3.0]));

        let v = Value::parse_components(ParameterType::Int, "4, 5", 2).unwrap();
        assert_eq!(v, Value::List(vec![Value::Int(4), Value::Int(5)]));
    }

    #[test]
    fn test_parse_scalar_rejects_garbage() {
        assert!(Value::parse_scalar(ParameterType::Int, "abc").is_none());
        assert!(Value::parse_scalar(ParameterType::Bool, "maybe").is_none());
        assert_eq!(
            Value::parse_scalar(ParameterType::Bool, "1"),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn test_decode_float_color() {
        assert_eq!(Color::decode_float("1, 0, 0.5"), Some(Color::rgb(255, 0, 128)));
        assert_eq!(Color::decode_float("1, 0"), None);
        assert_eq!(Color::decode_int("10,20,30"), Some(Color::rgb(10, 20, 30)));
    }

    #[test]
    fn test_component_count() {
        assert_eq!(Value::Float(1.0).component_count(), 1);
        assert_eq!(Value::Vector3([0.0; 3]).component_count(), 3);
        assert_eq!(Value::List(vec![Value::Bool(true); 5]).component_count(), 5);
    }
}
