//! Static parameter tables: type names, display colors, default values and
//! the multiplicity allow-list, plus the small string decoders used by the
//! schema loader.

use crate::engine::value::{Color, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of scalar values one parameter may pack.
pub const MAX_SIZE: usize = 65536;

/// Separator between group names in nested parameter paths.
pub const PATH_SEPARATOR: &str = " > ";

/// Literal name used for separator entries in enumeration literal lists.
pub const ENUMERATION_SEPARATOR: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    Bool,
    Int,
    UnsignedInt,
    Float,
    String,
    Filename,
    Directory,
    Color,
    Enumeration,
    TextInfo,
    Command,
    Geometry,
    Light,
    Camera,
    Image,
    Group,
    PlugIn,
    Generic,
    Label,
}

const ALL_TYPES: [ParameterType; 19] = [
    ParameterType::Bool,
    ParameterType::Int,
    ParameterType::UnsignedInt,
    ParameterType::Float,
    ParameterType::String,
    ParameterType::Filename,
    ParameterType::Directory,
    ParameterType::Color,
    ParameterType::Enumeration,
    ParameterType::TextInfo,
    ParameterType::Command,
    ParameterType::Geometry,
    ParameterType::Light,
    ParameterType::Camera,
    ParameterType::Image,
    ParameterType::Group,
    ParameterType::PlugIn,
    ParameterType::Generic,
    ParameterType::Label,
];

/// Types for which more than one incoming connection is legal.
const MULTIPLICITY_TYPES: [ParameterType; 10] = [
    ParameterType::Bool,
    ParameterType::Int,
    ParameterType::UnsignedInt,
    ParameterType::Float,
    ParameterType::Geometry,
    ParameterType::Light,
    ParameterType::Camera,
    ParameterType::Image,
    ParameterType::Group,
    ParameterType::Generic,
];

impl ParameterType {
    pub fn all() -> &'static [ParameterType] {
        &ALL_TYPES
    }

    pub fn name(self) -> &'static str {
        match self {
            ParameterType::Bool => "Bool",
            ParameterType::Int => "Int",
            ParameterType::UnsignedInt => "UnsignedInt",
            ParameterType::Float => "Float",
            ParameterType::String => "String",
            ParameterType::Filename => "Filename",
            ParameterType::Directory => "Directory",
            ParameterType::Color => "Color",
            ParameterType::Enumeration => "Enumeration",
            ParameterType::TextInfo => "TextInfo",
            ParameterType::Command => "Command",
            ParameterType::Geometry => "Geometry",
            ParameterType::Light => "Light",
            ParameterType::Camera => "Camera",
            ParameterType::Image => "Image",
            ParameterType::Group => "Group",
            ParameterType::PlugIn => "PlugIn",
            ParameterType::Generic => "Generic",
            ParameterType::Label => "Label",
        }
    }

    /// Look up a type by its schema name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<ParameterType> {
        ALL_TYPES.iter().copied().find(|t| t.name() == name)
    }

    /// Pin and widget color for parameters of this type.
    pub fn color(self) -> Color {
        match self {
            ParameterType::Bool => Color::rgb(158, 109, 158),
            ParameterType::Int => Color::rgb(226, 88, 62),
            ParameterType::UnsignedInt => Color::rgb(206, 68, 42),
            ParameterType::Float => Color::rgb(109, 173, 158),
            ParameterType::String => Color::rgb(109, 255, 255),
            ParameterType::Filename | ParameterType::Directory => Color::rgb(173, 173, 255),
            ParameterType::Color => Color::rgb(255, 109, 255),
            ParameterType::Enumeration => Color::rgb(173, 158, 173),
            ParameterType::TextInfo => Color::rgb(174, 174, 174),
            ParameterType::Command => Color::rgb(10, 78, 255),
            ParameterType::Geometry => Color::rgb(255, 192, 171),
            ParameterType::Light => Color::rgb(255, 255, 109),
            ParameterType::Camera => Color::rgb(109, 158, 255),
            ParameterType::Image => Color::rgb(109, 255, 109),
            ParameterType::Group => Color::rgb(100, 100, 100),
            ParameterType::PlugIn => Color::rgb(128, 128, 128),
            ParameterType::Generic => Color::WHITE,
            ParameterType::Label => Color::rgb(255, 245, 195),
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            ParameterType::Bool => Value::Bool(false),
            ParameterType::Int => Value::Int(0),
            ParameterType::UnsignedInt => Value::UnsignedInt(0),
            ParameterType::Float => Value::Float(0.0),
            ParameterType::String | ParameterType::TextInfo => Value::String(String::new()),
            ParameterType::Filename | ParameterType::Directory => Value::Path(Default::default()),
            ParameterType::Color => Value::Color(Color::BLACK),
            ParameterType::Enumeration => Value::Enumeration(0),
            ParameterType::Group => Value::Group(None),
            ParameterType::Command
            | ParameterType::Geometry
            | ParameterType::Light
            | ParameterType::Camera
            | ParameterType::Image
            | ParameterType::PlugIn
            | ParameterType::Generic
            | ParameterType::Label => Value::Empty,
        }
    }

    pub fn supports_multiplicity(self) -> bool {
        MULTIPLICITY_TYPES.contains(&self)
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            ParameterType::Int | ParameterType::UnsignedInt | ParameterType::Float
        )
    }

    /// True for types whose value is text.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            ParameterType::String
                | ParameterType::TextInfo
                | ParameterType::Label
                | ParameterType::Filename
                | ParameterType::Directory
        )
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which side of a connection a parameter may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinType {
    #[default]
    None,
    Input,
    Output,
}

impl PinType {
    /// "in"/"0" is an input, "out"/"1" an output, anything else no pin.
    pub fn decode(text: &str) -> PinType {
        match text {
            "in" | "0" => PinType::Input,
            "out" | "1" => PinType::Output,
            _ => PinType::None,
        }
    }

    pub fn encode(self) -> Option<&'static str> {
        match self {
            PinType::Input => Some("in"),
            PinType::Output => Some("out"),
            PinType::None => None,
        }
    }

    #[inline]
    pub fn is_pin(self) -> bool {
        self != PinType::None
    }
}

/// How many connections a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multiplicity {
    Invalid,
    Exactly(u32),
    OneOrMore,
}

impl Default for Multiplicity {
    fn default() -> Self {
        Multiplicity::Exactly(1)
    }
}

impl Multiplicity {
    /// Map a raw count: negative is invalid, zero means unbounded.
    pub fn from_count(count: i64) -> Multiplicity {
        match count {
            c if c < 0 => Multiplicity::Invalid,
            0 => Multiplicity::OneOrMore,
            c => Multiplicity::Exactly(u32::try_from(c).unwrap_or(u32::MAX)),
        }
    }

    /// "*" means one-or-more; integers map through `from_count`.
    pub fn decode(text: &str) -> Multiplicity {
        if text == "*" {
            return Multiplicity::OneOrMore;
        }
        match text.trim().parse::<i64>() {
            Ok(count) => Multiplicity::from_count(count),
            Err(_) => Multiplicity::Invalid,
        }
    }

    pub fn encode(self) -> String {
        match self {
            Multiplicity::Invalid => "-1".to_string(),
            Multiplicity::Exactly(n) => n.to_string(),
            Multiplicity::OneOrMore => "*".to_string(),
        }
    }

    /// True when more than one connection is permitted.
    pub fn is_multiple(self) -> bool {
        match self {
            Multiplicity::Exactly(n) => n > 1,
            Multiplicity::OneOrMore => true,
            Multiplicity::Invalid => false,
        }
    }

    /// Whether one more connection fits given `current` existing ones.
    pub fn accepts(self, current: usize) -> bool {
        match self {
            Multiplicity::Exactly(n) => current < n as usize,
            Multiplicity::OneOrMore => true,
            Multiplicity::Invalid => false,
        }
    }
}

/// Decode a size attribute. Values above `MAX_SIZE` are clamped, values
/// that are not unsigned integers fall back to 1.
pub fn decode_size(text: &str) -> usize {
    match text.trim().parse::<usize>() {
        Ok(size) if size > MAX_SIZE => {
            tracing::warn!(
                "Parameters can only contain {} values of a given type. The size value \"{}\" will be clamped to {}.",
                MAX_SIZE,
                text,
                MAX_SIZE
            );
            MAX_SIZE
        }
        Ok(size) => size,
        Err(_) => {
            tracing::error!(
                "The parameter's size value \"{}\" could not be converted to an unsigned integer number.",
                text
            );
            1
        }
    }
}
