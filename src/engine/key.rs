//! Animation keys.
//!
//! A key is a value at a point on a timeline plus the tangent used for
//! Bezier interpolation. Scaling a key scales its value only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Div, DivAssign, Mul, MulAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyType {
    Step,
    #[default]
    Linear,
    Bezier,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub index: f32,
    pub value: f32,
    pub key_type: KeyType,
    pub tangent_index: f32,
    pub tangent_value: f32,
}

impl Key {
    /// A linear key whose tangent sits on the key itself.
    pub fn new(index: f32, value: f32) -> Self {
        Self::with_type(index, value, KeyType::Linear)
    }

    pub fn with_type(index: f32, value: f32, key_type: KeyType) -> Self {
        Self {
            index,
            value,
            key_type,
            tangent_index: index,
            tangent_value: value,
        }
    }

    pub fn bezier(index: f32, value: f32, tangent_index: f32, tangent_value: f32) -> Self {
        Self {
            index,
            value,
            key_type: KeyType::Bezier,
            tangent_index,
            tangent_value,
        }
    }
}

impl Mul<f32> for Key {
    type Output = Key;

    fn mul(self, scalar: f32) -> Key {
        Key {
            value: self.value * scalar,
            ..self
        }
    }
}

/// Division by zero leaves the key unchanged.
impl Div<f32> for Key {
    type Output = Key;

    fn div(self, scalar: f32) -> Key {
        if scalar == 0.0 {
            return self;
        }
        Key {
            value: self.value / scalar,
            ..self
        }
    }
}

impl MulAssign<f32> for Key {
    fn mul_assign(&mut self, scalar: f32) {
        self.value *= scalar;
    }
}

impl DivAssign<f32> for Key {
    fn div_assign(&mut self, scalar: f32) {
        if scalar != 0.0 {
            self.value /= scalar;
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Key({}, {}, {}, {})",
            self.index, self.value, self.tangent_index, self.tangent_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_touches_value_only() {
        let key = Key::bezier(2.0, 4.0, 2.5, 1.0);
        let scaled = key * 0.5;
        assert_eq!(scaled.value, 2.0);
        assert_eq!(scaled.index, 2.0);
        assert_eq!(scaled.tangent_value, 1.0);
        assert_eq!(scaled.key_type, KeyType::Bezier);
    }

    #[test]
    fn test_division_by_zero_is_identity() {
        let key = Key::new(1.0, 3.0);
        assert_eq!(key / 0.0, key);

        let mut key = Key::new(1.0, 3.0);
        key /= 0.0;
        assert_eq!(key.value, 3.0);
        key /= 2.0;
        assert_eq!(key.value, 1.5);
        key *= 4.0;
        assert_eq!(key.value, 6.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::new(1.0, 2.5).to_string(), "Key(1, 2.5, 1, 2.5)");
    }
}
