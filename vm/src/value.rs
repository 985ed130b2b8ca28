use std::fmt;

use ebmacro_dsl::common::Literal;
use ebmacro_dsl::core::{DataType, TypeClass};

use crate::error::Trap;

/// A runtime value held in a local variable or a device cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Value {
    /// The value a declaration without an initializer starts with.
    pub fn zero(data_type: DataType) -> Self {
        match data_type.class() {
            TypeClass::Boolean => Value::Bool(false),
            TypeClass::Float => Value::Float(0.0),
            _ => Value::Int(0),
        }
    }

    pub fn from_literal(literal: &Literal) -> Result<Self, Trap> {
        match literal {
            Literal::Bool(v) => Ok(Value::Bool(*v)),
            Literal::Int(v) => Ok(Value::Int(*v)),
            Literal::Float(v) => Ok(Value::Float(*v)),
            Literal::Str(_) => Err(Trap::InvalidArgument("text is not a value")),
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Value::Bool(v) => v,
            Value::Int(v) => v != 0,
            Value::Float(v) => v != 0.0,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Value::Bool(v) => v as i64,
            Value::Int(v) => v,
            Value::Float(v) => v as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Value::Bool(v) => (v as i64) as f64,
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Converts the value to the representation of the type. Integers
    /// wrap to the width of the type.
    pub fn coerce(self, data_type: DataType) -> Value {
        match data_type {
            DataType::Bool => Value::Bool(self.as_bool()),
            DataType::Char => Value::Int(self.as_i64() as i8 as i64),
            DataType::UnsignedChar => Value::Int(self.as_i64() as u8 as i64),
            DataType::Short => Value::Int(self.as_i64() as i16 as i64),
            DataType::UnsignedShort => Value::Int(self.as_i64() as u16 as i64),
            DataType::Int => Value::Int(self.as_i64() as i32 as i64),
            DataType::UnsignedInt => Value::Int(self.as_i64() as u32 as i64),
            DataType::Float => Value::Float(self.as_f64() as f32 as f64),
            DataType::Double => Value::Float(self.as_f64()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", *v as i64),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
