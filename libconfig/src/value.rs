//! Setting type tags, scalar values and the typed codec.
//!
//! [`FromSetting`] and [`IntoSetting`] convert between a stored [`Value`] and
//! host scalar types. Reads are width-checked: an `Int64` setting can be read
//! as `i32` only when the value fits, and a `Float64` setting can be read as
//! `f32` only when the value survives the conversion exactly. Anything else
//! fails with [`Decode::Narrowing`]; values are never silently truncated.

use std::fmt;

/// Type tag of a setting.
///
/// `None` is never carried by a live setting; it is what
/// [`crate::Config::type_of`] reports for a path that does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingType {
    None,
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Group,
    Array,
    List,
}

impl SettingType {
    /// Whether settings of this type hold a single value.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            SettingType::Bool
                | SettingType::Int32
                | SettingType::Int64
                | SettingType::Float32
                | SettingType::Float64
                | SettingType::String
        )
    }

    /// Whether settings of this type hold children.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            SettingType::Group | SettingType::Array | SettingType::List
        )
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            SettingType::Int32 | SettingType::Int64 | SettingType::Float32 | SettingType::Float64
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SettingType::None => "None",
            SettingType::Bool => "Bool",
            SettingType::Int32 => "Int32",
            SettingType::Int64 => "Int64",
            SettingType::Float32 => "Float32",
            SettingType::Float64 => "Float64",
            SettingType::String => "String",
            SettingType::Group => "Group",
            SettingType::Array => "Array",
            SettingType::List => "List",
        }
    }
}

impl fmt::Display for SettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value held by a scalar setting.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl Value {
    /// Type tag matching this value.
    pub fn setting_type(&self) -> SettingType {
        match self {
            Value::Bool(_) => SettingType::Bool,
            Value::Int32(_) => SettingType::Int32,
            Value::Int64(_) => SettingType::Int64,
            Value::Float32(_) => SettingType::Float32,
            Value::Float64(_) => SettingType::Float64,
            Value::String(_) => SettingType::String,
        }
    }

    /// Zero value for a scalar type, `None` for aggregates and `None`.
    pub fn zero(ty: SettingType) -> Option<Value> {
        match ty {
            SettingType::Bool => Some(Value::Bool(false)),
            SettingType::Int32 => Some(Value::Int32(0)),
            SettingType::Int64 => Some(Value::Int64(0)),
            SettingType::Float32 => Some(Value::Float32(0.0)),
            SettingType::Float64 => Some(Value::Float64(0.0)),
            SettingType::String => Some(Value::String(String::new())),
            SettingType::None | SettingType::Group | SettingType::Array | SettingType::List => {
                None
            }
        }
    }
}

/// Reason a stored value could not be decoded into a host type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    /// The stored value belongs to a different type family.
    Mismatch,
    /// Same family, but the value does not fit the requested width.
    Narrowing,
}

/// Host types that can be read out of a scalar setting.
pub trait FromSetting: Sized {
    /// Tag a stored value carries when no width conversion is involved.
    const TYPE: SettingType;

    /// Decodes `value`, failing instead of truncating.
    fn from_value(value: &Value) -> Result<Self, Decode>;
}

/// Host types that can be stored into a scalar setting.
pub trait IntoSetting {
    /// Tag the target setting must carry.
    const TYPE: SettingType;

    fn into_value(self) -> Value;
}

impl FromSetting for bool {
    const TYPE: SettingType = SettingType::Bool;

    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(Decode::Mismatch),
        }
    }
}

impl FromSetting for i32 {
    const TYPE: SettingType = SettingType::Int32;

    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::Int32(v) => Ok(*v),
            Value::Int64(v) => i32::try_from(*v).map_err(|_| Decode::Narrowing),
            _ => Err(Decode::Mismatch),
        }
    }
}

impl FromSetting for i64 {
    const TYPE: SettingType = SettingType::Int64;

    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::Int32(v) => Ok(i64::from(*v)),
            Value::Int64(v) => Ok(*v),
            _ => Err(Decode::Mismatch),
        }
    }
}

impl FromSetting for u32 {
    const TYPE: SettingType = SettingType::Int32;

    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::Int32(v) => u32::try_from(*v).map_err(|_| Decode::Narrowing),
            Value::Int64(v) => u32::try_from(*v).map_err(|_| Decode::Narrowing),
            _ => Err(Decode::Mismatch),
        }
    }
}

impl FromSetting for u64 {
    const TYPE: SettingType = SettingType::Int64;

    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::Int32(v) => u64::try_from(*v).map_err(|_| Decode::Narrowing),
            Value::Int64(v) => u64::try_from(*v).map_err(|_| Decode::Narrowing),
            _ => Err(Decode::Mismatch),
        }
    }
}

impl FromSetting for f32 {
    const TYPE: SettingType = SettingType::Float32;

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::Float32(v) => Ok(*v),
            Value::Float64(v) => {
                let narrowed = *v as f32;
                // NaN never compares equal but carries no information to lose.
                if v.is_nan() || f64::from(narrowed) == *v {
                    Ok(narrowed)
                } else {
                    Err(Decode::Narrowing)
                }
            }
            _ => Err(Decode::Mismatch),
        }
    }
}

impl FromSetting for f64 {
    const TYPE: SettingType = SettingType::Float64;

    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::Float32(v) => Ok(f64::from(*v)),
            Value::Float64(v) => Ok(*v),
            _ => Err(Decode::Mismatch),
        }
    }
}

impl FromSetting for String {
    const TYPE: SettingType = SettingType::String;

    fn from_value(value: &Value) -> Result<Self, Decode> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(Decode::Mismatch),
        }
    }
}

macro_rules! into_setting {
    ($ty:ty, $tag:ident) => {
        impl IntoSetting for $ty {
            const TYPE: SettingType = SettingType::$tag;

            fn into_value(self) -> Value {
                Value::$tag(self)
            }
        }
    };
}

into_setting!(bool, Bool);
into_setting!(i32, Int32);
into_setting!(i64, Int64);
into_setting!(f32, Float32);
into_setting!(f64, Float64);
into_setting!(String, String);

impl IntoSetting for &str {
    const TYPE: SettingType = SettingType::String;

    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}
