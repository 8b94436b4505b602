//! Scalar types, values, and identity primitives shared across the engine.

mod column;
mod row_vector;

pub use column::{ColumnBuffer, ColumnData, NullBitmap};
pub use row_vector::RowVector;

use crate::{Result, ToyDbError};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Fixed slot width of STRING column data, NUL-padded.
pub const STRING_WIDTH: usize = 256;

/// Scalar column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Type of the literal NULL before any context assigns it one
    NullConst,
    Int32,
    Int64,
    Double,
    Bool,
    /// Fixed-width 256-byte string, NUL-padded
    String,
}

impl DataType {
    /// Byte size of one value slot
    pub fn size(&self) -> usize {
        match self {
            DataType::NullConst => 0,
            DataType::Int32 => 4,
            DataType::Int64 => 8,
            DataType::Double => 8,
            DataType::Bool => 1,
            DataType::String => STRING_WIDTH,
        }
    }

    /// Alignment of one value slot
    pub fn align(&self) -> usize {
        match self {
            DataType::NullConst => 1,
            DataType::Int32 => 4,
            DataType::Int64 => 8,
            DataType::Double => 8,
            DataType::Bool => 1,
            DataType::String => 1,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }

    /// Parse a manifest/display type name ("INT32", "STRING", ...)
    pub fn parse(s: &str) -> Option<DataType> {
        match s {
            "INT32" => Some(DataType::Int32),
            "INT64" => Some(DataType::Int64),
            "DOUBLE" => Some(DataType::Double),
            "BOOL" => Some(DataType::Bool),
            "STRING" => Some(DataType::String),
            _ => None,
        }
    }

    /// Common type of two operands under the implicit conversion lattice:
    /// INT32 with INT64 widens to INT64, integers with DOUBLE widen to
    /// DOUBLE, BOOL with an integer becomes that integer type, identical
    /// types stay put. Anything else is a type error.
    pub fn common_type(left: DataType, right: DataType) -> Result<DataType> {
        use DataType::*;
        if left == right {
            return Ok(left);
        }
        match (left, right) {
            (Int32, Int64) | (Int64, Int32) => Ok(Int64),
            (Int32, Double) | (Double, Int32) => Ok(Double),
            (Int64, Double) | (Double, Int64) => Ok(Double),
            (Bool, t) if t.is_integral() => Ok(t),
            (t, Bool) if t.is_integral() => Ok(t),
            _ => Err(ToyDbError::Type(format!(
                "no common type for {} and {}",
                left, right
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::NullConst => "NULL",
            DataType::Int32 => "INT32",
            DataType::Int64 => "INT64",
            DataType::Double => "DOUBLE",
            DataType::Bool => "BOOL",
            DataType::String => "STRING",
        };
        write!(f, "{}", s)
    }
}

/// Scalar value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int32(i32),
    Int64(i64),
    Double(f64),
    Bool(bool),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type of the value; NULL carries the NullConst type
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::NullConst,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Double(_) => DataType::Double,
            Value::Bool(_) => DataType::Bool,
            Value::String(_) => DataType::String,
        }
    }

    /// Convert along the lattice. Only widening conversions exist; the
    /// lattice never narrows and the planner never emits float-to-int.
    pub fn cast(&self, target: DataType) -> Result<Value> {
        if self.data_type() == target {
            return Ok(self.clone());
        }
        match (self, target) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::Int32(v), DataType::Int64) => Ok(Value::Int64(*v as i64)),
            (Value::Int32(v), DataType::Double) => Ok(Value::Double(*v as f64)),
            (Value::Int64(v), DataType::Double) => Ok(Value::Double(*v as f64)),
            (Value::Bool(v), DataType::Int32) => Ok(Value::Int32(*v as i32)),
            (Value::Bool(v), DataType::Int64) => Ok(Value::Int64(*v as i64)),
            (v, t) => Err(ToyDbError::Type(format!(
                "cannot cast {} to {}",
                v.data_type(),
                t
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Value::String(v) => write!(f, "'{}'", v),
        }
    }
}

/// Stable table identity. Equality and hashing use `id` only; the name is
/// for display and parser resolution.
#[derive(Debug, Clone)]
pub struct TableId {
    id: u64,
    name: String,
}

impl TableId {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for TableId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TableId {}

impl Hash for TableId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Stable column identity; equality and hashing use `id` only.
#[derive(Debug, Clone)]
pub struct ColumnId {
    id: u64,
    name: String,
    table: Option<TableId>,
}

impl ColumnId {
    /// A free-standing column id, not owned by any table. Used by
    /// operator-level callers that assemble batches by hand.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), table: None }
    }

    pub fn with_table(id: u64, name: impl Into<String>, table: TableId) -> Self {
        Self { id, name: name.into(), table: Some(table) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> Option<&TableId> {
        self.table.as_ref()
    }
}

impl PartialEq for ColumnId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ColumnId {}

impl Hash for ColumnId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_sizes() {
        assert_eq!(DataType::Int32.size(), 4);
        assert_eq!(DataType::Int64.size(), 8);
        assert_eq!(DataType::Double.size(), 8);
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::String.size(), 256);
    }

    #[test]
    fn test_common_type_lattice() {
        use DataType::*;
        assert_eq!(DataType::common_type(Int32, Int64).unwrap(), Int64);
        assert_eq!(DataType::common_type(Int64, Int32).unwrap(), Int64);
        assert_eq!(DataType::common_type(Int32, Double).unwrap(), Double);
        assert_eq!(DataType::common_type(Int64, Double).unwrap(), Double);
        assert_eq!(DataType::common_type(Bool, Int32).unwrap(), Int32);
        assert_eq!(DataType::common_type(Int64, Bool).unwrap(), Int64);
        assert_eq!(DataType::common_type(String, String).unwrap(), String);
        assert!(DataType::common_type(String, Int64).is_err());
        assert!(DataType::common_type(Double, Bool).is_err());
    }

    #[test]
    fn test_value_cast() {
        assert_eq!(
            Value::Int32(7).cast(DataType::Int64).unwrap(),
            Value::Int64(7)
        );
        assert_eq!(
            Value::Int64(7).cast(DataType::Double).unwrap(),
            Value::Double(7.0)
        );
        assert_eq!(
            Value::Bool(true).cast(DataType::Int32).unwrap(),
            Value::Int32(1)
        );
        assert_eq!(Value::Null.cast(DataType::Int64).unwrap(), Value::Null);
        assert!(Value::String("x".into()).cast(DataType::Int64).is_err());
    }

    #[test]
    fn test_identity_by_id_only() {
        let t1 = TableId::new(1, "users");
        let t2 = TableId::new(1, "renamed");
        assert_eq!(t1, t2);

        let a = ColumnId::with_table(3, "id", t1);
        let b = ColumnId::new(3, "other_name");
        assert_eq!(a, b);

        let c = ColumnId::new(4, "id");
        assert_ne!(a, c);
    }
}
