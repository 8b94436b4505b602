//! Typed boolean predicate expressions with SQL three-valued semantics.
//!
//! A predicate is a pure value tree of column references, constants,
//! casts, comparisons, and logical connectives. Before evaluation the
//! tree is walked once to assign each distinct referenced column a
//! position; batches handed to `evaluate` must carry exactly those
//! columns in that order.

mod result;

pub use result::{Truth, TruthVector};

use crate::data::{ColumnBuffer, ColumnId, DataType, RowVector, Value};
use crate::{Result, ToyDbError};
use ahash::AHashMap;
use std::fmt;

/// Comparison operator of a `Compare` node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Binary logical connective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Map from referenced column identity to its expected position in the
/// evaluation batch.
pub type ColumnIndexMap = AHashMap<ColumnId, i32>;

/// Predicate expression tree
#[derive(Debug, Clone)]
pub enum PredicateExpr {
    /// Reference to a column; `index` is its resolved batch position,
    /// -1 until [`PredicateExpr::initialize_index_map`] runs.
    ColumnRef {
        column_id: ColumnId,
        data_type: DataType,
        index: i32,
    },
    /// Literal value. As a standalone predicate a non-null constant
    /// evaluates TRUE regardless of its type; it normally only feeds an
    /// enclosing Compare or Cast.
    Constant { data_type: DataType, value: Value },
    /// Implicit conversion inserted by the planner where operand types
    /// differ from the comparison's common type.
    Cast {
        target: DataType,
        child: Box<PredicateExpr>,
    },
    Compare {
        op: CompareOp,
        operand_type: DataType,
        left: Box<PredicateExpr>,
        right: Box<PredicateExpr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<PredicateExpr>,
        right: Box<PredicateExpr>,
    },
    Not { child: Box<PredicateExpr> },
}

impl PredicateExpr {
    pub fn column_ref(column_id: ColumnId, data_type: DataType) -> Self {
        PredicateExpr::ColumnRef { column_id, data_type, index: -1 }
    }

    pub fn constant(value: Value) -> Self {
        PredicateExpr::Constant { data_type: value.data_type(), value }
    }

    pub fn cast(target: DataType, child: PredicateExpr) -> Self {
        PredicateExpr::Cast { target, child: Box::new(child) }
    }

    pub fn compare(
        op: CompareOp,
        operand_type: DataType,
        left: PredicateExpr,
        right: PredicateExpr,
    ) -> Self {
        PredicateExpr::Compare {
            op,
            operand_type,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: PredicateExpr, right: PredicateExpr) -> Self {
        PredicateExpr::Logical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right) }
    }

    pub fn or(left: PredicateExpr, right: PredicateExpr) -> Self {
        PredicateExpr::Logical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right) }
    }

    pub fn not(child: PredicateExpr) -> Self {
        PredicateExpr::Not { child: Box::new(child) }
    }

    /// Walk the tree pre-order, numbering each distinct referenced
    /// `ColumnId` in first-encounter order and recording the assigned
    /// index in every `ColumnRef` node. Returns the resulting map; the
    /// map declares the column layout evaluation batches must have.
    pub fn initialize_index_map(&mut self) -> ColumnIndexMap {
        let mut map = ColumnIndexMap::new();
        let mut next = 0i32;
        self.assign_indices(&mut next, &mut map);
        map
    }

    fn assign_indices(&mut self, next: &mut i32, map: &mut ColumnIndexMap) {
        match self {
            PredicateExpr::ColumnRef { column_id, index, .. } => {
                let assigned = *map.entry(column_id.clone()).or_insert_with(|| {
                    let i = *next;
                    *next += 1;
                    i
                });
                *index = assigned;
            }
            PredicateExpr::Constant { .. } => {}
            PredicateExpr::Cast { child, .. } | PredicateExpr::Not { child } => {
                child.assign_indices(next, map);
            }
            PredicateExpr::Compare { left, right, .. }
            | PredicateExpr::Logical { left, right, .. } => {
                left.assign_indices(next, map);
                right.assign_indices(next, map);
            }
        }
    }

    /// Vectorized evaluation over a whole batch. The batch must contain
    /// exactly the referenced columns at their assigned positions.
    pub fn evaluate(&self, batch: &RowVector) -> Result<TruthVector> {
        let rows = batch.row_count();
        match self {
            PredicateExpr::ColumnRef { index, .. } => {
                let col = self.resolve_column(batch, *index)?;
                let mut out = TruthVector::new(rows);
                for row in 0..rows {
                    out.set(row, if col.is_null(row) { Truth::Null } else { Truth::True });
                }
                Ok(out)
            }
            PredicateExpr::Constant { data_type, .. } => {
                let mut out = TruthVector::new(rows);
                out.fill(if *data_type == DataType::NullConst {
                    Truth::Null
                } else {
                    Truth::True
                });
                Ok(out)
            }
            PredicateExpr::Cast { child, .. } => child.evaluate(batch),
            PredicateExpr::Compare { op, operand_type, left, right } => {
                compare_batch(*op, *operand_type, left, right, batch)
            }
            PredicateExpr::Logical { op, left, right } => {
                let mut result = left.evaluate(batch)?;
                let rhs = right.evaluate(batch)?;
                match op {
                    LogicalOp::And => result.and_in_place(&rhs),
                    LogicalOp::Or => result.or_in_place(&rhs),
                }
                Ok(result)
            }
            PredicateExpr::Not { child } => {
                let mut result = child.evaluate(batch)?;
                result.not_in_place();
                Ok(result)
            }
        }
    }

    /// Tuple-at-a-time evaluation of one row.
    pub fn evaluate_row(&self, batch: &RowVector, row: usize) -> Result<Truth> {
        match self {
            PredicateExpr::ColumnRef { index, .. } => {
                let col = self.resolve_column(batch, *index)?;
                Ok(if col.is_null(row) { Truth::Null } else { Truth::True })
            }
            PredicateExpr::Constant { data_type, .. } => Ok(if *data_type == DataType::NullConst {
                Truth::Null
            } else {
                Truth::True
            }),
            PredicateExpr::Cast { child, .. } => child.evaluate_row(batch, row),
            PredicateExpr::Compare { op, operand_type, left, right } => {
                let lhs = Operand::resolve(left, batch, *operand_type)?;
                let rhs = Operand::resolve(right, batch, *operand_type)?;
                Ok(compare_one(*op, *operand_type, &lhs, &rhs, row))
            }
            PredicateExpr::Logical { op, left, right } => {
                let lhs = left.evaluate_row(batch, row)?;
                let rhs = right.evaluate_row(batch, row)?;
                Ok(match op {
                    LogicalOp::And => lhs.and(rhs),
                    LogicalOp::Or => lhs.or(rhs),
                })
            }
            PredicateExpr::Not { child } => Ok(child.evaluate_row(batch, row)?.not()),
        }
    }

    fn resolve_column<'a>(&self, batch: &'a RowVector, index: i32) -> Result<&'a ColumnBuffer> {
        if index < 0 {
            return Err(ToyDbError::IndexNotInitialized);
        }
        if index as usize >= batch.column_count() {
            return Err(ToyDbError::Type(format!(
                "predicate expects a column at position {}, batch has {}",
                index,
                batch.column_count()
            )));
        }
        Ok(batch.column(index as usize))
    }
}

impl fmt::Display for PredicateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateExpr::ColumnRef { column_id, .. } => write!(f, "{}", column_id.name()),
            PredicateExpr::Constant { value, .. } => write!(f, "{}", value),
            PredicateExpr::Cast { target, child } => write!(f, "CAST({} AS {})", child, target),
            PredicateExpr::Compare { op, left, right, .. } => {
                write!(f, "({} {} {})", left, op, right)
            }
            PredicateExpr::Logical { op, left, right } => {
                let name = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                write!(f, "({} {} {})", left, name, right)
            }
            PredicateExpr::Not { child } => write!(f, "(NOT {})", child),
        }
    }
}

/// Verify that a batch has exactly the layout an index map declares.
/// Operators call this behind `debug_assertions` before evaluation.
pub fn check_batch_shape(map: &ColumnIndexMap, batch: &RowVector) -> Result<()> {
    if map.len() != batch.column_count() {
        return Err(ToyDbError::Type(format!(
            "predicate references {} columns, batch has {}",
            map.len(),
            batch.column_count()
        )));
    }
    for (column_id, &index) in map {
        match batch.column_index(column_id) {
            Some(pos) if pos as i32 == index => {}
            Some(pos) => {
                return Err(ToyDbError::Type(format!(
                    "column '{}' at batch position {}, predicate expects {}",
                    column_id.name(),
                    pos,
                    index
                )));
            }
            None => {
                return Err(ToyDbError::Type(format!(
                    "batch is missing predicate column '{}'",
                    column_id.name()
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Comparison machinery
// ---------------------------------------------------------------------------

/// A comparison operand resolved against one batch: either a column
/// (optionally widened by a cast) or a folded constant.
enum Operand<'a> {
    Column {
        col: &'a ColumnBuffer,
        cast: Option<DataType>,
    },
    Const(Value),
}

impl<'a> Operand<'a> {
    fn resolve(
        expr: &'a PredicateExpr,
        batch: &'a RowVector,
        operand_type: DataType,
    ) -> Result<Operand<'a>> {
        let operand = Self::resolve_inner(expr, batch)?;
        // The planner guarantees operand types line up; a mismatch here
        // means the plan or the batch shape is corrupt.
        let effective = match &operand {
            Operand::Column { col, cast } => cast.unwrap_or(col.data_type()),
            Operand::Const(value) => {
                if value.is_null() {
                    return Ok(operand);
                }
                value.data_type()
            }
        };
        if effective != operand_type {
            return Err(ToyDbError::Type(format!(
                "comparison over {} got a {} operand",
                operand_type, effective
            )));
        }
        Ok(operand)
    }

    fn resolve_inner(expr: &'a PredicateExpr, batch: &'a RowVector) -> Result<Operand<'a>> {
        match expr {
            PredicateExpr::ColumnRef { column_id, data_type, index } => {
                let col = expr.resolve_column(batch, *index)?;
                if col.data_type() != *data_type {
                    return Err(ToyDbError::Type(format!(
                        "column '{}' declared {} but batch column is {}",
                        column_id.name(),
                        data_type,
                        col.data_type()
                    )));
                }
                Ok(Operand::Column { col, cast: None })
            }
            PredicateExpr::Constant { value, .. } => Ok(Operand::Const(value.clone())),
            PredicateExpr::Cast { target, child } => {
                match Self::resolve_inner(child, batch)? {
                    Operand::Column { col, .. } => Ok(Operand::Column { col, cast: Some(*target) }),
                    Operand::Const(value) => Ok(Operand::Const(value.cast(*target)?)),
                }
            }
            other => Err(ToyDbError::Type(format!(
                "comparison operand must be a column, constant, or cast, got {}",
                other
            ))),
        }
    }

    #[inline]
    fn i32_at(&self, row: usize) -> Option<i32> {
        match self {
            Operand::Column { col, cast } => {
                if col.is_null(row) {
                    return None;
                }
                match (col.data_type(), cast) {
                    (DataType::Int32, _) => Some(col.i32_at(row)),
                    (DataType::Bool, Some(DataType::Int32)) => Some(col.bool_at(row) as i32),
                    _ => None,
                }
            }
            Operand::Const(Value::Int32(v)) => Some(*v),
            Operand::Const(_) => None,
        }
    }

    #[inline]
    fn i64_at(&self, row: usize) -> Option<i64> {
        match self {
            Operand::Column { col, cast } => {
                if col.is_null(row) {
                    return None;
                }
                match (col.data_type(), cast) {
                    (DataType::Int64, _) => Some(col.i64_at(row)),
                    (DataType::Int32, Some(DataType::Int64)) => Some(col.i32_at(row) as i64),
                    (DataType::Bool, Some(DataType::Int64)) => Some(col.bool_at(row) as i64),
                    _ => None,
                }
            }
            Operand::Const(Value::Int64(v)) => Some(*v),
            Operand::Const(_) => None,
        }
    }

    #[inline]
    fn f64_at(&self, row: usize) -> Option<f64> {
        match self {
            Operand::Column { col, cast } => {
                if col.is_null(row) {
                    return None;
                }
                match (col.data_type(), cast) {
                    (DataType::Double, _) => Some(col.f64_at(row)),
                    (DataType::Int32, Some(DataType::Double)) => Some(col.i32_at(row) as f64),
                    (DataType::Int64, Some(DataType::Double)) => Some(col.i64_at(row) as f64),
                    _ => None,
                }
            }
            Operand::Const(Value::Double(v)) => Some(*v),
            Operand::Const(_) => None,
        }
    }

    #[inline]
    fn bool_at(&self, row: usize) -> Option<bool> {
        match self {
            Operand::Column { col, .. } => {
                if col.is_null(row) {
                    None
                } else {
                    Some(col.bool_at(row))
                }
            }
            Operand::Const(Value::Bool(v)) => Some(*v),
            Operand::Const(_) => None,
        }
    }

    #[inline]
    fn bytes_at(&self, row: usize) -> Option<&[u8]> {
        match self {
            Operand::Column { col, .. } => {
                if col.is_null(row) {
                    None
                } else {
                    Some(col.bytes_at(row))
                }
            }
            Operand::Const(Value::String(v)) => {
                // Stored strings truncate at 255 bytes; compare what a
                // column slot would actually hold.
                let bytes = v.as_bytes();
                Some(&bytes[..bytes.len().min(crate::data::STRING_WIDTH - 1)])
            }
            Operand::Const(_) => None,
        }
    }
}

#[inline]
fn cmp_values<T: PartialOrd>(op: CompareOp, left: Option<T>, right: Option<T>) -> Truth {
    match (left, right) {
        (Some(l), Some(r)) => {
            let hit = match op {
                CompareOp::Equal => l == r,
                CompareOp::NotEqual => l != r,
                CompareOp::Less => l < r,
                CompareOp::LessEqual => l <= r,
                CompareOp::Greater => l > r,
                CompareOp::GreaterEqual => l >= r,
            };
            if hit {
                Truth::True
            } else {
                Truth::False
            }
        }
        _ => Truth::Null,
    }
}

#[inline]
fn compare_one(
    op: CompareOp,
    operand_type: DataType,
    left: &Operand<'_>,
    right: &Operand<'_>,
    row: usize,
) -> Truth {
    match operand_type {
        DataType::Int32 => cmp_values(op, left.i32_at(row), right.i32_at(row)),
        DataType::Int64 => cmp_values(op, left.i64_at(row), right.i64_at(row)),
        DataType::Double => cmp_values(op, left.f64_at(row), right.f64_at(row)),
        DataType::Bool => cmp_values(op, left.bool_at(row), right.bool_at(row)),
        DataType::String => cmp_values(op, left.bytes_at(row), right.bytes_at(row)),
        DataType::NullConst => Truth::Null,
    }
}

fn compare_batch(
    op: CompareOp,
    operand_type: DataType,
    left: &PredicateExpr,
    right: &PredicateExpr,
    batch: &RowVector,
) -> Result<TruthVector> {
    let rows = batch.row_count();
    let lhs = Operand::resolve(left, batch, operand_type)?;
    let rhs = Operand::resolve(right, batch, operand_type)?;

    let mut out = TruthVector::new(rows);
    // One monomorphic loop per operand type.
    match operand_type {
        DataType::Int32 => {
            for row in 0..rows {
                out.set(row, cmp_values(op, lhs.i32_at(row), rhs.i32_at(row)));
            }
        }
        DataType::Int64 => {
            for row in 0..rows {
                out.set(row, cmp_values(op, lhs.i64_at(row), rhs.i64_at(row)));
            }
        }
        DataType::Double => {
            for row in 0..rows {
                out.set(row, cmp_values(op, lhs.f64_at(row), rhs.f64_at(row)));
            }
        }
        DataType::Bool => {
            for row in 0..rows {
                out.set(row, cmp_values(op, lhs.bool_at(row), rhs.bool_at(row)));
            }
        }
        DataType::String => {
            for row in 0..rows {
                out.set(row, cmp_values(op, lhs.bytes_at(row), rhs.bytes_at(row)));
            }
        }
        DataType::NullConst => out.fill(Truth::Null),
    }
    Ok(out)
}
