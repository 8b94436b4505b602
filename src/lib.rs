//! toydb: a small read-oriented SQL engine.
//!
//! SQL text is parsed into an AST, lowered to a logical plan against a
//! JSON-manifest catalog, bound to a tree of pull-based physical operators,
//! and evaluated over columnar batches read from CSV files.

pub mod catalog;
pub mod data;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod predicate;
pub mod sql;

// Re-export main types
pub use catalog::Catalog;
pub use data::{ColumnBuffer, ColumnId, DataType, RowVector, TableId, Value};
pub use exec::{Database, PhysicalOperator};
pub use plan::LogicalPlan;
pub use predicate::{PredicateExpr, Truth, TruthVector};

/// Engine error type
#[derive(Debug, thiserror::Error)]
pub enum ToyDbError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unresolved table: {0}")]
    UnresolvedTable(String),

    #[error("Unresolved column: {0}")]
    UnresolvedColumn(String),

    #[error("Ambiguous column: {0}")]
    AmbiguousColumn(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Allocation error: {0}")]
    Allocation(String),

    #[error("Predicate index map not initialized")]
    IndexNotInitialized,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type used throughout the engine
pub type Result<T> = std::result::Result<T, ToyDbError>;
