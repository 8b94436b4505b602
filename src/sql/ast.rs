//! Abstract syntax tree produced by the SQL parser.

use crate::data::{DataType, Value};
use std::fmt;

/// Parsed SQL statement. Only SELECT plans and executes; the DML/DDL
/// forms parse but planning reports them as not implemented.
#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Vec<SqlExpr>>,
    },
    Update {
        table: String,
        assignments: Vec<(String, SqlExpr)>,
        where_clause: Option<SqlExpr>,
    },
    Delete {
        table: String,
        where_clause: Option<SqlExpr>,
    },
}

/// Column definition in CREATE TABLE
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

/// SELECT statement
#[derive(Debug, Clone)]
pub struct SelectStatement {
    /// True for `SELECT *`; `columns` is empty then.
    pub select_all: bool,
    pub columns: Vec<SelectColumn>,
    pub from: Vec<TableRef>,
    pub where_clause: Option<SqlExpr>,
}

/// One projected column, optionally qualified and aliased
#[derive(Debug, Clone)]
pub struct SelectColumn {
    pub table: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

/// Table in the FROM list, optionally aliased
#[derive(Debug, Clone)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// Binary operators usable in WHERE expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        write!(f, "{}", s)
    }
}

/// WHERE-clause expression
#[derive(Debug, Clone)]
pub enum SqlExpr {
    Column { table: Option<String>, name: String },
    Literal(Value),
    BinaryOp {
        left: Box<SqlExpr>,
        op: BinaryOperator,
        right: Box<SqlExpr>,
    },
    Not(Box<SqlExpr>),
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlExpr::Column { table: Some(t), name } => write!(f, "{}.{}", t, name),
            SqlExpr::Column { table: None, name } => write!(f, "{}", name),
            SqlExpr::Literal(v) => write!(f, "{}", v),
            SqlExpr::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            SqlExpr::Not(inner) => write!(f, "(NOT {})", inner),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(select) => write!(f, "{}", select),
            Statement::CreateTable { table, columns } => {
                write!(f, "CREATE TABLE {} (", table)?;
                for (i, col) in columns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", col.name, col.data_type)?;
                }
                write!(f, ")")
            }
            Statement::Insert { table, .. } => write!(f, "INSERT INTO {}", table),
            Statement::Update { table, .. } => write!(f, "UPDATE {}", table),
            Statement::Delete { table, .. } => write!(f, "DELETE FROM {}", table),
        }
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.select_all {
            write!(f, "*")?;
        } else {
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if let Some(table) = &col.table {
                    write!(f, "{}.", table)?;
                }
                write!(f, "{}", col.name)?;
                if let Some(alias) = &col.alias {
                    write!(f, " AS {}", alias)?;
                }
            }
        }
        write!(f, " FROM ")?;
        for (i, table) in self.from.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", table.name)?;
            if let Some(alias) = &table.alias {
                write!(f, " {}", alias)?;
            }
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {}", where_clause)?;
        }
        Ok(())
    }
}
