//! Lowering from the parsed AST to a logical plan.
//!
//! Name resolution runs against a query context of in-scope tables and
//! aliases; comparisons get their common operand type from the conversion
//! lattice, with casts inserted on whichever side differs.

use super::LogicalPlan;
use crate::catalog::Catalog;
use crate::data::{ColumnId, DataType, TableId};
use crate::predicate::{CompareOp, PredicateExpr};
use crate::sql::ast::{BinaryOperator, SelectStatement, SqlExpr, Statement};
use crate::{Result, ToyDbError};
use ahash::AHashMap;
use std::rc::Rc;

/// Tables visible to a statement, plus its alias bindings.
#[derive(Debug, Default)]
pub struct QueryContext {
    tables: Vec<TableId>,
    alias_to_table: AHashMap<String, TableId>,
}

impl QueryContext {
    /// Map a qualifier (table name or alias) to the table it denotes.
    pub fn canonical_table(&self, qualifier: &str) -> Option<&TableId> {
        if let Some(table) = self.alias_to_table.get(qualifier) {
            return Some(table);
        }
        self.tables.iter().find(|t| t.name() == qualifier)
    }

    pub fn tables(&self) -> &[TableId] {
        &self.tables
    }
}

/// Builds logical plans against one catalog.
pub struct Planner<'a> {
    catalog: &'a Catalog,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn plan(&self, stmt: &Statement) -> Result<LogicalPlan> {
        match stmt {
            Statement::Select(select) => self.plan_select(select),
            Statement::CreateTable { .. } => {
                Err(ToyDbError::NotImplemented("CREATE TABLE".to_string()))
            }
            Statement::Insert { .. } => Err(ToyDbError::NotImplemented("INSERT".to_string())),
            Statement::Update { .. } => Err(ToyDbError::NotImplemented("UPDATE".to_string())),
            Statement::Delete { .. } => Err(ToyDbError::NotImplemented("DELETE".to_string())),
        }
    }

    pub fn plan_select(&self, select: &SelectStatement) -> Result<LogicalPlan> {
        if select.from.is_empty() {
            return Err(ToyDbError::Internal(
                "SELECT must have at least one table".to_string(),
            ));
        }

        let context = self.build_context(select)?;

        // Resolve everything before rejecting unsupported shapes, so
        // resolution errors (ambiguity in particular) win.
        let predicate = match &select.where_clause {
            Some(expr) => Some(self.lower_predicate(expr, &context)?),
            None => None,
        };

        let projection = if select.select_all {
            None
        } else {
            let mut columns = Vec::with_capacity(select.columns.len());
            for col in &select.columns {
                columns.push(self.resolve_column(col.table.as_deref(), &col.name, &context)?);
            }
            Some(columns)
        };

        if context.tables.len() > 1 {
            return Err(ToyDbError::NotImplemented(
                "multiple tables in FROM (joins)".to_string(),
            ));
        }

        // Scan lists every column of the table; projection narrows later.
        let mut scan_columns = Vec::new();
        for table in &context.tables {
            let meta = self
                .catalog
                .table_by_id(table)
                .ok_or_else(|| ToyDbError::TableNotFound(table.name().to_string()))?;
            scan_columns.extend(meta.schema.column_ids().iter().cloned());
        }

        let mut plan = LogicalPlan::TableScan {
            table: context.tables[0].clone(),
            columns: scan_columns,
        };

        if let Some(predicate) = predicate {
            plan = LogicalPlan::Filter { input: Rc::new(plan), predicate };
        }

        if let Some(columns) = projection {
            plan = LogicalPlan::Projection { input: Rc::new(plan), columns };
        }

        Ok(plan)
    }

    fn build_context(&self, select: &SelectStatement) -> Result<QueryContext> {
        let mut context = QueryContext::default();
        for table_ref in &select.from {
            let meta = self
                .catalog
                .table_by_name(&table_ref.name)
                .ok_or_else(|| ToyDbError::UnresolvedTable(table_ref.name.clone()))?;
            context.tables.push(meta.id.clone());

            if let Some(alias) = &table_ref.alias {
                if context.alias_to_table.contains_key(alias) {
                    return Err(ToyDbError::Internal(format!("duplicate alias '{}'", alias)));
                }
                context.alias_to_table.insert(alias.clone(), meta.id.clone());
            }
        }
        Ok(context)
    }

    /// Resolve a (possibly qualified) column reference to its identity.
    fn resolve_column(
        &self,
        qualifier: Option<&str>,
        name: &str,
        context: &QueryContext,
    ) -> Result<ColumnId> {
        if let Some(qualifier) = qualifier {
            let table = context
                .canonical_table(qualifier)
                .ok_or_else(|| ToyDbError::UnresolvedTable(qualifier.to_string()))?;
            return self.catalog.resolve_column(table, name);
        }

        // Unqualified: the name must be unique across in-scope tables.
        let mut matches: Vec<&TableId> = Vec::new();
        for table in &context.tables {
            if let Some(meta) = self.catalog.table_by_id(table) {
                if meta.schema.column_by_name(name).is_some() {
                    matches.push(table);
                }
            }
        }
        match matches.len() {
            0 => Err(ToyDbError::UnresolvedColumn(format!(
                "column '{}' not found in any table in scope",
                name
            ))),
            1 => self.catalog.resolve_column(matches[0], name),
            _ => {
                let tables: Vec<&str> = matches.iter().map(|t| t.name()).collect();
                Err(ToyDbError::AmbiguousColumn(format!(
                    "column '{}' found in tables {}",
                    name,
                    tables.join(", ")
                )))
            }
        }
    }

    /// Lower a WHERE expression into a predicate tree.
    pub fn lower_predicate(
        &self,
        expr: &SqlExpr,
        context: &QueryContext,
    ) -> Result<PredicateExpr> {
        match expr {
            SqlExpr::Column { table, name } => {
                let column_id = self.resolve_column(table.as_deref(), name, context)?;
                let data_type = self.catalog.column_type(&column_id)?;
                Ok(PredicateExpr::column_ref(column_id, data_type))
            }
            SqlExpr::Literal(value) => Ok(PredicateExpr::constant(value.clone())),
            SqlExpr::Not(inner) => Ok(PredicateExpr::not(self.lower_predicate(inner, context)?)),
            SqlExpr::BinaryOp { left, op, right } => {
                let left = self.lower_predicate(left, context)?;
                let right = self.lower_predicate(right, context)?;
                match op {
                    BinaryOperator::And => Ok(PredicateExpr::and(left, right)),
                    BinaryOperator::Or => Ok(PredicateExpr::or(left, right)),
                    cmp => self.lower_comparison(*cmp, left, right),
                }
            }
        }
    }

    fn lower_comparison(
        &self,
        op: BinaryOperator,
        left: PredicateExpr,
        right: PredicateExpr,
    ) -> Result<PredicateExpr> {
        let op = match op {
            BinaryOperator::Eq => CompareOp::Equal,
            BinaryOperator::NotEq => CompareOp::NotEqual,
            BinaryOperator::Lt => CompareOp::Less,
            BinaryOperator::Le => CompareOp::LessEqual,
            BinaryOperator::Gt => CompareOp::Greater,
            BinaryOperator::Ge => CompareOp::GreaterEqual,
            BinaryOperator::And | BinaryOperator::Or => {
                return Err(ToyDbError::Internal("logical op in comparison".to_string()));
            }
        };

        let left_type = operand_type(&left)?;
        let right_type = operand_type(&right)?;
        let common = DataType::common_type(left_type, right_type)?;

        // Cast exactly where the operand type differs from the common one.
        let left = if left_type != common {
            PredicateExpr::cast(common, left)
        } else {
            left
        };
        let right = if right_type != common {
            PredicateExpr::cast(common, right)
        } else {
            right
        };

        Ok(PredicateExpr::compare(op, common, left, right))
    }
}

/// Type a comparison operand supplies: columns and constants only. The
/// WHERE grammar cannot nest comparisons inside comparisons; reaching one
/// here is a planner bug.
fn operand_type(expr: &PredicateExpr) -> Result<DataType> {
    match expr {
        PredicateExpr::ColumnRef { data_type, .. } => Ok(*data_type),
        PredicateExpr::Constant { data_type, .. } => Ok(*data_type),
        _ => Err(ToyDbError::Type(
            "comparison operand must be a column reference or a constant".to_string(),
        )),
    }
}
