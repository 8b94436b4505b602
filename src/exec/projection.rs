//! Projection operator: narrows each batch to a column subset, by
//! identity, preserving the requested order.

use super::PhysicalOperator;
use crate::data::{ColumnId, RowVector};
use crate::{Result, ToyDbError};

pub struct ProjectionExec {
    child: Box<dyn PhysicalOperator>,
    columns: Vec<ColumnId>,
    input: RowVector,
}

impl ProjectionExec {
    pub fn new(child: Box<dyn PhysicalOperator>, columns: Vec<ColumnId>) -> Self {
        Self { child, columns, input: RowVector::new() }
    }
}

impl PhysicalOperator for ProjectionExec {
    fn initialize(&mut self) -> Result<()> {
        self.child.initialize()
    }

    fn next(&mut self, out: &mut RowVector) -> Result<usize> {
        out.clear();
        self.input.clear();
        let rows = self.child.next(&mut self.input)?;
        if rows == 0 {
            return Ok(0);
        }

        for id in &self.columns {
            let col = self.input.column_by_id(id).ok_or_else(|| {
                ToyDbError::ColumnNotFound(format!(
                    "projection column '{}' missing from input batch",
                    id.name()
                ))
            })?;
            out.add_column(col.clone());
        }
        out.set_row_count(rows);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::mock::MockScanBuilder;

    #[test]
    fn test_projection_narrows_and_reorders() {
        let scan = MockScanBuilder::new()
            .int64_column(1, "a", vec![1, 2])
            .int64_column(2, "b", vec![10, 20])
            .int64_column(3, "c", vec![100, 200])
            .build();

        let mut projection = ProjectionExec::new(
            Box::new(scan),
            vec![ColumnId::new(3, "c"), ColumnId::new(1, "a")],
        );
        projection.initialize().unwrap();

        let mut out = RowVector::new();
        assert_eq!(projection.next(&mut out).unwrap(), 2);
        assert_eq!(out.column_count(), 2);
        assert_eq!(out.column(0).column_id().name(), "c");
        assert_eq!(out.column(0).i64_at(1), 200);
        assert_eq!(out.column(1).i64_at(0), 1);
        assert_eq!(projection.next(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_projection_unknown_column_errors() {
        let scan = MockScanBuilder::new().int64_column(1, "a", vec![1]).build();
        let mut projection =
            ProjectionExec::new(Box::new(scan), vec![ColumnId::new(9, "ghost")]);
        projection.initialize().unwrap();

        let mut out = RowVector::new();
        assert!(projection.next(&mut out).is_err());
    }
}
