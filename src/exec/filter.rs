//! Filter operator: evaluates a predicate per batch and passes TRUE rows
//! through. NULL outcomes are discarded along with FALSE.

use super::PhysicalOperator;
use crate::data::{ColumnBuffer, ColumnId, RowVector};
use crate::predicate::{ColumnIndexMap, PredicateExpr, TruthVector};
use crate::{Result, ToyDbError};

pub struct FilterExec {
    child: Box<dyn PhysicalOperator>,
    predicate: PredicateExpr,
    // Referenced columns ordered by their assigned index.
    eval_layout: Vec<ColumnId>,
    index_map: ColumnIndexMap,
    input: RowVector,
}

impl FilterExec {
    pub fn new(child: Box<dyn PhysicalOperator>, predicate: PredicateExpr) -> Self {
        Self {
            child,
            predicate,
            eval_layout: Vec::new(),
            index_map: ColumnIndexMap::new(),
            input: RowVector::new(),
        }
    }

    /// Assemble the batch the predicate expects: exactly its referenced
    /// columns, in assigned-index order.
    fn gather_eval_batch(&self, input: &RowVector) -> Result<RowVector> {
        let mut eval = RowVector::new();
        for id in &self.eval_layout {
            let col = input.column_by_id(id).ok_or_else(|| {
                ToyDbError::Type(format!(
                    "filter input is missing predicate column '{}'",
                    id.name()
                ))
            })?;
            eval.add_column(col.clone());
        }
        eval.set_row_count(input.row_count());
        Ok(eval)
    }

    fn copy_selected(&self, selection: &TruthVector, out: &mut RowVector) -> Result<usize> {
        let selected = selection.count_true();
        for col in self.input.columns() {
            let mut dst = ColumnBuffer::allocate(
                col.column_id().clone(),
                col.data_type(),
                self.input.row_count().max(1),
            )?;
            let mut next_row = 0;
            for row in 0..self.input.row_count() {
                if selection.is_true(row) {
                    dst.copy_row_from(col, row, next_row)?;
                    next_row += 1;
                }
            }
            dst.set_count(selected);
            out.add_column(dst);
        }
        out.set_row_count(selected);
        Ok(selected)
    }
}

impl PhysicalOperator for FilterExec {
    fn initialize(&mut self) -> Result<()> {
        self.child.initialize()?;
        self.index_map = self.predicate.initialize_index_map();

        let mut layout: Vec<(i32, ColumnId)> = self
            .index_map
            .iter()
            .map(|(id, &index)| (index, id.clone()))
            .collect();
        layout.sort_by_key(|(index, _)| *index);
        self.eval_layout = layout.into_iter().map(|(_, id)| id).collect();
        Ok(())
    }

    fn next(&mut self, out: &mut RowVector) -> Result<usize> {
        out.clear();
        loop {
            self.input.clear();
            if self.child.next(&mut self.input)? == 0 {
                return Ok(0);
            }

            let eval = self.gather_eval_batch(&self.input)?;
            #[cfg(debug_assertions)]
            crate::predicate::check_batch_shape(&self.index_map, &eval)?;

            let selection = self.predicate.evaluate(&eval)?;
            if selection.count_true() == 0 {
                continue;
            }
            return self.copy_selected(&selection, out);
        }
    }
}
