//! Nested-loop join: materializes the build side, then streams the probe
//! side and evaluates the join predicate batch-at-a-time.
//!
//! For each probe row the predicate is evaluated once per build batch
//! against an evaluation batch holding the referenced columns in the
//! predicate's assigned order: build-side columns come from the
//! materialized batch, probe-side columns are the probe row's values
//! replicated to the batch length. TRUE outcomes emit one output row;
//! FALSE and NULL do not match.

use super::{PhysicalOperator, ScratchPool};
use crate::data::{ColumnBuffer, ColumnId, RowVector};
use crate::predicate::{ColumnIndexMap, PredicateExpr};
use crate::{Result, ToyDbError};
use std::collections::VecDeque;

pub struct NestedLoopJoinExec {
    build: Box<dyn PhysicalOperator>,
    probe: Box<dyn PhysicalOperator>,
    predicate: PredicateExpr,
    batch_size: usize,

    index_map: ColumnIndexMap,
    // Referenced columns ordered by assigned index.
    eval_layout: Vec<ColumnId>,

    built: bool,
    build_batches: Vec<RowVector>,

    // One evaluation batch per build batch; build-side columns are set
    // up once, probe-side slots are refilled per probe row.
    eval_batches: Vec<RowVector>,
    // (position in eval batch, column id) of each probe-side slot.
    probe_slots: Vec<(usize, ColumnId)>,
    eval_ready: bool,

    probe_batch: RowVector,
    probe_row: usize,
    probe_active: bool,

    // Matches of the current probe row not yet copied out:
    // (build batch, row within it).
    pending: VecDeque<(usize, usize)>,
    scratch: ScratchPool,
    done: bool,
}

impl NestedLoopJoinExec {
    pub fn new(
        build: Box<dyn PhysicalOperator>,
        probe: Box<dyn PhysicalOperator>,
        predicate: PredicateExpr,
        batch_size: usize,
    ) -> Self {
        Self {
            build,
            probe,
            predicate,
            batch_size: batch_size.max(1),
            index_map: ColumnIndexMap::new(),
            eval_layout: Vec::new(),
            built: false,
            build_batches: Vec::new(),
            eval_batches: Vec::new(),
            probe_slots: Vec::new(),
            eval_ready: false,
            probe_batch: RowVector::new(),
            probe_row: 0,
            probe_active: false,
            pending: VecDeque::new(),
            scratch: ScratchPool::new(),
            done: false,
        }
    }

    /// Drain the build child completely into memory.
    fn materialize_build_side(&mut self) -> Result<()> {
        loop {
            let mut batch = RowVector::new();
            if self.build.next(&mut batch)? == 0 {
                break;
            }
            self.build_batches.push(batch);
        }
        let total: usize = self.build_batches.iter().map(|b| b.row_count()).sum();
        log::debug!(
            "nested-loop join materialized {} build rows in {} batches",
            total,
            self.build_batches.len()
        );
        self.built = true;
        Ok(())
    }

    /// Advance to the next probe row, pulling a fresh probe batch when
    /// the current one is spent. False when the probe side is done.
    fn advance_probe(&mut self) -> Result<bool> {
        if self.probe_active && self.probe_row + 1 < self.probe_batch.row_count() {
            self.probe_row += 1;
            return Ok(true);
        }
        self.probe_batch.clear();
        if self.probe.next(&mut self.probe_batch)? == 0 {
            self.probe_active = false;
            return Ok(false);
        }
        self.probe_active = true;
        self.probe_row = 0;
        if !self.eval_ready {
            self.prepare_eval_batches()?;
            self.eval_ready = true;
        }
        Ok(true)
    }

    /// Decide the side of each referenced column and set up one
    /// evaluation batch per build batch.
    fn prepare_eval_batches(&mut self) -> Result<()> {
        let build_layout = &self.build_batches[0];

        enum Side {
            Build,
            Probe,
        }
        let mut sides = Vec::with_capacity(self.eval_layout.len());
        for id in &self.eval_layout {
            if build_layout.column_by_id(id).is_some() {
                sides.push(Side::Build);
            } else if self.probe_batch.column_by_id(id).is_some() {
                sides.push(Side::Probe);
            } else {
                return Err(ToyDbError::Type(format!(
                    "join predicate references column '{}' from neither input",
                    id.name()
                )));
            }
        }

        self.probe_slots.clear();
        for (pos, (id, side)) in self.eval_layout.iter().zip(&sides).enumerate() {
            if matches!(side, Side::Probe) {
                self.probe_slots.push((pos, id.clone()));
            }
        }

        self.eval_batches.clear();
        for batch in &self.build_batches {
            let rows = batch.row_count();
            let mut eval = RowVector::new();
            for (id, side) in self.eval_layout.iter().zip(&sides) {
                match side {
                    Side::Build => {
                        // Present in every build batch by construction.
                        let col = batch.column_by_id(id).ok_or_else(|| {
                            ToyDbError::Internal(format!(
                                "build batches disagree on column '{}'",
                                id.name()
                            ))
                        })?;
                        eval.add_column(col.clone());
                    }
                    Side::Probe => {
                        let probe_col = self
                            .probe_batch
                            .column_by_id(id)
                            .ok_or_else(|| ToyDbError::Internal("probe column vanished".into()))?;
                        let slot = self.scratch.acquire(
                            id.clone(),
                            probe_col.data_type(),
                            rows.max(1),
                        )?;
                        eval.add_column(slot);
                    }
                }
            }
            eval.set_row_count(rows);
            self.eval_batches.push(eval);
        }
        Ok(())
    }

    /// Evaluate the predicate for the current probe row against every
    /// build batch and queue the matching build rows.
    fn compute_matches(&mut self) -> Result<()> {
        for bb in 0..self.build_batches.len() {
            let rows = self.build_batches[bb].row_count();

            for (pos, id) in &self.probe_slots {
                let value = self
                    .probe_batch
                    .column_by_id(id)
                    .ok_or_else(|| ToyDbError::Internal("probe column vanished".into()))?
                    .value_at(self.probe_row);
                self.eval_batches[bb]
                    .column_mut(*pos)
                    .fill_value(&value, rows)?;
            }

            #[cfg(debug_assertions)]
            crate::predicate::check_batch_shape(&self.index_map, &self.eval_batches[bb])?;

            let selection = self.predicate.evaluate(&self.eval_batches[bb])?;
            for b in 0..rows {
                if selection.is_true(b) {
                    self.pending.push_back((bb, b));
                }
            }
        }
        Ok(())
    }

    /// Output layout: build columns in their original order, then probe
    /// columns, ids preserved.
    fn prepare_output(&self, out: &mut RowVector) -> Result<()> {
        for col in self.build_batches[0].columns() {
            out.add_column(ColumnBuffer::allocate(
                col.column_id().clone(),
                col.data_type(),
                self.batch_size,
            )?);
        }
        for col in self.probe_batch.columns() {
            out.add_column(ColumnBuffer::allocate(
                col.column_id().clone(),
                col.data_type(),
                self.batch_size,
            )?);
        }
        out.set_row_count(0);
        Ok(())
    }

    fn emit_row(&self, out: &mut RowVector, bb: usize, b: usize, dst_row: usize) -> Result<()> {
        let build_batch = &self.build_batches[bb];
        let build_cols = build_batch.column_count();
        for j in 0..build_cols {
            out.column_mut(j).copy_row_from(build_batch.column(j), b, dst_row)?;
        }
        for k in 0..self.probe_batch.column_count() {
            out.column_mut(build_cols + k).copy_row_from(
                self.probe_batch.column(k),
                self.probe_row,
                dst_row,
            )?;
        }
        Ok(())
    }
}

impl PhysicalOperator for NestedLoopJoinExec {
    fn initialize(&mut self) -> Result<()> {
        self.build.initialize()?;
        self.probe.initialize()?;
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
        if self.done {
            return Ok(0);
        }
        if !self.built {
            self.materialize_build_side()?;
            if self.build_batches.is_empty() {
                self.done = true;
                return Ok(0);
            }
        }

        let mut emitted = 0;
        loop {
            while emitted < self.batch_size {
                let Some((bb, b)) = self.pending.pop_front() else {
                    break;
                };
                if out.column_count() == 0 {
                    self.prepare_output(out)?;
                }
                self.emit_row(out, bb, b, emitted)?;
                emitted += 1;
            }
            if emitted == self.batch_size {
                break;
            }
            if !self.advance_probe()? {
                self.done = true;
                break;
            }
            self.compute_matches()?;
        }

        out.set_row_count(emitted);
        Ok(emitted)
    }
}
