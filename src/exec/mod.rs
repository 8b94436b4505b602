//! Physical operators and the query driver.
//!
//! Execution is pull-based: `initialize` walks the operator tree
//! depth-first once, then the driver repeatedly calls `next` on the root.
//! Each call fills a caller-owned `RowVector` with up to one batch of
//! rows; zero rows signals end of stream.

mod csv_scan;
mod filter;
mod join;
mod projection;
mod scratch;

pub use csv_scan::CsvScan;
pub use filter::FilterExec;
pub use join::NestedLoopJoinExec;
pub use projection::ProjectionExec;
pub use scratch::ScratchPool;

use crate::catalog::{Catalog, StorageFormat};
use crate::data::{ColumnBuffer, DataType, RowVector, Value};
use crate::plan::{JoinType, LogicalPlan, Planner};
use crate::predicate::PredicateExpr;
use crate::sql::SqlParser;
use crate::{Result, ToyDbError};
use std::path::PathBuf;

/// Default number of rows per batch
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Pull-based batch iterator.
pub trait PhysicalOperator {
    /// One-shot setup, cascading to children before their parents.
    fn initialize(&mut self) -> Result<()>;

    /// Fill `out` with the next batch and return its row count; 0 means
    /// end of stream. The callee clears `out` on entry; after a 0 return
    /// the caller must not call `next` again.
    fn next(&mut self, out: &mut RowVector) -> Result<usize>;
}

/// Lower a logical plan to its operator tree.
pub fn build_physical_plan(
    plan: &LogicalPlan,
    catalog: &Catalog,
    batch_size: usize,
) -> Result<Box<dyn PhysicalOperator>> {
    match plan {
        LogicalPlan::TableScan { table, .. } => {
            let meta = catalog
                .table_by_id(table)
                .ok_or_else(|| ToyDbError::TableNotFound(table.name().to_string()))?;
            if meta.format == StorageFormat::Parquet {
                return Err(ToyDbError::NotImplemented(format!(
                    "parquet scan of table '{}'",
                    table.name()
                )));
            }
            if meta.files.is_empty() {
                return Err(ToyDbError::Catalog(format!(
                    "table '{}' has no data files",
                    table.name()
                )));
            }
            if meta.files.len() > 1 {
                log::warn!(
                    "table '{}' lists {} files, scanning only the first",
                    table.name(),
                    meta.files.len()
                );
            }
            let schema: Vec<_> = meta
                .schema
                .column_ids()
                .iter()
                .filter_map(|id| {
                    meta.schema
                        .column(id)
                        .map(|col| (id.clone(), col.data_type, col.nullable))
                })
                .collect();
            let path: PathBuf = catalog.resolve_file(&meta.files[0]);
            Ok(Box::new(CsvScan::new(path, schema, batch_size)))
        }
        LogicalPlan::Filter { input, predicate } => {
            let child = build_physical_plan(input, catalog, batch_size)?;
            Ok(Box::new(FilterExec::new(child, predicate.clone())))
        }
        LogicalPlan::Projection { input, columns } => {
            let child = build_physical_plan(input, catalog, batch_size)?;
            Ok(Box::new(ProjectionExec::new(child, columns.clone())))
        }
        LogicalPlan::Join { left, right, kind, condition } => {
            if *kind != JoinType::Inner {
                return Err(ToyDbError::NotImplemented(format!("{} join", kind)));
            }
            let build = build_physical_plan(left, catalog, batch_size)?;
            let probe = build_physical_plan(right, catalog, batch_size)?;
            Ok(Box::new(NestedLoopJoinExec::new(
                build,
                probe,
                condition.clone(),
                batch_size,
            )))
        }
        LogicalPlan::CrossProduct { left, right } => {
            let build = build_physical_plan(left, catalog, batch_size)?;
            let probe = build_physical_plan(right, catalog, batch_size)?;
            // Every build/probe pair matches.
            let always = PredicateExpr::constant(Value::Bool(true));
            Ok(Box::new(NestedLoopJoinExec::new(build, probe, always, batch_size)))
        }
    }
}

/// Concatenate result batches into one buffer, mainly for display.
pub fn concat_batches(batches: &[RowVector]) -> Result<RowVector> {
    let mut out = RowVector::new();
    let first = match batches.iter().find(|b| b.column_count() > 0) {
        Some(first) => first,
        None => return Ok(out),
    };
    let total: usize = batches.iter().map(|b| b.row_count()).sum();

    for col in first.columns() {
        let mut merged =
            ColumnBuffer::allocate(col.column_id().clone(), col.data_type(), total.max(1))?;
        let mut row = 0;
        for batch in batches {
            let src = batch.column_by_id(col.column_id()).ok_or_else(|| {
                ToyDbError::Internal(format!(
                    "result batches disagree on column '{}'",
                    col.column_id().name()
                ))
            })?;
            for i in 0..batch.row_count() {
                merged.copy_row_from(src, i, row)?;
                row += 1;
            }
        }
        merged.set_count(total);
        out.add_column(merged);
    }
    out.set_row_count(total);
    Ok(out)
}

/// A loaded database: the catalog plus the execution entry point.
#[derive(Debug)]
pub struct Database {
    catalog: Catalog,
    batch_size: usize,
}

impl Database {
    pub fn open(manifest_path: impl Into<PathBuf>) -> Result<Database> {
        Ok(Database { catalog: Catalog::load(manifest_path)?, batch_size: DEFAULT_BATCH_SIZE })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one statement end to end and collect its result batches.
    pub fn execute(&self, sql: &str) -> Result<Vec<RowVector>> {
        let stmt = SqlParser::parse(sql)?;
        let plan = Planner::new(&self.catalog).plan(&stmt)?;
        log::debug!("plan:\n{}", plan);

        let mut root = build_physical_plan(&plan, &self.catalog, self.batch_size)?;
        root.initialize()?;

        let mut batches = Vec::new();
        loop {
            let mut out = RowVector::new();
            if root.next(&mut out)? == 0 {
                break;
            }
            batches.push(out);
        }
        Ok(batches)
    }
}

// Schema description for the CSV scan: (identity, type, nullable).
pub type ScanColumn = (crate::data::ColumnId, DataType, bool);

#[cfg(test)]
pub(crate) mod mock {
    //! Vector-backed operator for operator tests, with an explicit batch
    //! size schedule to exercise multi-batch behavior.

    use super::*;
    use crate::data::ColumnId;

    pub struct MockScan {
        batches: Vec<RowVector>,
        pos: usize,
    }

    impl PhysicalOperator for MockScan {
        fn initialize(&mut self) -> Result<()> {
            self.pos = 0;
            Ok(())
        }

        fn next(&mut self, out: &mut RowVector) -> Result<usize> {
            out.clear();
            let Some(batch) = self.batches.get(self.pos) else {
                return Ok(0);
            };
            self.pos += 1;
            for col in batch.columns() {
                out.add_column(col.clone());
            }
            out.set_row_count(batch.row_count());
            Ok(batch.row_count())
        }
    }

    #[derive(Default)]
    pub struct MockScanBuilder {
        columns: Vec<(ColumnId, Vec<Option<i64>>)>,
        batch_sizes: Option<Vec<usize>>,
    }

    impl MockScanBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn int64_column(mut self, id: u64, name: &str, values: Vec<i64>) -> Self {
            self.columns
                .push((ColumnId::new(id, name), values.into_iter().map(Some).collect()));
            self
        }

        pub fn nullable_int64_column(
            mut self,
            id: u64,
            name: &str,
            values: Vec<Option<i64>>,
        ) -> Self {
            self.columns.push((ColumnId::new(id, name), values));
            self
        }

        /// Split the data into batches of these sizes; sizes must cover
        /// all rows.
        pub fn batch_sizes(mut self, sizes: Vec<usize>) -> Self {
            self.batch_sizes = Some(sizes);
            self
        }

        pub fn build(self) -> MockScan {
            let rows = self.columns.first().map(|(_, v)| v.len()).unwrap_or(0);
            let sizes = self.batch_sizes.unwrap_or_else(|| if rows == 0 { vec![] } else { vec![rows] });
            assert_eq!(
                sizes.iter().sum::<usize>(),
                rows,
                "batch sizes must cover all rows"
            );

            let mut batches = Vec::new();
            let mut start = 0;
            for size in sizes {
                let mut batch = RowVector::new();
                for (id, values) in &self.columns {
                    let mut col =
                        ColumnBuffer::allocate(id.clone(), DataType::Int64, size.max(1)).unwrap();
                    for (i, v) in values[start..start + size].iter().enumerate() {
                        match v {
                            Some(v) => col.write_entry(i, &Value::Int64(*v)).unwrap(),
                            None => col.set_null(i),
                        }
                    }
                    col.set_count(size);
                    batch.add_column(col);
                }
                batch.set_row_count(size);
                batches.push(batch);
                start += size;
            }
            MockScan { batches, pos: 0 }
        }
    }
}
