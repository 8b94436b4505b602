//! Row vectors: the batch container exchanged between physical operators.

use super::{ColumnBuffer, ColumnId};
use ahash::AHashMap;

/// An ordered set of column buffers sharing one row count, with O(1)
/// lookup by column identity.
///
/// A producer operator fills a `RowVector` per `next` call; the caller
/// owns it and may reuse it across calls.
#[derive(Debug, Clone, Default)]
pub struct RowVector {
    columns: Vec<ColumnBuffer>,
    index_by_id: AHashMap<ColumnId, usize>,
    row_count: usize,
}

impl RowVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty-columns batch with a fixed row count. Constant-only
    /// predicates evaluate against such batches.
    pub fn with_row_count(row_count: usize) -> Self {
        Self { row_count, ..Self::default() }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn set_row_count(&mut self, count: usize) {
        self.row_count = count;
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnBuffer] {
        &self.columns
    }

    /// Append a column. The first column establishes the row count when
    /// none is set yet. Columns must have distinct ids.
    pub fn add_column(&mut self, col: ColumnBuffer) {
        debug_assert!(
            !self.index_by_id.contains_key(col.column_id()),
            "duplicate column id {} in batch",
            col.column_id().id()
        );
        if self.row_count == 0 {
            self.row_count = col.count();
        }
        self.index_by_id.insert(col.column_id().clone(), self.columns.len());
        self.columns.push(col);
    }

    /// Replace the column with the same id, or append if absent.
    pub fn add_or_replace_column(&mut self, col: ColumnBuffer) {
        match self.index_by_id.get(col.column_id()) {
            Some(&index) => self.columns[index] = col,
            None => self.add_column(col),
        }
    }

    pub fn column(&self, index: usize) -> &ColumnBuffer {
        &self.columns[index]
    }

    pub fn column_mut(&mut self, index: usize) -> &mut ColumnBuffer {
        &mut self.columns[index]
    }

    pub fn column_by_id(&self, id: &ColumnId) -> Option<&ColumnBuffer> {
        self.index_by_id.get(id).map(|&i| &self.columns[i])
    }

    pub fn column_index(&self, id: &ColumnId) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    /// Drop all columns and reset the row count. Callees clear the out
    /// batch at the top of `next`.
    pub fn clear(&mut self) {
        self.columns.clear();
        self.index_by_id.clear();
        self.row_count = 0;
    }

    /// Render as an ASCII box table, truncated after `max_rows` rows.
    /// Pass `None` to print every row.
    pub fn to_pretty_string(&self, max_rows: Option<usize>) -> String {
        if self.columns.is_empty() || self.row_count == 0 {
            return "[empty buffer]".to_string();
        }

        let display_rows = match max_rows {
            Some(max) => self.row_count.min(max),
            None => self.row_count,
        };
        let truncated = display_rows < self.row_count;

        // Column widths: header name vs widest rendered value.
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| c.column_id().name().len())
            .collect();
        let mut cells: Vec<Vec<String>> = Vec::with_capacity(display_rows);
        for row in 0..display_rows {
            let rendered: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.value_to_string(row))
                .collect();
            for (w, cell) in widths.iter_mut().zip(&rendered) {
                *w = (*w).max(cell.len());
            }
            cells.push(rendered);
        }

        let rule = |widths: &[usize]| {
            let mut s = String::from("+");
            for w in widths {
                s.push_str(&"-".repeat(w + 2));
                s.push('+');
            }
            s.push('\n');
            s
        };

        let mut out = rule(&widths);
        out.push('|');
        for (col, w) in self.columns.iter().zip(&widths) {
            let name = col.column_id().name();
            out.push(' ');
            out.push_str(name);
            out.push_str(&" ".repeat(w - name.len() + 1));
            out.push('|');
        }
        out.push('\n');
        out.push_str(&rule(&widths));

        for rendered in &cells {
            out.push('|');
            for (cell, w) in rendered.iter().zip(&widths) {
                out.push(' ');
                out.push_str(cell);
                out.push_str(&" ".repeat(w - cell.len() + 1));
                out.push('|');
            }
            out.push('\n');
        }

        if truncated {
            let mut msg = format!("... ({} more rows)", self.row_count - display_rows);
            if msg.len() > widths[0] {
                msg = "...".to_string();
            }
            out.push('|');
            out.push(' ');
            out.push_str(&msg);
            out.push_str(&" ".repeat(widths[0].saturating_sub(msg.len()) + 1));
            out.push('|');
            for w in &widths[1..] {
                out.push_str(&" ".repeat(w + 2));
                out.push('|');
            }
            out.push('\n');
        }

        out.push_str(rule(&widths).trim_end_matches('\n'));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataType, Value};

    fn int64_col(id: u64, name: &str, values: &[i64]) -> ColumnBuffer {
        let mut col =
            ColumnBuffer::allocate(ColumnId::new(id, name), DataType::Int64, values.len().max(1))
                .unwrap();
        for (i, v) in values.iter().enumerate() {
            col.write_entry(i, &Value::Int64(*v)).unwrap();
        }
        col
    }

    #[test]
    fn test_first_column_establishes_row_count() {
        let mut rv = RowVector::new();
        rv.add_column(int64_col(1, "a", &[1, 2, 3]));
        assert_eq!(rv.row_count(), 3);

        rv.add_column(int64_col(2, "b", &[4, 5, 6]));
        assert_eq!(rv.column_count(), 2);
        assert_eq!(rv.row_count(), 3);
    }

    #[test]
    fn test_lookup_by_id() {
        let mut rv = RowVector::new();
        rv.add_column(int64_col(7, "a", &[1]));
        rv.add_column(int64_col(9, "b", &[2]));

        assert_eq!(rv.column_index(&ColumnId::new(9, "ignored")), Some(1));
        assert_eq!(
            rv.column_by_id(&ColumnId::new(7, "x")).unwrap().i64_at(0),
            1
        );
        assert!(rv.column_by_id(&ColumnId::new(8, "x")).is_none());
    }

    #[test]
    fn test_add_or_replace() {
        let mut rv = RowVector::new();
        rv.add_column(int64_col(1, "a", &[1, 2]));
        rv.add_or_replace_column(int64_col(1, "a", &[9, 8]));

        assert_eq!(rv.column_count(), 1);
        assert_eq!(rv.column(0).i64_at(0), 9);
    }

    #[test]
    fn test_pretty_string_truncation() {
        let mut rv = RowVector::new();
        rv.add_column(int64_col(1, "n", &[1, 2, 3, 4, 5]));

        let s = rv.to_pretty_string(Some(2));
        assert!(s.contains("| n"));
        assert!(s.contains("(3 more rows)") || s.contains("..."));

        let full = rv.to_pretty_string(None);
        assert!(full.contains("| 5"));
    }

    #[test]
    fn test_empty_pretty_string() {
        let rv = RowVector::new();
        assert_eq!(rv.to_pretty_string(Some(10)), "[empty buffer]");
    }
}
