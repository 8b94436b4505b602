//! Columnar table scan over one CSV data file.
//!
//! Supported input:
//! - comma separated values, records split on `\n`
//! - double quotes escape embedded commas (doubled quotes are not an
//!   escape for a quote character)
//! - the first line is a header and is discarded unvalidated
//! - `NULL`, `null`, and empty fields (after trimming) are nulls
//! - BOOL accepts case-insensitive `true`/`false`
//!
//! A line with the wrong field count is skipped with a warning; a field
//! that fails its typed parse aborts the scan.

use super::{PhysicalOperator, ScanColumn};
use crate::data::{ColumnBuffer, DataType, RowVector, Value};
use crate::{Result, ToyDbError};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;

pub struct CsvScan {
    path: PathBuf,
    schema: Vec<ScanColumn>,
    batch_size: usize,
    reader: Option<BufReader<File>>,
    header_read: bool,
    eof: bool,
    line_no: usize,
}

impl CsvScan {
    pub fn new(path: impl Into<PathBuf>, schema: Vec<ScanColumn>, batch_size: usize) -> Self {
        Self {
            path: path.into(),
            schema,
            batch_size: batch_size.max(1),
            reader: None,
            header_read: false,
            eof: false,
            line_no: 0,
        }
    }

    /// Rewind to the start of the file; the next batch re-reads the
    /// header first.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(reader) = &mut self.reader {
            reader.seek(SeekFrom::Start(0))?;
        }
        self.header_read = false;
        self.eof = false;
        self.line_no = 0;
        Ok(())
    }

    /// Split one record into fields. Quotes toggle comma significance and
    /// are not part of the field.
    fn split_fields(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        for c in line.chars() {
            if c == '"' {
                in_quotes = !in_quotes;
            } else if c == ',' && !in_quotes {
                fields.push(std::mem::take(&mut field));
            } else {
                field.push(c);
            }
        }
        fields.push(field);
        fields
    }

    fn parse_field(&self, raw: &str, data_type: DataType, column: usize) -> Result<Option<Value>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "NULL" || trimmed == "null" {
            return Ok(None);
        }
        let value = match data_type {
            DataType::Int32 => trimmed
                .parse::<i32>()
                .ok()
                .map(Value::Int32),
            DataType::Int64 => trimmed
                .parse::<i64>()
                .ok()
                .map(Value::Int64),
            DataType::Double => trimmed.parse::<f64>().ok().map(Value::Double),
            DataType::Bool => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            DataType::String => Some(Value::String(raw.to_string())),
            DataType::NullConst => None,
        };
        match value {
            Some(value) => Ok(Some(value)),
            None => Err(ToyDbError::Parse(format!(
                "{}:{}: field {} '{}' is not a valid {}",
                self.path.display(),
                self.line_no,
                column + 1,
                trimmed,
                data_type
            ))),
        }
    }

    // Reads one line including handling of CRLF; None at end of file.
    fn read_line(&mut self) -> Result<Option<String>> {
        let Some(reader) = &mut self.reader else {
            return Ok(None);
        };
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

impl PhysicalOperator for CsvScan {
    fn initialize(&mut self) -> Result<()> {
        match File::open(&self.path) {
            Ok(file) => {
                self.reader = Some(BufReader::new(file));
                self.header_read = false;
                self.eof = false;
                self.line_no = 0;
            }
            Err(err) => {
                // The scan stays usable and just reports end of stream.
                log::warn!("failed to open CSV file '{}': {}", self.path.display(), err);
                self.reader = None;
                self.eof = true;
            }
        }
        Ok(())
    }

    fn next(&mut self, out: &mut RowVector) -> Result<usize> {
        out.clear();
        if self.eof || self.reader.is_none() {
            return Ok(0);
        }

        if !self.header_read {
            match self.read_line()? {
                Some(_header) => self.header_read = true,
                None => {
                    self.eof = true;
                    return Ok(0);
                }
            }
        }

        let mut columns: Vec<ColumnBuffer> = Vec::with_capacity(self.schema.len());
        for (id, data_type, _nullable) in &self.schema {
            columns.push(ColumnBuffer::allocate(id.clone(), *data_type, self.batch_size)?);
        }

        let mut rows = 0;
        while rows < self.batch_size {
            let Some(line) = self.read_line()? else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            let fields = Self::split_fields(&line);
            if fields.len() != self.schema.len() {
                log::warn!(
                    "{}:{}: line has {} fields, expected {}; skipping",
                    self.path.display(),
                    self.line_no,
                    fields.len(),
                    self.schema.len()
                );
                continue;
            }

            for (i, (_, data_type, _)) in self.schema.iter().enumerate() {
                match self.parse_field(&fields[i], *data_type, i)? {
                    Some(value) => columns[i].write_entry(rows, &value)?,
                    None => columns[i].set_null(rows),
                }
            }
            rows += 1;
        }

        if rows == 0 {
            self.eof = true;
            return Ok(0);
        }

        for mut col in columns {
            col.set_count(rows);
            out.add_column(col);
        }
        out.set_row_count(rows);
        Ok(rows)
    }
}
