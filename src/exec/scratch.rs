//! Scratch column pool for operators that need short-lived buffers.
//!
//! An object pool with a LIFO free list. Buffers move out on acquire and
//! move back on release; a released buffer is reset before reuse.

use crate::data::{ColumnBuffer, ColumnId, DataType};
use crate::Result;

#[derive(Debug, Default)]
pub struct ScratchPool {
    free: Vec<ColumnBuffer>,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a buffer of the given type with at least `capacity` slots,
    /// reusing a released one when possible.
    pub fn acquire(
        &mut self,
        column_id: ColumnId,
        data_type: DataType,
        capacity: usize,
    ) -> Result<ColumnBuffer> {
        // Most recently released first.
        let found = self
            .free
            .iter()
            .rposition(|buf| buf.data_type() == data_type && buf.capacity() >= capacity);
        if let Some(index) = found {
            let mut buf = self.free.swap_remove(index);
            buf.reset();
            buf.set_column_id(column_id);
            return Ok(buf);
        }
        ColumnBuffer::allocate(column_id, data_type, capacity)
    }

    /// Return a buffer to the pool.
    pub fn release(&mut self, mut buf: ColumnBuffer) {
        buf.reset();
        self.free.push(buf);
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
